//! Schema validator adapter.
//!
//! The schema language itself lives outside the engine; a validator only has
//! to answer [`Validation::Valid`] or [`Validation::Invalid`] for a body.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use reststack_model::operations::Verb;

/// Result of validating a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// The body is acceptable.
    Valid,
    /// The body is rejected with a message returned to the client.
    Invalid {
        /// Validator message.
        message: String,
    },
}

/// A schema check for one resource and verb.
#[async_trait]
pub trait SchemaValidator: Send + Sync + fmt::Debug {
    /// Validate a POST/PUT/PATCH body.
    async fn validate(&self, body: &Value) -> Validation;
}

/// Synchronous validator built from a closure.
pub struct FnValidator<F> {
    f: F,
}

impl<F> FnValidator<F>
where
    F: Fn(&Value) -> Validation + Send + Sync,
{
    /// Wrap a closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for FnValidator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnValidator").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> SchemaValidator for FnValidator<F>
where
    F: Fn(&Value) -> Validation + Send + Sync,
{
    async fn validate(&self, body: &Value) -> Validation {
        (self.f)(body)
    }
}

/// Validators keyed by `(resource, verb)`.
#[derive(Debug, Default, Clone)]
pub struct SchemaRegistry {
    validators: HashMap<(String, Verb), Arc<dyn SchemaValidator>>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a validator for `resource` and `verb`.
    #[must_use]
    pub fn register(
        mut self,
        resource: impl Into<String>,
        verb: Verb,
        validator: Arc<dyn SchemaValidator>,
    ) -> Self {
        self.validators.insert((resource.into(), verb), validator);
        self
    }

    /// Validate `body`; resources without a validator always pass.
    pub async fn validate(&self, resource: &str, verb: Verb, body: &Value) -> Validation {
        match self.validators.get(&(resource.to_owned(), verb)) {
            Some(validator) => validator.validate(body).await,
            None => Validation::Valid,
        }
    }
}
