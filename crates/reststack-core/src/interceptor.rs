//! Request and response-body interceptors.
//!
//! A request interceptor runs once per request, after validation and before
//! storage, and decides how the request proceeds:
//!
//! ```text
//! Continue                 -> proceed unchanged
//! ReplaceBody(body)        -> proceed with a new request body
//! Respond { status, body } -> stop and answer with this response
//! ```
//!
//! A response interceptor rewrites the GET/HEAD payload before null
//! stripping and ETag computation.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use http::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use reststack_model::error::RestError;
use reststack_model::operations::Verb;
use reststack_model::request::RestRequest;

/// Outcome of a request interceptor.
#[derive(Debug, Clone, PartialEq)]
pub enum Intercept {
    /// Proceed unchanged.
    Continue,
    /// Proceed with a replacement request body.
    ReplaceBody(Value),
    /// Answer immediately.
    Respond {
        /// Response status.
        status: StatusCode,
        /// Optional JSON body.
        body: Option<Value>,
    },
}

/// Wire shape of a dynamically produced [`Intercept`].
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum InterceptWire {
    Continue,
    ReplaceBody {
        body: Value,
    },
    Respond {
        status: u16,
        #[serde(default)]
        body: Option<Value>,
    },
}

impl Intercept {
    /// Decode an outcome produced as JSON, e.g. by a script host:
    ///
    /// ```json
    /// { "action": "replace_body", "body": { "name": "x" } }
    /// { "action": "respond", "status": 418, "body": { "message": "teapot" } }
    /// ```
    ///
    /// Any other shape decodes to [`Intercept::Continue`].
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match InterceptWire::deserialize(value) {
            Ok(InterceptWire::ReplaceBody { body }) => Self::ReplaceBody(body),
            Ok(InterceptWire::Respond { status, body }) => match StatusCode::from_u16(status) {
                Ok(status) => Self::Respond { status, body },
                Err(_) => Self::Continue,
            },
            Ok(InterceptWire::Continue) | Err(_) => Self::Continue,
        }
    }
}

/// Helper handed to request interceptors for building outcomes.
#[derive(Debug, Default, Clone, Copy)]
pub struct Actions;

impl Actions {
    /// Replace the request body and proceed.
    #[must_use]
    pub fn set_request_body(&self, body: Value) -> Intercept {
        Intercept::ReplaceBody(body)
    }

    /// Stop processing and answer with `status` and an optional body.
    #[must_use]
    pub fn response(&self, status: StatusCode, body: Option<Value>) -> Intercept {
        Intercept::Respond { status, body }
    }
}

/// Error raised by an interceptor.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct InterceptorError {
    /// Message returned to the client.
    pub message: String,
    /// Declared status; 500 when absent.
    pub status: Option<StatusCode>,
}

impl InterceptorError {
    /// An error answered with 500.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    /// An error answered with `status`.
    #[must_use]
    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: Some(status),
        }
    }
}

/// Per-verb request hook.
#[async_trait]
pub trait RequestInterceptor: Send + Sync + fmt::Debug {
    /// Decide how `request` proceeds.
    async fn intercept(
        &self,
        request: &RestRequest,
        actions: Actions,
    ) -> Result<Intercept, InterceptorError>;
}

/// GET/HEAD response-body transform.
#[async_trait]
pub trait ResponseInterceptor: Send + Sync + fmt::Debug {
    /// Rewrite the payload about to be returned.
    async fn intercept(
        &self,
        request: &RestRequest,
        body: Value,
    ) -> Result<Value, InterceptorError>;
}

/// Request interceptor built from an async closure.
pub struct FnInterceptor<F> {
    f: F,
}

impl<F> FnInterceptor<F> {
    /// Wrap a closure.
    pub fn new<Fut>(f: F) -> Self
    where
        F: Fn(RestRequest, Actions) -> Fut + Send + Sync,
        Fut: Future<Output = Result<Intercept, InterceptorError>> + Send + 'static,
    {
        Self { f }
    }
}

impl<F> fmt::Debug for FnInterceptor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnInterceptor").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> RequestInterceptor for FnInterceptor<F>
where
    F: Fn(RestRequest, Actions) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Intercept, InterceptorError>> + Send + 'static,
{
    async fn intercept(
        &self,
        request: &RestRequest,
        actions: Actions,
    ) -> Result<Intercept, InterceptorError> {
        (self.f)(request.clone(), actions).await
    }
}

/// Request interceptor whose closure produces its outcome as JSON, decoded
/// with [`Intercept::from_value`]. Suited to hooks hosted outside Rust.
pub struct JsonInterceptor<F> {
    f: F,
}

impl<F> JsonInterceptor<F> {
    /// Wrap a closure.
    pub fn new<Fut>(f: F) -> Self
    where
        F: Fn(RestRequest) -> Fut + Send + Sync,
        Fut: Future<Output = Result<Value, InterceptorError>> + Send + 'static,
    {
        Self { f }
    }
}

impl<F> fmt::Debug for JsonInterceptor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonInterceptor").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> RequestInterceptor for JsonInterceptor<F>
where
    F: Fn(RestRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, InterceptorError>> + Send + 'static,
{
    async fn intercept(
        &self,
        request: &RestRequest,
        _actions: Actions,
    ) -> Result<Intercept, InterceptorError> {
        let outcome = (self.f)(request.clone()).await?;
        Ok(Intercept::from_value(&outcome))
    }
}

/// Response interceptor built from an async closure.
pub struct FnResponseInterceptor<F> {
    f: F,
}

impl<F> FnResponseInterceptor<F> {
    /// Wrap a closure.
    pub fn new<Fut>(f: F) -> Self
    where
        F: Fn(RestRequest, Value) -> Fut + Send + Sync,
        Fut: Future<Output = Result<Value, InterceptorError>> + Send + 'static,
    {
        Self { f }
    }
}

impl<F> fmt::Debug for FnResponseInterceptor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnResponseInterceptor").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> ResponseInterceptor for FnResponseInterceptor<F>
where
    F: Fn(RestRequest, Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, InterceptorError>> + Send + 'static,
{
    async fn intercept(
        &self,
        request: &RestRequest,
        body: Value,
    ) -> Result<Value, InterceptorError> {
        (self.f)(request.clone(), body).await
    }
}

/// Registered interceptors. HEAD uses the GET request interceptor unless
/// one is registered for HEAD itself.
#[derive(Debug, Default, Clone)]
pub struct Interceptors {
    request: HashMap<Verb, Arc<dyn RequestInterceptor>>,
    response: Option<Arc<dyn ResponseInterceptor>>,
}

impl Interceptors {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the request interceptor for `verb`.
    #[must_use]
    pub fn on(mut self, verb: Verb, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.request.insert(verb, interceptor);
        self
    }

    /// Register the response-body interceptor.
    #[must_use]
    pub fn on_response(mut self, interceptor: Arc<dyn ResponseInterceptor>) -> Self {
        self.response = Some(interceptor);
        self
    }

    fn request_for(&self, verb: Verb) -> Option<&Arc<dyn RequestInterceptor>> {
        self.request.get(&verb).or_else(|| {
            if verb == Verb::Head {
                self.request.get(&Verb::Get)
            } else {
                None
            }
        })
    }

    /// Run the request interceptor for the request's verb.
    ///
    /// Errors and panics become a [`RestError`] with the declared status,
    /// or 500.
    pub async fn run_request(&self, request: &RestRequest) -> Result<Intercept, RestError> {
        let Some(interceptor) = self.request_for(request.verb) else {
            return Ok(Intercept::Continue);
        };
        match AssertUnwindSafe(interceptor.intercept(request, Actions))
            .catch_unwind()
            .await
        {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(e)) => {
                tracing::warn!(verb = %request.verb, error = %e, "request interceptor failed");
                let status = e.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                Err(RestError::with_status(status, e.message))
            }
            Err(_) => {
                tracing::warn!(verb = %request.verb, "request interceptor panicked");
                Err(RestError::internal_error("Request interceptor failed"))
            }
        }
    }

    /// Run the response-body interceptor; any failure is a 500.
    pub async fn run_response(
        &self,
        request: &RestRequest,
        body: Value,
    ) -> Result<Value, RestError> {
        let Some(interceptor) = &self.response else {
            return Ok(body);
        };
        match AssertUnwindSafe(interceptor.intercept(request, body))
            .catch_unwind()
            .await
        {
            Ok(Ok(body)) => Ok(body),
            Ok(Err(e)) => {
                tracing::warn!(verb = %request.verb, error = %e, "response interceptor failed");
                Err(RestError::internal_error(e.message))
            }
            Err(_) => {
                tracing::warn!(verb = %request.verb, "response interceptor panicked");
                Err(RestError::internal_error("Response interceptor failed"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use reststack_model::types::ResourcePath;

    use super::*;

    fn request(verb: Verb) -> RestRequest {
        RestRequest::new(verb, ResourcePath::new(Some("items".into()), None))
    }

    #[test]
    fn test_should_decode_dynamic_outcomes() {
        assert_eq!(
            Intercept::from_value(&json!({"action": "replace_body", "body": {"a": 1}})),
            Intercept::ReplaceBody(json!({"a": 1}))
        );
        assert_eq!(
            Intercept::from_value(&json!({"action": "respond", "status": 418})),
            Intercept::Respond {
                status: StatusCode::IM_A_TEAPOT,
                body: None
            }
        );
        for unknown in [
            json!(null),
            json!("respond"),
            json!({"action": "explode"}),
            json!({"action": "respond", "status": 42}),
            json!({"action": "replace_body"}),
        ] {
            assert_eq!(Intercept::from_value(&unknown), Intercept::Continue, "{unknown}");
        }
    }

    #[tokio::test]
    async fn test_should_decode_json_interceptor_outcomes() {
        let interceptors = Interceptors::new()
            .on(
                Verb::Post,
                Arc::new(JsonInterceptor::new(|_req| async move {
                    Ok::<_, InterceptorError>(json!({"action": "respond", "status": 202}))
                })),
            )
            .on(
                Verb::Put,
                Arc::new(JsonInterceptor::new(|_req| async move {
                    Ok::<_, InterceptorError>(json!({"unexpected": true}))
                })),
            );
        let outcome = interceptors.run_request(&request(Verb::Post)).await.unwrap();
        assert_eq!(
            outcome,
            Intercept::Respond {
                status: StatusCode::ACCEPTED,
                body: None
            }
        );
        let outcome = interceptors.run_request(&request(Verb::Put)).await.unwrap();
        assert_eq!(outcome, Intercept::Continue);
    }

    #[tokio::test]
    async fn test_should_continue_without_interceptor() {
        let interceptors = Interceptors::new();
        let outcome = interceptors.run_request(&request(Verb::Post)).await.unwrap();
        assert_eq!(outcome, Intercept::Continue);
    }

    #[tokio::test]
    async fn test_should_fall_back_to_get_for_head() {
        let interceptors = Interceptors::new().on(
            Verb::Get,
            Arc::new(FnInterceptor::new(|_req, actions: Actions| async move {
                Ok::<_, InterceptorError>(actions.response(StatusCode::ACCEPTED, None))
            })),
        );
        let outcome = interceptors.run_request(&request(Verb::Head)).await.unwrap();
        assert!(matches!(outcome, Intercept::Respond { status, .. } if status == StatusCode::ACCEPTED));
    }

    #[tokio::test]
    async fn test_should_map_errors_to_declared_status() {
        let interceptors = Interceptors::new().on(
            Verb::Post,
            Arc::new(FnInterceptor::new(|_req, _actions| async move {
                Err::<Intercept, _>(InterceptorError::with_status(StatusCode::FORBIDDEN, "nope"))
            })),
        );
        let err = interceptors.run_request(&request(Verb::Post)).await.unwrap_err();
        assert_eq!(err.status_code, StatusCode::FORBIDDEN);
        assert_eq!(err.message, "nope");
    }

    #[tokio::test]
    async fn test_should_catch_panics() {
        let interceptors = Interceptors::new().on(
            Verb::Delete,
            Arc::new(FnInterceptor::new(|req: RestRequest, _actions| async move {
                assert!(req.resource().is_none(), "boom");
                Ok::<_, InterceptorError>(Intercept::Continue)
            })),
        );
        let err = interceptors.run_request(&request(Verb::Delete)).await.unwrap_err();
        assert_eq!(err.status_code, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_should_transform_response_body() {
        let interceptors = Interceptors::new().on_response(Arc::new(FnResponseInterceptor::new(
            |_req, mut body: Value| async move {
                body["seen"] = json!(true);
                Ok::<_, InterceptorError>(body)
            },
        )));
        let body = interceptors
            .run_response(&request(Verb::Get), json!({"id": "1"}))
            .await
            .unwrap();
        assert_eq!(body, json!({"id": "1", "seen": true}));
    }

    #[tokio::test]
    async fn test_should_fail_response_interceptor_with_500() {
        let interceptors = Interceptors::new().on_response(Arc::new(FnResponseInterceptor::new(
            |_req, _body| async move {
                Err::<Value, _>(InterceptorError::with_status(StatusCode::FORBIDDEN, "no"))
            },
        )));
        let err = interceptors
            .run_response(&request(Verb::Get), json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.status_code, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
