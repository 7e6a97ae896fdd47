//! RestStack engine configuration.

use std::env;

use thiserror::Error;

use crate::storage::{Backend, StorageError};

/// Default backend selector.
pub const DEFAULT_CONNECTION_STRING: &str = "memory";

/// Errors raised when validating a [`RestConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An allow-listed resource name can never be matched by a URL segment.
    #[error("invalid resource name in allow-list: '{name}'")]
    InvalidResource {
        /// The offending name.
        name: String,
    },
    /// The connection string does not select a known backend.
    #[error(transparent)]
    Backend(#[from] StorageError),
}

/// Resource engine configuration.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// URL prefix stripped before resolution, and prepended to `Location`.
    pub base_path: String,
    /// Allow-list of resource names; `None` accepts any resource.
    pub resources: Option<Vec<String>>,
    /// Remove `null` fields from read responses.
    pub strip_nulls: bool,
    /// Enable DELETE on a whole collection.
    pub allow_delete_collection: bool,
    /// Enable the ETag controller.
    pub etags: bool,
    /// Storage backend selector (see [`crate::storage::Backend::parse`]).
    pub connection_string: String,
}

impl RestConfig {
    /// Create configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |key: &str| lookup(key).is_some_and(|v| parse_bool(&v));
        Self {
            base_path: normalize_base_path(&lookup("BASE_PATH").unwrap_or_default()),
            resources: lookup("RESOURCES").and_then(|v| parse_resources(&v)),
            strip_nulls: flag("STRIP_NULLS"),
            allow_delete_collection: flag("ALLOW_DELETE_COLLECTION"),
            etags: flag("ETAGS"),
            connection_string: lookup("CONNECTION_STRING")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CONNECTION_STRING.to_owned()),
        }
    }

    /// Check that the configuration describes a usable engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for name in self.resources.iter().flatten() {
            if name.contains('/') || name.contains('?') {
                return Err(ConfigError::InvalidResource { name: name.clone() });
            }
        }
        Backend::parse(&self.connection_string)?;
        Ok(())
    }

    /// Whether `resource` passes the allow-list.
    #[must_use]
    pub fn allows(&self, resource: &str) -> bool {
        self.resources
            .as_ref()
            .is_none_or(|list| list.iter().any(|r| r == resource))
    }
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            base_path: String::new(),
            resources: None,
            strip_nulls: false,
            allow_delete_collection: false,
            etags: false,
            connection_string: DEFAULT_CONNECTION_STRING.to_owned(),
        }
    }
}

fn parse_bool(v: &str) -> bool {
    matches!(v, "1" | "true" | "yes" | "TRUE" | "YES")
}

fn parse_resources(v: &str) -> Option<Vec<String>> {
    let list: Vec<String> = v
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect();
    (!list.is_empty()).then_some(list)
}

/// `api/` -> `/api`, `/` -> ``.
fn normalize_base_path(v: &str) -> String {
    let trimmed = v.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> RestConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        RestConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_should_use_defaults() {
        let cfg = config(&[]);
        assert_eq!(cfg.base_path, "");
        assert!(cfg.resources.is_none());
        assert!(!cfg.strip_nulls);
        assert!(!cfg.allow_delete_collection);
        assert!(!cfg.etags);
        assert_eq!(cfg.connection_string, "memory");
        assert!(cfg.allows("anything"));
    }

    #[test]
    fn test_should_read_flags_and_allow_list() {
        let cfg = config(&[
            ("BASE_PATH", "api/"),
            ("RESOURCES", "items, users,,"),
            ("ETAGS", "true"),
            ("STRIP_NULLS", "1"),
            ("ALLOW_DELETE_COLLECTION", "no"),
            ("CONNECTION_STRING", "dir:/tmp/db"),
        ]);
        assert_eq!(cfg.base_path, "/api");
        assert_eq!(
            cfg.resources,
            Some(vec!["items".to_owned(), "users".to_owned()])
        );
        assert!(cfg.etags);
        assert!(cfg.strip_nulls);
        assert!(!cfg.allow_delete_collection);
        assert_eq!(cfg.connection_string, "dir:/tmp/db");
        assert!(cfg.allows("items"));
        assert!(!cfg.allows("Items"));
    }

    #[test]
    fn test_should_validate_resource_names_and_backend() {
        assert!(config(&[("RESOURCES", "items")]).validate().is_ok());
        assert!(matches!(
            config(&[("RESOURCES", "a/b")]).validate(),
            Err(ConfigError::InvalidResource { .. })
        ));
        assert!(matches!(
            config(&[("CONNECTION_STRING", "redis://localhost")]).validate(),
            Err(ConfigError::Backend(_))
        ));
    }

    #[test]
    fn test_should_treat_empty_allow_list_as_any() {
        let cfg = config(&[("RESOURCES", " , ")]);
        assert!(cfg.resources.is_none());
    }
}
