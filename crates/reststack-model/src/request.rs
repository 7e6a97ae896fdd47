//! Transport-agnostic request context.

use serde_json::Value;

use crate::operations::Verb;
use crate::types::ResourcePath;

/// Everything a verb handler needs to know about one inbound request.
#[derive(Debug, Clone)]
pub struct RestRequest {
    /// The verb being served.
    pub verb: Verb,
    /// Resolved `(resource, id)` pair.
    pub path: ResourcePath,
    /// Request headers.
    pub headers: http::HeaderMap,
    /// Raw (still percent-encoded) query string, without the leading `?`.
    pub query: Option<String>,
    /// Parsed JSON body, if one was sent.
    pub body: Option<Value>,
}

impl RestRequest {
    /// Create a request with no headers, query, or body.
    #[must_use]
    pub fn new(verb: Verb, path: ResourcePath) -> Self {
        Self {
            verb,
            path,
            headers: http::HeaderMap::new(),
            query: None,
            body: None,
        }
    }

    /// Replace the headers.
    #[must_use]
    pub fn with_headers(mut self, headers: http::HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Add a single header; invalid header values are ignored.
    #[must_use]
    pub fn with_header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(hv) = http::HeaderValue::from_str(value) {
            self.headers.insert(name, hv);
        }
        self
    }

    /// Set the raw query string.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Set the JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// The resolved resource name.
    #[must_use]
    pub fn resource(&self) -> Option<&str> {
        self.path.resource.as_deref()
    }

    /// The resolved item id.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.path.id.as_deref()
    }

    /// A header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// The `If-Match` token.
    #[must_use]
    pub fn if_match(&self) -> Option<&str> {
        self.header("if-match")
    }

    /// The `If-None-Match` token.
    #[must_use]
    pub fn if_none_match(&self) -> Option<&str> {
        self.header("if-none-match")
    }
}
