//! RestStack error types.
//!
//! Every failure surfaces to the client as a JSON body with a single
//! human-readable `message` field:
//!
//! ```json
//! { "message": "ID 'abc' not found" }
//! ```

use std::fmt;

/// Well-known RestStack error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[non_exhaustive]
pub enum RestErrorCode {
    /// Malformed filter, missing/extra id, schema violation.
    ClientInput,
    /// Resource not in the allow-list, or id not found.
    NotFound,
    /// Verb not supported at this path.
    MethodNotAllowed,
    /// Caller-supplied id already exists.
    Conflict,
    /// ETag precondition failed.
    PreconditionFailed,
    /// Unhandled internal error.
    #[default]
    Internal,
    /// Any other status declared by an interceptor.
    Custom(http::StatusCode),
}

impl RestErrorCode {
    /// Returns the short error code string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientInput => "ClientInputError",
            Self::NotFound => "NotFoundError",
            Self::MethodNotAllowed => "MethodNotAllowedError",
            Self::Conflict => "ConflictError",
            Self::PreconditionFailed => "PreconditionFailedError",
            Self::Internal => "InternalError",
            Self::Custom(_) => "CustomError",
        }
    }

    /// Returns the default HTTP status code for this error.
    #[must_use]
    pub fn default_status_code(&self) -> http::StatusCode {
        match self {
            Self::ClientInput => http::StatusCode::BAD_REQUEST,
            Self::NotFound => http::StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => http::StatusCode::METHOD_NOT_ALLOWED,
            Self::Conflict => http::StatusCode::CONFLICT,
            Self::PreconditionFailed => http::StatusCode::PRECONDITION_FAILED,
            Self::Internal => http::StatusCode::INTERNAL_SERVER_ERROR,
            Self::Custom(status) => *status,
        }
    }

    /// Map an arbitrary status code back onto the closest error code.
    #[must_use]
    pub fn from_status(status: http::StatusCode) -> Self {
        match status {
            http::StatusCode::NOT_FOUND => Self::NotFound,
            http::StatusCode::METHOD_NOT_ALLOWED => Self::MethodNotAllowed,
            http::StatusCode::CONFLICT => Self::Conflict,
            http::StatusCode::PRECONDITION_FAILED => Self::PreconditionFailed,
            http::StatusCode::BAD_REQUEST => Self::ClientInput,
            http::StatusCode::INTERNAL_SERVER_ERROR => Self::Internal,
            other => Self::Custom(other),
        }
    }
}

impl fmt::Display for RestErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A RestStack error response.
#[derive(Debug)]
pub struct RestError {
    /// The error code.
    pub code: RestErrorCode,
    /// A human-readable error message.
    pub message: String,
    /// The HTTP status code.
    pub status_code: http::StatusCode,
    /// The underlying source error, if any.
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RestError({}): {}", self.code, self.message)
    }
}

impl std::error::Error for RestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

impl RestError {
    /// Create a new `RestError` from an error code.
    #[must_use]
    pub fn new(code: RestErrorCode) -> Self {
        Self {
            status_code: code.default_status_code(),
            message: code.as_str().to_owned(),
            code,
            source: None,
        }
    }

    /// Create a new `RestError` with a custom message.
    #[must_use]
    pub fn with_message(code: RestErrorCode, message: impl Into<String>) -> Self {
        Self {
            status_code: code.default_status_code(),
            message: message.into(),
            code,
            source: None,
        }
    }

    /// Create an error carrying an explicit status code (e.g. one declared
    /// by an interceptor).
    #[must_use]
    pub fn with_status(status: http::StatusCode, message: impl Into<String>) -> Self {
        Self {
            code: RestErrorCode::from_status(status),
            message: message.into(),
            status_code: status,
            source: None,
        }
    }

    /// Set the source error.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // -- Convenience constructors --

    /// Generic 400.
    #[must_use]
    pub fn client_input(message: impl Into<String>) -> Self {
        crate::rest_error!(ClientInput, message)
    }

    /// Generic 404.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        crate::rest_error!(NotFound, message)
    }

    /// Generic 405.
    #[must_use]
    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        crate::rest_error!(MethodNotAllowed, message)
    }

    /// Generic 409.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        crate::rest_error!(Conflict, message)
    }

    /// Generic 412.
    #[must_use]
    pub fn precondition_failed(message: impl Into<String>) -> Self {
        crate::rest_error!(PreconditionFailed, message)
    }

    /// Generic 500.
    #[must_use]
    pub fn internal_error(message: impl Into<String>) -> Self {
        crate::rest_error!(Internal, message)
    }

    /// The filter query string could not be parsed or validated.
    #[must_use]
    pub fn malformed_filter() -> Self {
        Self::client_input("Malformed filter expression")
    }

    /// A filter was combined with a single-item id.
    #[must_use]
    pub fn filter_by_id() -> Self {
        Self::client_input("Filtering on a resource by ID is not supported")
    }

    /// The request body carried an `id` field.
    #[must_use]
    pub fn id_in_body() -> Self {
        Self::client_input("An id is not allowed in the request body")
    }

    /// PUT/PATCH without an id in the URL.
    #[must_use]
    pub fn id_required() -> Self {
        Self::client_input("An id is required in the URL")
    }

    /// The resource is not in the allow-list (or no resource was given).
    #[must_use]
    pub fn resource_not_found(resource: &str) -> Self {
        Self::not_found(format!("Resource '{resource}' not found"))
    }

    /// No item with the given id exists.
    #[must_use]
    pub fn id_not_found(id: &str) -> Self {
        Self::not_found(format!("ID '{id}' not found"))
    }

    /// The caller-supplied id is already taken.
    #[must_use]
    pub fn id_exists(id: &str) -> Self {
        Self::conflict(format!("ID '{id}' already exists"))
    }

    /// Collection-wide DELETE while it is disabled.
    #[must_use]
    pub fn collection_delete_not_allowed() -> Self {
        Self::method_not_allowed("Deleting a whole collection is not allowed")
    }

    /// HTTP method outside the supported verb set.
    #[must_use]
    pub fn unsupported_method(method: &http::Method) -> Self {
        Self::method_not_allowed(format!("Method {method} is not supported"))
    }

    /// `If-Match` missing or stale.
    #[must_use]
    pub fn etag_mismatch() -> Self {
        Self::precondition_failed("Precondition failed: ETag does not match")
    }
}

/// Create a `RestError` from an error code.
///
/// # Examples
///
/// ```
/// use reststack_model::rest_error;
/// use reststack_model::error::RestErrorCode;
///
/// let err = rest_error!(Conflict);
/// assert_eq!(err.code, RestErrorCode::Conflict);
///
/// let err = rest_error!(NotFound, "ID 'x' not found");
/// assert_eq!(err.message, "ID 'x' not found");
/// ```
#[macro_export]
macro_rules! rest_error {
    ($code:ident) => {
        $crate::error::RestError::new($crate::error::RestErrorCode::$code)
    };
    ($code:ident, $msg:expr) => {
        $crate::error::RestError::with_message($crate::error::RestErrorCode::$code, $msg)
    };
}
