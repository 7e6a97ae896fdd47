//! RestStack response serialization and error formatting.

use reststack_model::error::RestError;

use crate::body::RestResponseBody;

/// Content type for JSON responses.
pub const CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Serialize an error into its JSON body:
///
/// ```json
/// { "message": "ID 'abc' not found" }
/// ```
#[must_use]
pub fn error_to_json(error: &RestError) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({ "message": error.message }))
        .expect("JSON serialization of error cannot fail")
}

/// Convert a `RestError` into a complete HTTP error response.
#[must_use]
pub fn error_to_response(error: &RestError, request_id: &str) -> http::Response<RestResponseBody> {
    let json = error_to_json(error);
    http::Response::builder()
        .status(error.status_code)
        .header("content-type", CONTENT_TYPE)
        .header("x-request-id", request_id)
        .body(RestResponseBody::from_json(json))
        .expect("valid error response")
}

/// Build a response from JSON bytes.
#[must_use]
pub fn json_response(status: http::StatusCode, json: Vec<u8>) -> http::Response<RestResponseBody> {
    http::Response::builder()
        .status(status)
        .header("content-type", CONTENT_TYPE)
        .body(RestResponseBody::from_json(json))
        .expect("valid JSON response")
}

/// Build a response without a body (204, 304, HEAD).
#[must_use]
pub fn empty_response(status: http::StatusCode) -> http::Response<RestResponseBody> {
    http::Response::builder()
        .status(status)
        .body(RestResponseBody::empty())
        .expect("valid empty response")
}
