//! RestStack HTTP service implementing the hyper `Service` trait.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Incoming;
use serde_json::Value;

use reststack_model::error::RestError;
use reststack_model::request::RestRequest;

use crate::body::RestResponseBody;
use crate::dispatch::{RestHandler, dispatch_request};
use crate::response::error_to_response;
use crate::router::{resolve_path, resolve_verb, strip_base_path};

/// Configuration for the RestStack HTTP service.
#[derive(Debug, Clone, Default)]
pub struct RestHttpConfig {
    /// Path prefix every resource URL lives under (e.g. `/api`).
    pub base_path: String,
}

/// Hyper `Service` implementation for the resource engine.
///
/// Wraps a [`RestHandler`] implementation and turns incoming HTTP requests
/// into [`RestRequest`]s.
#[derive(Debug)]
pub struct RestHttpService<H: RestHandler> {
    handler: Arc<H>,
    config: Arc<RestHttpConfig>,
}

impl<H: RestHandler> RestHttpService<H> {
    /// Create a new `RestHttpService`.
    pub fn new(handler: Arc<H>, config: RestHttpConfig) -> Self {
        Self {
            handler,
            config: Arc::new(config),
        }
    }
}

impl<H: RestHandler> Clone for RestHttpService<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            config: Arc::clone(&self.config),
        }
    }
}

impl<H: RestHandler> hyper::service::Service<http::Request<Incoming>> for RestHttpService<H> {
    type Response = http::Response<RestResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let handler = Arc::clone(&self.handler);
        let config = Arc::clone(&self.config);
        let request_id = uuid::Uuid::new_v4().to_string();

        Box::pin(async move {
            let response = process_request(req, handler.as_ref(), &config, &request_id).await;
            let response = add_common_headers(response, &request_id);
            Ok(response)
        })
    }
}

/// Process a single HTTP request through the full pipeline.
async fn process_request<H: RestHandler>(
    req: http::Request<Incoming>,
    handler: &H,
    config: &RestHttpConfig,
    request_id: &str,
) -> http::Response<RestResponseBody> {
    let (parts, incoming) = req.into_parts();

    // 1. Verb.
    let verb = match resolve_verb(&parts.method) {
        Ok(verb) => verb,
        Err(err) => return error_to_response(&err, request_id),
    };

    // 2. Base path and (resource, id).
    let Some(path) = strip_base_path(parts.uri.path(), &config.base_path) else {
        let err = RestError::not_found(format!("Path '{}' not found", parts.uri.path()));
        return error_to_response(&err, request_id);
    };
    let path = resolve_path(path);

    // 3. Body.
    let body = match collect_body(incoming).await {
        Ok(body) => body,
        Err(err) => return error_to_response(&err, request_id),
    };
    let body = match parse_json_body(&body) {
        Ok(body) => body,
        Err(err) => return error_to_response(&err, request_id),
    };

    let mut request = RestRequest::new(verb, path).with_headers(parts.headers);
    request.query = parts.uri.query().map(str::to_owned);
    request.body = body;

    // 4. Dispatch to handler.
    match dispatch_request(handler, request).await {
        Ok(response) => response,
        Err(err) => {
            if err.status_code.is_server_error() {
                tracing::error!(request_id, error = %err, "request failed");
            } else {
                tracing::debug!(request_id, error = %err, "request rejected");
            }
            error_to_response(&err, request_id)
        }
    }
}

/// Collect the incoming body into a single `Bytes` buffer.
async fn collect_body(incoming: Incoming) -> Result<Bytes, RestError> {
    incoming
        .collect()
        .await
        .map(http_body_util::Collected::to_bytes)
        .map_err(|e| RestError::internal_error(format!("Failed to read request body: {e}")))
}

/// Parse a request body; an empty body means "no body".
fn parse_json_body(body: &[u8]) -> Result<Option<Value>, RestError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| RestError::client_input("Malformed JSON body").with_source(e))
}

/// Add common response headers to every response.
fn add_common_headers(
    mut response: http::Response<RestResponseBody>,
    request_id: &str,
) -> http::Response<RestResponseBody> {
    let headers = response.headers_mut();

    if let Ok(hv) = http::HeaderValue::from_str(request_id) {
        headers.entry("x-request-id").or_insert(hv);
    }

    headers.insert("server", http::HeaderValue::from_static("RestStack"));

    // CORS headers.
    headers.insert(
        "access-control-allow-origin",
        http::HeaderValue::from_static("*"),
    );

    response
}
