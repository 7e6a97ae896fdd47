//! RestStack handler implementation bridging HTTP to the provider.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use reststack_http::body::RestResponseBody;
use reststack_http::dispatch::RestHandler;
use reststack_http::response::{empty_response, json_response};
use reststack_model::error::RestError;
use reststack_model::request::RestRequest;

use crate::provider::{RestResponse, RestStackProvider};

/// Handler that bridges the HTTP layer to the resource engine.
#[derive(Debug)]
pub struct RestStackHandler {
    provider: Arc<RestStackProvider>,
}

impl RestStackHandler {
    /// Create a new handler wrapping a provider.
    #[must_use]
    pub fn new(provider: Arc<RestStackProvider>) -> Self {
        Self { provider }
    }
}

impl RestHandler for RestStackHandler {
    fn handle_request(
        &self,
        request: RestRequest,
    ) -> Pin<Box<dyn Future<Output = Result<http::Response<RestResponseBody>, RestError>> + Send>>
    {
        let provider = Arc::clone(&self.provider);
        Box::pin(async move {
            let response = provider.handle(request).await?;
            into_http(response)
        })
    }
}

/// Serialize a provider response into an HTTP response.
fn into_http(response: RestResponse) -> Result<http::Response<RestResponseBody>, RestError> {
    let RestResponse {
        status,
        headers,
        body,
    } = response;
    let mut out = match body {
        Some(body) => {
            let json = serde_json::to_vec(&body).map_err(|e| {
                RestError::internal_error(format!("Failed to serialize response: {e}"))
            })?;
            json_response(status, json)
        }
        None => empty_response(status),
    };
    out.headers_mut().extend(headers);
    Ok(out)
}
