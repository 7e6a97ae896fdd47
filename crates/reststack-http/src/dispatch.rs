//! RestStack handler trait and request dispatch.

use std::future::Future;
use std::pin::Pin;

use reststack_model::error::RestError;
use reststack_model::request::RestRequest;

use crate::body::RestResponseBody;

/// Trait that the resource engine must implement.
///
/// The handler receives a fully resolved [`RestRequest`] (verb, resource,
/// id, headers, query, parsed body) and returns a complete HTTP response.
/// This trait serves as the boundary between the HTTP transport layer and
/// the engine.
pub trait RestHandler: Send + Sync + 'static {
    /// Handle a request and produce an HTTP response.
    fn handle_request(
        &self,
        request: RestRequest,
    ) -> Pin<Box<dyn Future<Output = Result<http::Response<RestResponseBody>, RestError>> + Send>>;
}

/// Dispatch a request to the handler.
pub async fn dispatch_request<H: RestHandler>(
    handler: &H,
    request: RestRequest,
) -> Result<http::Response<RestResponseBody>, RestError> {
    tracing::debug!(
        verb = %request.verb,
        resource = ?request.resource(),
        id = ?request.id(),
        "dispatching request",
    );
    handler.handle_request(request).await
}
