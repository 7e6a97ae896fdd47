//! Gateway service in front of the resource engine.
//!
//! Health-check endpoints (`/_reststack/health`, `/_health`, `/health`) are
//! answered here without touching storage; everything else is handed to the
//! [`RestHttpService`].

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;

use hyper::body::Incoming;
use hyper::service::Service;

use reststack_http::body::RestResponseBody;
use reststack_http::dispatch::RestHandler;
use reststack_http::response::CONTENT_TYPE;
use reststack_http::service::RestHttpService;

/// Gateway that answers health checks and forwards the rest.
#[derive(Debug)]
pub struct GatewayService<H: RestHandler> {
    rest: RestHttpService<H>,
    backend: &'static str,
}

impl<H: RestHandler> GatewayService<H> {
    /// Create a new gateway wrapping the REST service.
    ///
    /// `backend` is the storage backend name reported by health checks.
    pub fn new(rest: RestHttpService<H>, backend: &'static str) -> Self {
        Self { rest, backend }
    }
}

impl<H: RestHandler> Clone for GatewayService<H> {
    fn clone(&self) -> Self {
        Self {
            rest: self.rest.clone(),
            backend: self.backend,
        }
    }
}

impl<H: RestHandler> Service<http::Request<Incoming>> for GatewayService<H> {
    type Response = http::Response<RestResponseBody>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        if is_health_check(req.method(), req.uri().path()) {
            let resp = health_check_response(self.backend);
            return Box::pin(async move { Ok(resp) });
        }

        let rest = self.rest.clone();
        Box::pin(async move { rest.call(req).await })
    }
}

/// Check if the request targets a health check endpoint.
fn is_health_check(method: &http::Method, path: &str) -> bool {
    *method == http::Method::GET
        && (path == "/_reststack/health" || path == "/_health" || path == "/health")
}

/// Produce the health check response.
fn health_check_response(backend: &str) -> http::Response<RestResponseBody> {
    let body = serde_json::json!({
        "status": "running",
        "backend": backend,
        "version": crate::VERSION,
    });
    http::Response::builder()
        .status(http::StatusCode::OK)
        .header(http::header::CONTENT_TYPE, CONTENT_TYPE)
        .body(RestResponseBody::from_string(body.to_string()))
        .expect("static health response should be valid")
}
