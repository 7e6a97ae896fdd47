//! RestStack HTTP service layer.
//!
//! This crate turns raw HTTP traffic into [`RestRequest`]s, providing:
//!
//! - **Router**: Resolves the verb and the `(resource, id)` pair from the URL
//! - **Handler trait**: Defines the boundary between HTTP and the resource engine
//! - **Service**: Hyper `Service` implementation wrapping a handler
//! - **Response helpers**: JSON success/error response formatting
//!
//! [`RestRequest`]: reststack_model::RestRequest
#![allow(missing_docs)]

pub mod body;
pub mod dispatch;
pub mod response;
pub mod router;
pub mod service;

pub use body::RestResponseBody;
pub use dispatch::RestHandler;
pub use service::{RestHttpConfig, RestHttpService};
