//! Wire-level types for the RestStack resource engine.
//!
//! This crate holds the types shared by the HTTP layer and the engine:
//!
//! - **Verbs**: the exhaustive set of HTTP methods the engine serves
//! - **Items**: JSON records addressed by a resource name and an `id`
//! - **Requests**: the transport-agnostic request context handed to handlers
//! - **Errors**: `{ "message": ... }` error responses with their status codes
//! - **Broadcasts**: mutation events emitted after successful writes

pub mod error;
pub mod operations;
pub mod request;
pub mod types;

pub use error::{RestError, RestErrorCode};
pub use operations::Verb;
pub use request::RestRequest;
pub use types::{BroadcastAction, BroadcastEvent, Document, Item, ResourcePath};
