//! RestStack resource engine.
//!
//! Turns resolved [`RestRequest`]s into storage operations:
//!
//! - **Filter**: `filter.<field>[<op>]=<value>` query DSL, parser and evaluator
//! - **Storage**: the [`Queries`] contract over memory, JSON file, JSON
//!   directory and PostgreSQL backends
//! - **ETag**: weak entity tags and conditional request checks
//! - **Interceptors**: per-verb request hooks and response-body transforms
//! - **Provider**: the verb handlers tying all of the above together
//!
//! [`RestRequest`]: reststack_model::RestRequest
//! [`Queries`]: storage::Queries
#![allow(missing_docs, clippy::doc_markdown, clippy::module_name_repetitions)]

pub mod broadcast;
pub mod config;
pub mod error;
pub mod etag;
pub mod filter;
pub mod handler;
pub mod interceptor;
pub mod provider;
pub mod schema;
pub mod storage;
