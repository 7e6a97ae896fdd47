//! Query-string filter DSL.
//!
//! Filters are expressed as query parameters rooted at `filter`:
//!
//! ```text
//! ?filter.name=widget                 name eq "widget"
//! ?filter.name[neq]=widget            name neq "widget"
//! ?filter.address.city[eq]=paris      address.city eq "paris"
//! ```
//!
//! The pipeline is:
//!
//! 1. **Parsing**: validate the raw query string into a [`Filter`] tree.
//! 2. **Evaluation**: match items against the tree in memory, or compile it
//!    into SQL for the PostgreSQL backend.

pub mod ast;
pub mod evaluator;
pub mod parser;

pub use ast::{Filter, FilterLeaf, FilterNode, FilterOp};
pub use evaluator::matches;
pub use parser::{FilterError, parse_filter};
