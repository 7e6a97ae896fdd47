//! In-memory filter evaluation.
//!
//! Comparison rules, applied to the field value found at each leaf path:
//!
//! - strings compare case-insensitively
//! - numbers compare numerically (the operand is parsed as a number)
//! - booleans compare as booleans (the operand must be `true`/`false`)
//! - anything else (null, arrays, objects, missing) never equals
//!
//! Dotted paths descend through objects only; a numeric segment does not
//! index into an array. `neq` is always the complement of `eq`.

use std::collections::BTreeMap;

use serde_json::Value;

use reststack_model::types::Item;

use super::ast::{Filter, FilterNode, FilterOp};

/// Whether `item` satisfies every clause of `filter`.
#[must_use]
pub fn matches(filter: &Filter, item: &Item) -> bool {
    filter
        .fields()
        .iter()
        .all(|(name, node)| matches_node(node, item.field(name).as_ref()))
}

fn matches_branch(children: &BTreeMap<String, FilterNode>, value: Option<&Value>) -> bool {
    children
        .iter()
        .all(|(name, node)| matches_node(node, value.and_then(|v| v.get(name))))
}

fn matches_node(node: &FilterNode, value: Option<&Value>) -> bool {
    match node {
        FilterNode::Leaf { op, value: operand } => {
            let equal = value.is_some_and(|v| loosely_equals(v, operand));
            match op {
                FilterOp::Eq => equal,
                FilterOp::Neq => !equal,
            }
        }
        FilterNode::Branch(children) => matches_branch(children, value),
    }
}

/// Type-aware equality between a stored value and a string operand.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn loosely_equals(value: &Value, operand: &str) -> bool {
    match value {
        Value::String(s) => s.to_lowercase() == operand.to_lowercase(),
        Value::Number(n) => match (n.as_f64(), operand.trim().parse::<f64>()) {
            (Some(lhs), Ok(rhs)) => lhs == rhs,
            _ => false,
        },
        Value::Bool(b) => match operand.to_ascii_lowercase().as_str() {
            "true" => *b,
            "false" => !*b,
            _ => false,
        },
        Value::Null | Value::Array(_) | Value::Object(_) => false,
    }
}
