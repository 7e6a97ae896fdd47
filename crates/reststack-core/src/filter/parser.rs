//! Filter query-string parser and validator.
//!
//! The parser is total: every query string either yields a [`Filter`] (or
//! `None` when no `filter` key is present) or a [`FilterError`].

use std::collections::BTreeMap;

use thiserror::Error;

use super::ast::{Filter, FilterNode, FilterOp};

/// Root key of every filter parameter.
const FILTER_ROOT: &str = "filter";

/// Errors that can occur while parsing a filter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// Opening and closing brackets do not balance.
    #[error("Unbalanced brackets in query string")]
    UnbalancedBrackets,
    /// Operator outside the supported set.
    #[error("Unsupported filter operator: {op}")]
    UnsupportedOperator {
        /// The rejected operator token.
        op: String,
    },
    /// The same field was given more than one value or operator.
    #[error("Ambiguous filter on field: {field}")]
    AmbiguousField {
        /// Dotted field path.
        field: String,
    },
    /// The key does not have the `filter.<field>[<op>]` shape.
    #[error("Malformed filter key: {key}")]
    MalformedKey {
        /// The offending key.
        key: String,
    },
}

/// One `filter.*` parameter after key validation.
#[derive(Debug)]
struct Clause {
    path: Vec<String>,
    op: FilterOp,
    value: String,
}

/// Parse the raw query string (without the leading `?`) into a filter.
///
/// Parameters not rooted at `filter` are ignored. Returns `Ok(None)` when
/// the query carries no filter at all.
pub fn parse_filter(query: &str) -> Result<Option<Filter>, FilterError> {
    let pairs: Vec<(String, String)> = form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if !pairs.iter().any(|(k, _)| is_filter_key(k)) {
        return Ok(None);
    }

    check_brackets(query)?;

    let mut clauses: Vec<Clause> = Vec::new();
    for (key, value) in pairs.into_iter().filter(|(k, _)| is_filter_key(k)) {
        let clause = parse_clause(&key, value)?;
        if let Some(existing) = clauses.iter().find(|c| overlaps(&c.path, &clause.path)) {
            let shorter = if existing.path.len() <= clause.path.len() {
                &existing.path
            } else {
                &clause.path
            };
            return Err(FilterError::AmbiguousField {
                field: shorter.join("."),
            });
        }
        clauses.push(clause);
    }

    let mut root = BTreeMap::new();
    for clause in clauses {
        insert(&mut root, &clause.path, clause.op, clause.value);
    }
    Ok(Some(Filter(root)))
}

fn is_filter_key(key: &str) -> bool {
    key.strip_prefix(FILTER_ROOT)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(['.', '[']))
}

/// Bracket depth over the raw query must never go negative and must end at
/// zero. Percent-encoded brackets are data and do not count.
fn check_brackets(query: &str) -> Result<(), FilterError> {
    let mut depth: i32 = 0;
    for ch in query.chars() {
        match ch {
            '[' => depth += 1,
            ']' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            return Err(FilterError::UnbalancedBrackets);
        }
    }
    if depth == 0 {
        Ok(())
    } else {
        Err(FilterError::UnbalancedBrackets)
    }
}

fn parse_clause(key: &str, value: String) -> Result<Clause, FilterError> {
    let malformed = || FilterError::MalformedKey {
        key: key.to_owned(),
    };

    let rest = key.strip_prefix(FILTER_ROOT).ok_or_else(malformed)?;
    let rest = rest.strip_prefix('.').ok_or_else(malformed)?;

    let (field, op) = match rest.find('[') {
        Some(pos) => {
            let token = rest[pos + 1..].strip_suffix(']').ok_or_else(malformed)?;
            if token.contains(['[', ']']) {
                return Err(malformed());
            }
            let op = FilterOp::from_token(token).ok_or_else(|| FilterError::UnsupportedOperator {
                op: token.to_owned(),
            })?;
            (&rest[..pos], op)
        }
        None => (rest, FilterOp::Eq),
    };

    if field.contains(']') {
        return Err(malformed());
    }
    let path: Vec<String> = field.split('.').map(str::to_owned).collect();
    if path.iter().any(String::is_empty) {
        return Err(malformed());
    }

    Ok(Clause { path, op, value })
}

/// Two paths collide when one is a prefix of the other.
fn overlaps(a: &[String], b: &[String]) -> bool {
    let n = a.len().min(b.len());
    a[..n] == b[..n]
}

fn insert(map: &mut BTreeMap<String, FilterNode>, path: &[String], op: FilterOp, value: String) {
    let Some((head, tail)) = path.split_first() else {
        return;
    };
    if tail.is_empty() {
        map.insert(head.clone(), FilterNode::Leaf { op, value });
        return;
    }
    let node = map
        .entry(head.clone())
        .or_insert_with(|| FilterNode::Branch(BTreeMap::new()));
    if let FilterNode::Branch(children) = node {
        insert(children, tail, op, value);
    }
}
