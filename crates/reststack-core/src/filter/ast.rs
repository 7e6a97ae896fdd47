//! Filter AST types.

use std::collections::BTreeMap;
use std::fmt;

/// Comparison operator of a filter leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOp {
    /// Type-aware equality (strings compare case-insensitively).
    Eq,
    /// Logical complement of [`FilterOp::Eq`].
    Neq,
}

impl FilterOp {
    /// Parse an operator token. Matching is case-sensitive.
    #[must_use]
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "eq" => Some(Self::Eq),
            "neq" => Some(Self::Neq),
            _ => None,
        }
    }

    /// The operator token as it appears in a query string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One node of the filter tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterNode {
    /// Exactly one operator applied to a field.
    Leaf {
        /// Operator.
        op: FilterOp,
        /// Raw string operand.
        value: String,
    },
    /// Nested fields of an object-valued field.
    Branch(BTreeMap<String, FilterNode>),
}

/// A validated filter: top-level field name to node. All fields are ANDed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter(pub BTreeMap<String, FilterNode>);

/// A flattened leaf: the full field path plus its operator and operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterLeaf<'a> {
    /// Field path from the item root (`["address", "city"]`).
    pub path: Vec<&'a str>,
    /// Operator.
    pub op: FilterOp,
    /// Raw string operand.
    pub value: &'a str,
}

impl Filter {
    /// The top-level fields.
    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, FilterNode> {
        &self.0
    }

    /// Whether the filter constrains nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All leaves in path order.
    #[must_use]
    pub fn leaves(&self) -> Vec<FilterLeaf<'_>> {
        let mut out = Vec::new();
        for (name, node) in &self.0 {
            collect_leaves(node, vec![name.as_str()], &mut out);
        }
        out
    }
}

fn collect_leaves<'a>(node: &'a FilterNode, path: Vec<&'a str>, out: &mut Vec<FilterLeaf<'a>>) {
    match node {
        FilterNode::Leaf { op, value } => out.push(FilterLeaf {
            path,
            op: *op,
            value,
        }),
        FilterNode::Branch(children) => {
            for (name, child) in children {
                let mut child_path = path.clone();
                child_path.push(name);
                collect_leaves(child, child_path, out);
            }
        }
    }
}
