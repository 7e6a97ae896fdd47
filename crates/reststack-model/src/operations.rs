//! RestStack verb enum.

use std::fmt;

/// All HTTP verbs served by the resource engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Read one item or a (filtered) collection.
    Get,
    /// Same as `Get`, without a body.
    Head,
    /// Create an item.
    Post,
    /// Replace an item.
    Put,
    /// Shallow-merge into an item.
    Patch,
    /// Delete one item or a (filtered) collection.
    Delete,
}

impl Verb {
    /// Every supported verb.
    pub const ALL: [Self; 6] = [
        Self::Get,
        Self::Head,
        Self::Post,
        Self::Put,
        Self::Patch,
        Self::Delete,
    ];

    /// Returns the HTTP method name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Map an HTTP method onto a verb.
    #[must_use]
    pub fn from_method(method: &http::Method) -> Option<Self> {
        match *method {
            http::Method::GET => Some(Self::Get),
            http::Method::HEAD => Some(Self::Head),
            http::Method::POST => Some(Self::Post),
            http::Method::PUT => Some(Self::Put),
            http::Method::PATCH => Some(Self::Patch),
            http::Method::DELETE => Some(Self::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
