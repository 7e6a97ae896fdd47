//! RestStack request router.
//!
//! Every URL has the shape `/{resource}/{id}`; anything after the second
//! segment is ignored:
//!
//! ```text
//! GET /items          -> (items, None)
//! GET /items/42       -> (items, 42)
//! GET /items/42/extra -> (items, 42)
//! ```

use percent_encoding::percent_decode_str;

use reststack_model::error::RestError;
use reststack_model::operations::Verb;
use reststack_model::types::ResourcePath;

/// Resolve the verb for an HTTP method, rejecting anything outside the
/// supported set with 405.
pub fn resolve_verb(method: &http::Method) -> Result<Verb, RestError> {
    Verb::from_method(method).ok_or_else(|| RestError::unsupported_method(method))
}

/// Resolve a raw path (base path already stripped) into `(resource, id)`.
///
/// Absolute paths are parsed as a URI first; relative paths, and absolute
/// ones that fail to parse, are truncated at the first `?` and split as-is.
/// Empty segments are discarded and each segment is percent-decoded.
#[must_use]
pub fn resolve_path(raw: &str) -> ResourcePath {
    let parsed = if raw.starts_with('/') {
        raw.parse::<http::Uri>().ok()
    } else {
        None
    };
    let path = match parsed {
        Some(uri) => uri.path().to_owned(),
        None => raw.split('?').next().unwrap_or_default().to_owned(),
    };

    let mut segments = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| percent_decode_str(s).decode_utf8_lossy().into_owned());

    let resource = segments.next();
    let id = segments.next();
    ResourcePath::new(resource, id)
}

/// Strip a configured base path (e.g. `/api`) from a request path.
///
/// Returns `None` when the path lives outside the base path.
#[must_use]
pub fn strip_base_path<'a>(path: &'a str, base_path: &str) -> Option<&'a str> {
    let base = base_path.trim_end_matches('/');
    if base.is_empty() {
        return Some(path);
    }
    let rest = path.strip_prefix(base)?;
    if rest.is_empty() || rest.starts_with('/') || rest.starts_with('?') {
        Some(rest)
    } else {
        None
    }
}
