//! Weak entity tags and conditional request checks.
//!
//! Tags are weak and deterministic over the serialized JSON payload:
//!
//! ```text
//! W/"<byte length in hex>-<first 27 chars of base64(sha1(payload))>"
//! ```

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use digest::Digest;
use serde_json::Value;

/// Number of base64 characters kept from the SHA-1 digest.
const HASH_PREFIX_LEN: usize = 27;

/// Compute the weak ETag for a JSON payload.
#[must_use]
pub fn compute_etag(payload: &Value) -> String {
    let bytes = serde_json::to_vec(payload).unwrap_or_default();
    etag_for_bytes(&bytes)
}

/// Compute the weak ETag for raw bytes.
#[must_use]
pub fn etag_for_bytes(bytes: &[u8]) -> String {
    let hash = sha1::Sha1::digest(bytes);
    let encoded = BASE64_STANDARD.encode(hash);
    let prefix = &encoded[..HASH_PREFIX_LEN.min(encoded.len())];
    format!("W/\"{:x}-{prefix}\"", bytes.len())
}

/// Whether an `If-None-Match` header matches `etag` (weak comparison).
///
/// A match on a read means the client copy is current and a 304 is due.
///
/// # Examples
///
/// ```
/// use reststack_core::etag::if_none_match_hits;
///
/// assert!(if_none_match_hits("W/\"2-abc\"", "*"));
/// assert!(if_none_match_hits("W/\"2-abc\"", "\"2-abc\", W/\"3-xyz\""));
/// assert!(!if_none_match_hits("W/\"2-abc\"", "W/\"3-xyz\""));
/// ```
#[must_use]
pub fn if_none_match_hits(etag: &str, if_none_match: &str) -> bool {
    list_matches(etag, if_none_match)
}

/// Whether an `If-Match` header lets a write proceed against `etag`.
///
/// A missing header never holds; `*` holds for any existing representation.
///
/// # Examples
///
/// ```
/// use reststack_core::etag::if_match_holds;
///
/// assert!(if_match_holds("W/\"2-abc\"", Some("*")));
/// assert!(if_match_holds("W/\"2-abc\"", Some("W/\"2-abc\"")));
/// assert!(!if_match_holds("W/\"2-abc\"", Some("W/\"2-xyz\"")));
/// assert!(!if_match_holds("W/\"2-abc\"", None));
/// ```
#[must_use]
pub fn if_match_holds(etag: &str, if_match: Option<&str>) -> bool {
    if_match.is_some_and(|header| list_matches(etag, header))
}

fn list_matches(etag: &str, header: &str) -> bool {
    let target = normalize_etag(etag);
    header.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || (!candidate.is_empty() && normalize_etag(candidate) == target)
    })
}

/// Normalize an ETag by stripping the weak prefix and surrounding quotes.
fn normalize_etag(etag: &str) -> &str {
    let etag = etag.strip_prefix("W/").unwrap_or(etag);
    etag.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(etag)
}
