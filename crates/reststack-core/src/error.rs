//! Conversions from engine errors into client-facing `RestError`s.

use reststack_model::error::RestError;

use crate::filter::FilterError;
use crate::storage::StorageError;

/// Convert a storage error into a `RestError`.
///
/// Takes `e` by value because this is used as a closure argument to `.map_err()`.
#[must_use]
pub fn storage_error_to_rest(e: StorageError) -> RestError {
    match e {
        StorageError::AlreadyExists { id } => RestError::id_exists(&id),
        StorageError::NotFound { id } => RestError::id_not_found(&id),
        StorageError::InvalidResource { .. } => {
            let message = e.to_string();
            RestError::client_input(message).with_source(e)
        }
        other => {
            tracing::error!(error = %other, "storage operation failed");
            RestError::internal_error(format!("Storage error: {other}")).with_source(other)
        }
    }
}

/// Convert a filter error into the generic malformed-filter `RestError`.
///
/// Takes `e` by value because this is used as a closure argument to `.map_err()`.
#[must_use]
pub fn filter_error_to_rest(e: FilterError) -> RestError {
    tracing::debug!(error = %e, "rejected filter");
    RestError::malformed_filter().with_source(e)
}
