use thiserror::Error;

use crate::models::RecordError;
use crate::store::StoreError;

/// Errors returned by list controllers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ListError {
    /// Rejected client-side before any remote call.
    #[error("{0}")]
    Validation(String),

    /// The record store reported a failure.
    #[error(transparent)]
    Remote(#[from] StoreError),

    /// The store answered with a record that does not decode.
    #[error("Store returned an unreadable record: {0}")]
    Record(#[from] RecordError),

    /// No list entry matches the requested id or index.
    #[error("Not in list: {0}")]
    NotFound(String),

    /// The controller's actor has shut down.
    #[error("List controller is no longer running")]
    Closed,

    /// A background operation was cancelled or panicked.
    #[error("Background operation did not complete: {0}")]
    Interrupted(String),
}
