//! Record store boundary.
//!
//! The hosted database is an opaque record store offering three operations:
//! query, save and delete by id. [`RecordStore`] is that boundary; list
//! controllers only ever talk to the store through it.
//!
//! Two backends ship with the crate:
//! - [`MemoryRecordStore`]: process-local, with failure injection for tests
//! - [`SqliteRecordStore`]: a single-table SQLite database (sqlx)

mod memory;
mod query;
mod sqlite;

pub use memory::MemoryRecordStore;
pub use query::{Predicate, Query, SortDescriptor};
pub use sqlite::{init_db, SqliteRecordStore};

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Record, RecordId};

/// Failure reported by a record store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backend could not complete the request.
    #[error("Record store error: {0}")]
    Backend(String),

    /// No record with this id exists.
    #[error("Record not found: {0}")]
    NotFound(RecordId),

    /// A stored record could not be decoded.
    #[error("Failed to decode stored record: {0}")]
    Decode(String),
}

/// Query/save/delete access to a remote record database.
///
/// Implementations assign an id to records saved without one and return the
/// record as stored.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn query(&self, query: &Query) -> Result<Vec<Record>, StoreError>;

    async fn save(&self, record: Record) -> Result<Record, StoreError>;

    async fn delete(&self, id: &RecordId) -> Result<RecordId, StoreError>;
}
