use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

use super::{Query, RecordStore, StoreError};
use crate::models::{Record, RecordId};

#[derive(Default)]
struct MemoryState {
    /// Stored records in insertion order.
    records: Vec<Record>,
    /// Every record passed to `save`, successful or not.
    save_calls: Vec<Record>,
    /// Every id passed to `delete`, successful or not.
    delete_calls: Vec<RecordId>,
    query_calls: usize,
    failing_queries: usize,
    failing_saves: usize,
    failing_deletes: usize,
    rejected_record_types: HashSet<String>,
    query_delay: Option<Duration>,
}

/// Process-local record store.
///
/// Cloning shares the underlying state. Failures can be injected per
/// operation; an injected failure is consumed by the next matching call.
#[derive(Clone, Default)]
pub struct MemoryRecordStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panic while holding the lock leaves plain data behind; keep using it.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Inserts a record directly, bypassing the save log.
    pub fn seed(&self, record: Record) -> Record {
        let record = assign_identity(record);
        self.lock().records.push(record.clone());
        record
    }

    /// Makes the next `count` queries fail.
    pub fn fail_queries(&self, count: usize) {
        self.lock().failing_queries = count;
    }

    /// Makes the next `count` saves fail.
    pub fn fail_saves(&self, count: usize) {
        self.lock().failing_saves = count;
    }

    /// Makes the next `count` deletes fail.
    pub fn fail_deletes(&self, count: usize) {
        self.lock().failing_deletes = count;
    }

    /// Makes every save of `record_type` fail until the store is dropped.
    pub fn reject_saves_of(&self, record_type: &str) {
        self.lock()
            .rejected_record_types
            .insert(record_type.to_string());
    }

    /// Delays every query answer by `delay`.
    ///
    /// The answer reflects the records as they were when the query arrived.
    pub fn set_query_delay(&self, delay: Option<Duration>) {
        self.lock().query_delay = delay;
    }

    /// Number of queries received, including failed ones.
    pub fn query_count(&self) -> usize {
        self.lock().query_calls
    }

    pub fn save_calls(&self) -> Vec<Record> {
        self.lock().save_calls.clone()
    }

    pub fn delete_calls(&self) -> Vec<RecordId> {
        self.lock().delete_calls.clone()
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.lock().records.iter().any(|r| r.id.as_ref() == Some(id))
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn assign_identity(mut record: Record) -> Record {
    if record.id.is_none() {
        record.id = Some(RecordId::new(Uuid::new_v4().to_string()));
    }
    if record.created_at.is_none() {
        record.created_at = Some(Utc::now());
    }
    record
}

fn take_failure(counter: &mut usize) -> bool {
    if *counter > 0 {
        *counter -= 1;
        true
    } else {
        false
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn query(&self, query: &Query) -> Result<Vec<Record>, StoreError> {
        let (records, delay) = {
            let mut state = self.lock();
            state.query_calls += 1;
            if take_failure(&mut state.failing_queries) {
                return Err(StoreError::Backend("injected query failure".into()));
            }
            (state.records.clone(), state.query_delay)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        Ok(query.apply(records))
    }

    async fn save(&self, record: Record) -> Result<Record, StoreError> {
        let mut state = self.lock();
        state.save_calls.push(record.clone());
        if take_failure(&mut state.failing_saves) {
            return Err(StoreError::Backend("injected save failure".into()));
        }
        if state.rejected_record_types.contains(&record.record_type) {
            return Err(StoreError::Backend(format!(
                "{} records are rejected",
                record.record_type
            )));
        }

        let record = assign_identity(record);
        match state.records.iter().position(|r| r.id == record.id) {
            Some(index) => state.records[index] = record.clone(),
            None => state.records.push(record.clone()),
        }
        Ok(record)
    }

    async fn delete(&self, id: &RecordId) -> Result<RecordId, StoreError> {
        let mut state = self.lock();
        state.delete_calls.push(id.clone());
        if take_failure(&mut state.failing_deletes) {
            return Err(StoreError::Backend("injected delete failure".into()));
        }

        let before = state.records.len();
        state.records.retain(|r| r.id.as_ref() != Some(id));
        if state.records.len() == before {
            return Err(StoreError::NotFound(id.clone()));
        }
        Ok(id.clone())
    }
}
