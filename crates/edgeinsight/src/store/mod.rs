//! Durable job state and step checkpoints.
//!
//! The job state store is the single source of truth for pollers. Writes
//! replace the whole record; reads of unknown ids return `None`.

pub mod memory;
pub mod sqlite;

use serde_json::Value;
use thiserror::Error;

use crate::db::DatabaseError;
use crate::job::{JobId, JobRecord};

pub use memory::MemoryJobStore;
pub use sqlite::SqliteJobStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Record id {record} does not match key {key}")]
    IdMismatch { key: JobId, record: JobId },

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Stage writer has shut down")]
    WriterClosed,

    #[error("Store task failed: {0}")]
    Task(String),
}

/// Per-job record storage.
pub trait JobStateStore: Send + Sync {
    fn get(&self, id: &JobId) -> Result<Option<JobRecord>, StoreError>;

    /// Atomically replaces the record for `id`.
    fn put(&self, id: &JobId, record: &JobRecord) -> Result<(), StoreError>;
}

/// Memoized step results keyed by `(job id, step name)`.
pub trait CheckpointStore: Send + Sync {
    fn load(&self, id: &JobId, step: &str) -> Result<Option<Value>, StoreError>;

    fn save(&self, id: &JobId, step: &str, payload: &Value) -> Result<(), StoreError>;

    /// Drops every checkpoint of the job.
    fn clear(&self, id: &JobId) -> Result<(), StoreError>;
}

fn check_key(id: &JobId, record: &JobRecord) -> Result<(), StoreError> {
    if *id != record.id {
        return Err(StoreError::IdMismatch {
            key: *id,
            record: record.id,
        });
    }
    Ok(())
}
