//! In-memory store for tests and ephemeral deployments.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;

use super::{check_key, CheckpointStore, JobStateStore, StoreError};
use crate::job::{JobId, JobRecord};

#[derive(Debug, Default)]
pub struct MemoryJobStore {
    records: RwLock<HashMap<JobId, JobRecord>>,
    checkpoints: RwLock<HashMap<(JobId, String), Value>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored job records.
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl JobStateStore for MemoryJobStore {
    fn get(&self, id: &JobId) -> Result<Option<JobRecord>, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(records.get(id).cloned())
    }

    fn put(&self, id: &JobId, record: &JobRecord) -> Result<(), StoreError> {
        check_key(id, record)?;
        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        records.insert(*id, record.clone());
        Ok(())
    }
}

impl CheckpointStore for MemoryJobStore {
    fn load(&self, id: &JobId, step: &str) -> Result<Option<Value>, StoreError> {
        let checkpoints = self
            .checkpoints
            .read()
            .map_err(|_| StoreError::LockPoisoned)?;
        Ok(checkpoints.get(&(*id, step.to_string())).cloned())
    }

    fn save(&self, id: &JobId, step: &str, payload: &Value) -> Result<(), StoreError> {
        let mut checkpoints = self
            .checkpoints
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;
        checkpoints.insert((*id, step.to_string()), payload.clone());
        Ok(())
    }

    fn clear(&self, id: &JobId) -> Result<(), StoreError> {
        let mut checkpoints = self
            .checkpoints
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;
        checkpoints.retain(|(job, _), _| job != id);
        Ok(())
    }
}
