//! SQLite-backed store.

use serde_json::Value;

use super::{check_key, CheckpointStore, JobStateStore, StoreError};
use crate::db::job_repo::{self, JobRow};
use crate::db::{checkpoint_repo, Database};
use crate::job::{JobId, JobRecord};

/// Job records and checkpoints in one SQLite database.
#[derive(Clone)]
pub struct SqliteJobStore {
    db: Database,
}

impl SqliteJobStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

fn to_row(record: &JobRecord) -> Result<JobRow, StoreError> {
    Ok(JobRow {
        id: record.id.to_string(),
        repo_reference: record.repo_reference.clone(),
        status: record.status.as_str().to_string(),
        stage: record.stage.as_str().to_string(),
        files_found: i64::from(record.files_found),
        record: serde_json::to_string(record)?,
        created_at: record.created_at.to_rfc3339(),
        updated_at: record.updated_at.to_rfc3339(),
    })
}

impl JobStateStore for SqliteJobStore {
    fn get(&self, id: &JobId) -> Result<Option<JobRecord>, StoreError> {
        match job_repo::find_by_id(&self.db, &id.to_string())? {
            Some(row) => Ok(Some(serde_json::from_str(&row.record)?)),
            None => Ok(None),
        }
    }

    fn put(&self, id: &JobId, record: &JobRecord) -> Result<(), StoreError> {
        check_key(id, record)?;
        job_repo::upsert(&self.db, &to_row(record)?)?;
        Ok(())
    }
}

impl CheckpointStore for SqliteJobStore {
    fn load(&self, id: &JobId, step: &str) -> Result<Option<Value>, StoreError> {
        match checkpoint_repo::find(&self.db, &id.to_string(), step)? {
            Some(payload) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    fn save(&self, id: &JobId, step: &str, payload: &Value) -> Result<(), StoreError> {
        let payload = serde_json::to_string(payload)?;
        checkpoint_repo::upsert(&self.db, &id.to_string(), step, &payload)?;
        Ok(())
    }

    fn clear(&self, id: &JobId) -> Result<(), StoreError> {
        checkpoint_repo::delete_for_job(&self.db, &id.to_string())?;
        Ok(())
    }
}
