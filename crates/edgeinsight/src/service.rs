//! Submit/poll facade over the orchestrator and job store.
//!
//! Submissions return as soon as the queued record is stored; the run
//! continues on the tokio runtime. Polls read the store directly and never
//! touch a running pipeline.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};

use crate::config::AuditConfig;
use crate::db::Database;
use crate::error::EdgeInsightError;
use crate::fetch::{ReferenceError, RepoReference};
use crate::job::{JobDescriptor, JobId, JobRecord, JobStatus};
use crate::pipeline::Orchestrator;
use crate::sanitize;
use crate::store::{JobStateStore, SqliteJobStore, StoreError};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("{0}")]
    InvalidReference(#[from] ReferenceError),

    #[error("Failed to create job: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub job_id: JobId,
    pub status: JobStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollResult {
    /// The stored record, verbatim.
    Found(JobRecord),
    /// Submitted here and still running, but the store does not show a
    /// record yet.
    NotYetStarted(JobId),
    NotFound,
}

/// Ids whose run has not returned yet.
type InFlight = Arc<RwLock<HashSet<JobId>>>;

pub struct AuditService {
    store: Arc<dyn JobStateStore>,
    orchestrator: Arc<Orchestrator>,
    in_flight: InFlight,
}

impl AuditService {
    pub fn new(store: Arc<dyn JobStateStore>, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            store,
            orchestrator,
            in_flight: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Builds the production service: SQLite store at the configured path,
    /// GitHub fetcher and HTTP model.
    pub fn from_config(config: &AuditConfig) -> crate::error::Result<Self> {
        let path = config.resolved_database_path().ok_or_else(|| {
            EdgeInsightError::Config(crate::error::ConfigError::Validation {
                message: "No databasePath configured and no home directory found".to_string(),
            })
        })?;
        let store = Arc::new(SqliteJobStore::new(Database::open(&path)?));
        let orchestrator = Orchestrator::from_config(config, store.clone(), store.clone())?;
        Ok(Self::new(store, Arc::new(orchestrator)))
    }

    /// Validates the reference, stores a queued record and starts the run.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn submit(&self, repo_reference: &str) -> Result<SubmitResponse, SubmitError> {
        let reference = RepoReference::parse(repo_reference)?;
        let job_id = JobId::new();
        let canonical = reference.to_string();

        track(&self.in_flight, job_id);
        let record = JobRecord::queued(job_id, canonical.clone());
        let store = self.store.clone();
        let stored = tokio::task::spawn_blocking(move || store.put(&record.id, &record))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))
            .and_then(|result| result);
        if let Err(e) = stored {
            untrack(&self.in_flight, &job_id);
            return Err(e.into());
        }

        info!(
            job_id = %job_id,
            repo = %sanitize::redact_repo_url(&canonical),
            "Audit job queued"
        );

        let orchestrator = self.orchestrator.clone();
        let in_flight = self.in_flight.clone();
        let descriptor = JobDescriptor::new(job_id, canonical);
        tokio::spawn(async move {
            if let Err(e) = orchestrator.run(descriptor).await {
                error!(job_id = %job_id, error = %e, "Could not record job outcome");
            }
            untrack(&in_flight, &job_id);
        });

        Ok(SubmitResponse {
            job_id,
            status: JobStatus::Queued,
        })
    }

    /// Looks up a job. Unknown and unparsable ids are `NotFound`, never an
    /// error.
    pub async fn poll(&self, job_id: &str) -> Result<PollResult, StoreError> {
        let id: JobId = match job_id.parse() {
            Ok(id) => id,
            Err(_) => return Ok(PollResult::NotFound),
        };

        let store = self.store.clone();
        let record = tokio::task::spawn_blocking(move || store.get(&id))
            .await
            .map_err(|e| StoreError::Task(e.to_string()))??;

        Ok(match record {
            Some(record) => PollResult::Found(record),
            None if self.is_in_flight(&id) => PollResult::NotYetStarted(id),
            None => PollResult::NotFound,
        })
    }

    /// Number of submitted jobs whose run has not returned yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.read().map(|ids| ids.len()).unwrap_or(0)
    }

    fn is_in_flight(&self, id: &JobId) -> bool {
        self.in_flight
            .read()
            .map(|ids| ids.contains(id))
            .unwrap_or(false)
    }
}

fn track(in_flight: &InFlight, id: JobId) {
    if let Ok(mut ids) = in_flight.write() {
        ids.insert(id);
    }
}

fn untrack(in_flight: &InFlight, id: &JobId) {
    if let Ok(mut ids) = in_flight.write() {
        ids.remove(id);
    }
}
