//! Job records as seen by pollers.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::synthesis::Report;

/// Opaque job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generates a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Overall status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Returns true for `completed` and `failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress marker within a `processing` job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStage {
    #[default]
    None,
    FetchingRepo,
    AiAnalysisStarted,
    AnalyzingCode,
    GeneratingReport,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::None => "NONE",
            JobStage::FetchingRepo => "FETCHING_REPO",
            JobStage::AiAnalysisStarted => "AI_ANALYSIS_STARTED",
            JobStage::AnalyzingCode => "ANALYZING_CODE",
            JobStage::GeneratingReport => "GENERATING_REPORT",
        }
    }
}

impl fmt::Display for JobStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStage::None => write!(f, "Idle"),
            JobStage::FetchingRepo => write!(f, "Fetching repository"),
            JobStage::AiAnalysisStarted => write!(f, "AI analysis started"),
            JobStage::AnalyzingCode => write!(f, "Analyzing code"),
            JobStage::GeneratingReport => write!(f, "Generating report"),
        }
    }
}

/// The full persisted state of one job.
///
/// Records are replaced wholesale on every write. Terminal records are built
/// only through [`JobRecord::completed`] and [`JobRecord::failed`], which keep
/// `report` and `error_message` mutually exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    /// Unique job identifier.
    pub id: JobId,
    /// Canonical repository reference being audited.
    pub repo_reference: String,
    /// Overall status.
    pub status: JobStatus,
    /// Current stage; `NONE` unless processing.
    pub stage: JobStage,
    /// Number of files returned by the fetch step.
    pub files_found: u32,
    /// Final report (completed jobs only).
    pub report: Option<Report>,
    /// Human-readable failure (failed jobs only).
    pub error_message: Option<String>,
    /// When the job was submitted.
    pub created_at: DateTime<Utc>,
    /// When the record was last written.
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Creates the record written at submission time.
    pub fn queued(id: JobId, repo_reference: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            repo_reference: repo_reference.into(),
            status: JobStatus::Queued,
            stage: JobStage::None,
            files_found: 0,
            report: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Moves the job into `processing` at the given stage.
    pub fn with_stage(mut self, stage: JobStage) -> Self {
        self.status = JobStatus::Processing;
        self.stage = stage;
        self.updated_at = Utc::now();
        self
    }

    pub fn with_files_found(mut self, files_found: u32) -> Self {
        self.files_found = files_found;
        self.updated_at = Utc::now();
        self
    }

    /// Terminal success.
    pub fn completed(mut self, report: Report, files_found: u32) -> Self {
        self.status = JobStatus::Completed;
        self.stage = JobStage::None;
        self.files_found = files_found;
        self.report = Some(report);
        self.error_message = None;
        self.updated_at = Utc::now();
        self
    }

    /// Terminal failure.
    pub fn failed(mut self, message: impl Into<String>) -> Self {
        self.status = JobStatus::Failed;
        self.stage = JobStage::None;
        self.report = None;
        self.error_message = Some(message.into());
        self.updated_at = Utc::now();
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Checks the status/report/error invariants.
    pub fn is_consistent(&self) -> bool {
        match self.status {
            JobStatus::Queued => {
                self.stage == JobStage::None
                    && self.report.is_none()
                    && self.error_message.is_none()
            }
            JobStatus::Processing => self.report.is_none() && self.error_message.is_none(),
            JobStatus::Completed => {
                self.stage == JobStage::None
                    && self.report.is_some()
                    && self.error_message.is_none()
            }
            JobStatus::Failed => {
                self.stage == JobStage::None
                    && self.report.is_none()
                    && self.error_message.is_some()
            }
        }
    }
}

/// What the orchestrator needs to run a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDescriptor {
    pub job_id: JobId,
    pub repo_reference: String,
}

impl JobDescriptor {
    pub fn new(job_id: JobId, repo_reference: impl Into<String>) -> Self {
        Self {
            job_id,
            repo_reference: repo_reference.into(),
        }
    }
}
