pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
pub mod job;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod sanitize;
pub mod secrets;
pub mod service;
pub mod store;
pub mod synthesis;

pub use config::{load_config, load_config_from_str, AuditConfig};
pub use error::{ConfigError, EdgeInsightError, Result};
pub use fetch::{ContentFetcher, FetchError, FetchedFile, GithubFetcher, RepoReference};
pub use job::{JobDescriptor, JobId, JobRecord, JobStage, JobStatus};
pub use logging::{init_logging, LogFormat};
pub use model::{HttpChatModel, LanguageModel, Message, ModelError, ModelResponse};
pub use pipeline::{Orchestrator, PipelineError};
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError};
pub use service::{AuditService, PollResult, SubmitError, SubmitResponse};
pub use store::{CheckpointStore, JobStateStore, MemoryJobStore, SqliteJobStore, StoreError};
pub use synthesis::{Report, ReportSynthesizer, SynthesisConfig, SynthesisOutcome};
