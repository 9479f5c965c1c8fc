use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tracing::{error, info, info_span, warn, Instrument};

use crate::config::AuditConfig;
use crate::fetch::{ContentFetcher, FetchError, FetchedFile, GithubFetcher, RepoReference};
use crate::job::{JobDescriptor, JobId, JobRecord, JobStage};
use crate::model::HttpChatModel;
use crate::sanitize;
use crate::secrets::resolve_secret_optional;
use crate::store::{CheckpointStore, JobStateStore, StoreError};
use crate::synthesis::{ReportSynthesizer, SynthesisOutcome};

use super::context::PipelineContext;
use super::error::PipelineError;
use super::progress::StageWriter;
use super::state::PipelineState;

/// Checkpoint key for the combined fetch + synthesize unit.
pub const ANALYZE_STEP: &str = "analyze-repository";

/// Memoized result of the analysis step. The fetched files themselves are
/// never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisCheckpoint {
    files_found: u32,
    #[serde(flatten)]
    outcome: SynthesisOutcome,
}

pub struct Orchestrator {
    store: Arc<dyn JobStateStore>,
    checkpoints: Arc<dyn CheckpointStore>,
    fetcher: Arc<dyn ContentFetcher>,
    synthesizer: ReportSynthesizer,
    credentials: Option<SecretString>,
}

impl Orchestrator {
    pub fn new(
        store: Arc<dyn JobStateStore>,
        checkpoints: Arc<dyn CheckpointStore>,
        fetcher: Arc<dyn ContentFetcher>,
        synthesizer: ReportSynthesizer,
    ) -> Self {
        Self {
            store,
            checkpoints,
            fetcher,
            synthesizer,
            credentials: None,
        }
    }

    /// Token passed to the fetcher on every run.
    pub fn with_credentials(mut self, credentials: SecretString) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Production constructor: GitHub fetcher, HTTP model, secrets resolved
    /// from the config.
    pub fn from_config(
        config: &AuditConfig,
        store: Arc<dyn JobStateStore>,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> crate::error::Result<Self> {
        let fetch = &config.fetch;
        let token = resolve_secret_optional(
            fetch.token.as_deref(),
            fetch.token_file.as_deref(),
            fetch.token_env_var.as_deref(),
        )?;

        let model_settings = &config.model;
        let api_key = resolve_secret_optional(
            model_settings.api_key.as_deref(),
            model_settings.api_key_file.as_deref(),
            model_settings.api_key_env_var.as_deref(),
        )?;

        let fetcher = GithubFetcher::from_settings(fetch)?;
        let model = HttpChatModel::new(
            &model_settings.endpoint,
            &model_settings.model,
            api_key,
            model_settings.timeout(),
        )?;
        let synthesizer = ReportSynthesizer::new(Arc::new(model), config.synthesis_config());

        Ok(Self {
            store,
            checkpoints,
            fetcher: Arc::new(fetcher),
            synthesizer,
            credentials: token,
        })
    }

    /// Runs one job to a terminal record.
    ///
    /// A job that is already terminal is returned untouched. Fetch errors and
    /// every other failure end in a `failed` record rather than an `Err`;
    /// `Err` means even the failure record could not be stored.
    pub async fn run(&self, descriptor: JobDescriptor) -> Result<JobRecord, PipelineError> {
        let span = info_span!(
            "pipeline",
            job_id = %descriptor.job_id,
            repo = %sanitize::redact_repo_url(&descriptor.repo_reference),
        );
        self.run_inner(descriptor).instrument(span).await
    }

    async fn run_inner(&self, descriptor: JobDescriptor) -> Result<JobRecord, PipelineError> {
        let existing = self.read_record(descriptor.job_id).await?;
        if let Some(record) = &existing {
            if record.is_terminal() {
                info!(status = %record.status, "Job already finished, nothing to do");
                return Ok(record.clone());
            }
        }

        let base = existing.unwrap_or_else(|| {
            JobRecord::queued(descriptor.job_id, descriptor.repo_reference.clone())
        });
        let mut ctx = PipelineContext::new(descriptor, base);
        let writer = StageWriter::spawn(self.store.clone());

        let outcome = AssertUnwindSafe(self.execute(&mut ctx, &writer))
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(Ok(record)) => Ok(record),
            Ok(Err(e)) => {
                error!(state = %ctx.state, error = %e, "Pipeline failed");
                self.persist_failure(&mut ctx, &writer, e.user_message())
                    .await
            }
            Err(_) => {
                let e = PipelineError::Panicked;
                error!(state = %ctx.state, error = %e, "Pipeline failed");
                self.persist_failure(&mut ctx, &writer, e.user_message())
                    .await
            }
        };

        writer.close().await;
        if let Ok(record) = &result {
            self.clear_checkpoints(record.id).await;
        }
        result
    }

    async fn execute(
        &self,
        ctx: &mut PipelineContext,
        writer: &StageWriter,
    ) -> Result<JobRecord, PipelineError> {
        ctx.advance(PipelineState::Fetching)?;
        writer.stage(ctx.set_stage(JobStage::FetchingRepo));

        let analysis = match self.load_checkpoint(ctx.descriptor.job_id).await? {
            Some(checkpoint) => {
                info!(
                    files_found = checkpoint.files_found,
                    "Replaying checkpointed analysis"
                );
                ctx.replayed = true;
                ctx.advance(PipelineState::Synthesizing)?;
                self.mark_analysis_started(ctx, writer, checkpoint.files_found);
                checkpoint
            }
            None => {
                let files = self
                    .fetch(&ctx.descriptor.repo_reference)
                    .instrument(info_span!("fetch_repository"))
                    .await?;
                let files_found = u32::try_from(files.len()).unwrap_or(u32::MAX);

                ctx.advance(PipelineState::Synthesizing)?;
                self.mark_analysis_started(ctx, writer, files_found);

                let outcome = self
                    .synthesizer
                    .synthesize(&ctx.descriptor.repo_reference, &files)
                    .instrument(info_span!("synthesize_report", files_found))
                    .await;

                let checkpoint = AnalysisCheckpoint {
                    files_found,
                    outcome,
                };
                self.save_checkpoint(ctx.descriptor.job_id, &checkpoint)
                    .await?;
                checkpoint
            }
        };

        ctx.advance(PipelineState::PersistingSuccess)?;
        writer.stage(ctx.set_stage(JobStage::GeneratingReport));

        let record = ctx
            .record
            .clone()
            .completed(analysis.outcome.report, analysis.files_found);
        writer.finish(&record).await?;

        ctx.record = record.clone();
        ctx.advance(PipelineState::Done)?;

        info!(
            files_found = analysis.files_found,
            attempts = analysis.outcome.attempts,
            degraded = analysis.outcome.degraded,
            replayed = ctx.replayed,
            "Job completed"
        );
        Ok(record)
    }

    fn mark_analysis_started(&self, ctx: &mut PipelineContext, writer: &StageWriter, files_found: u32) {
        ctx.record = ctx.record.clone().with_files_found(files_found);
        writer.stage(ctx.set_stage(JobStage::AiAnalysisStarted));
        writer.stage(ctx.set_stage(JobStage::AnalyzingCode));
    }

    async fn fetch(&self, repo_reference: &str) -> Result<Vec<FetchedFile>, FetchError> {
        let reference = RepoReference::parse(repo_reference)?;
        let files = self
            .fetcher
            .fetch(&reference, self.credentials.as_ref())
            .await?;
        if files.is_empty() {
            return Err(FetchError::Empty);
        }
        info!(files = files.len(), "Repository fetched");
        Ok(files)
    }

    async fn persist_failure(
        &self,
        ctx: &mut PipelineContext,
        writer: &StageWriter,
        message: String,
    ) -> Result<JobRecord, PipelineError> {
        // A panic can leave the context mid-transition; failure is always
        // reachable unless the run already finished.
        ctx.state = PipelineState::PersistingFailure {
            message: message.clone(),
        };

        let record = ctx.record.clone().failed(message);
        writer.finish(&record).await?;

        ctx.record = record.clone();
        ctx.advance(PipelineState::Done)?;
        Ok(record)
    }

    async fn read_record(&self, id: JobId) -> Result<Option<JobRecord>, PipelineError> {
        let store = self.store.clone();
        let record = blocking(move || store.get(&id)).await??;
        Ok(record)
    }

    /// Loads the analysis checkpoint. An undecodable payload counts as no
    /// checkpoint, so the step simply runs again.
    async fn load_checkpoint(&self, id: JobId) -> Result<Option<AnalysisCheckpoint>, PipelineError> {
        let checkpoints = self.checkpoints.clone();
        let payload = blocking(move || checkpoints.load(&id, ANALYZE_STEP)).await??;

        Ok(payload.and_then(|value| match serde_json::from_value(value) {
            Ok(checkpoint) => Some(checkpoint),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable checkpoint");
                None
            }
        }))
    }

    /// Checkpoints are only read before the terminal record exists, so they
    /// are dropped once it does. A failed delete leaves a stale row behind
    /// and nothing else.
    async fn clear_checkpoints(&self, id: JobId) {
        let checkpoints = self.checkpoints.clone();
        match blocking(move || checkpoints.clear(&id)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Could not drop checkpoints"),
            Err(e) => warn!(error = %e, "Could not drop checkpoints"),
        }
    }

    async fn save_checkpoint(
        &self,
        id: JobId,
        checkpoint: &AnalysisCheckpoint,
    ) -> Result<(), PipelineError> {
        let payload = serde_json::to_value(checkpoint).map_err(StoreError::from)?;
        let checkpoints = self.checkpoints.clone();
        blocking(move || checkpoints.save(&id, ANALYZE_STEP, &payload)).await??;
        Ok(())
    }
}

async fn blocking<T, F>(f: F) -> Result<T, PipelineError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PipelineError::Store(StoreError::Task(e.to_string())))
}
