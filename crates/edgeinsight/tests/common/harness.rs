//! Test harness with scripted model and fetcher.
//!
//! Both fakes count their calls so tests can assert that a step was (or was
//! not) executed.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;

use edgeinsight::fetch::{ContentFetcher, FetchError, FetchedFile, RepoReference};
use edgeinsight::model::{LanguageModel, Message, ModelError, ModelResponse};
use edgeinsight::pipeline::Orchestrator;
use edgeinsight::service::{AuditService, PollResult};
use edgeinsight::store::{CheckpointStore, JobStateStore, MemoryJobStore, StoreError};
use edgeinsight::synthesis::{ReportSynthesizer, SynthesisConfig};
use edgeinsight::{JobDescriptor, JobId, JobRecord, JobStatus};
use serde_json::Value;

/// Replays queued answers in order. Once the script runs out it keeps
/// answering with unparsable text.
pub struct ScriptedModel {
    answers: Mutex<VecDeque<Result<ModelResponse, ModelError>>>,
    conversations: Mutex<Vec<Vec<Message>>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(answers: Vec<Result<ModelResponse, ModelError>>) -> Arc<Self> {
        Arc::new(Self {
            answers: Mutex::new(answers.into()),
            conversations: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every message list the model was invoked with.
    pub fn conversations(&self) -> Vec<Vec<Message>> {
        self.conversations.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted-model"
    }

    async fn invoke(
        &self,
        messages: &[Message],
        _max_output_tokens: u32,
    ) -> Result<ModelResponse, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.conversations.lock().unwrap().push(messages.to_vec());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ModelResponse::Text("script exhausted".to_string())))
    }
}

#[derive(Debug, Clone)]
pub enum FetchBehavior {
    Files(Vec<FetchedFile>),
    NotFound,
    Unauthorized,
    Panic,
}

pub struct FakeFetcher {
    behavior: Mutex<FetchBehavior>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl FakeFetcher {
    pub fn new(behavior: FetchBehavior) -> Arc<Self> {
        Arc::new(Self {
            behavior: Mutex::new(behavior),
            calls: AtomicUsize::new(0),
            delay: None,
        })
    }

    /// Fetcher that sleeps before answering, so pollers can observe
    /// intermediate states.
    pub fn slow(behavior: FetchBehavior, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            behavior: Mutex::new(behavior),
            calls: AtomicUsize::new(0),
            delay: Some(delay),
        })
    }

    pub fn set_behavior(&self, behavior: FetchBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentFetcher for FakeFetcher {
    async fn fetch(
        &self,
        reference: &RepoReference,
        _credentials: Option<&SecretString>,
    ) -> Result<Vec<FetchedFile>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let behavior = self.behavior.lock().unwrap().clone();
        match behavior {
            FetchBehavior::Files(files) => Ok(files),
            FetchBehavior::NotFound => Err(FetchError::NotFound(reference.to_string())),
            FetchBehavior::Unauthorized => Err(FetchError::Unauthorized {
                reference: reference.to_string(),
                status: 403,
            }),
            FetchBehavior::Panic => panic!("fetcher exploded"),
        }
    }
}

/// Store wrapper whose writes and reads can be switched to fail or lag.
pub struct FaultyStore<S> {
    inner: Arc<S>,
    reject_completed: AtomicBool,
    reject_terminal: AtomicBool,
    reject_checkpoints: AtomicBool,
    hide_records: AtomicBool,
}

impl<S> FaultyStore<S> {
    pub fn new(inner: Arc<S>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            reject_completed: AtomicBool::new(false),
            reject_terminal: AtomicBool::new(false),
            reject_checkpoints: AtomicBool::new(false),
            hide_records: AtomicBool::new(false),
        })
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Fails puts of `completed` records.
    pub fn reject_completed(&self, on: bool) {
        self.reject_completed.store(on, Ordering::SeqCst);
    }

    /// Fails puts of any terminal record, as if the process died before
    /// finishing the job.
    pub fn reject_terminal(&self, on: bool) {
        self.reject_terminal.store(on, Ordering::SeqCst);
    }

    /// Fails checkpoint saves.
    pub fn reject_checkpoints(&self, on: bool) {
        self.reject_checkpoints.store(on, Ordering::SeqCst);
    }

    /// Makes `get` miss every record, like a replica that has not caught up.
    pub fn hide_records(&self, on: bool) {
        self.hide_records.store(on, Ordering::SeqCst);
    }

    fn rejects(&self, record: &JobRecord) -> bool {
        match record.status {
            JobStatus::Completed => {
                self.reject_completed.load(Ordering::SeqCst)
                    || self.reject_terminal.load(Ordering::SeqCst)
            }
            JobStatus::Failed => self.reject_terminal.load(Ordering::SeqCst),
            _ => false,
        }
    }
}

fn disk_full() -> StoreError {
    StoreError::Task("disk full".to_string())
}

impl<S: JobStateStore> JobStateStore for FaultyStore<S> {
    fn get(&self, id: &JobId) -> Result<Option<JobRecord>, StoreError> {
        if self.hide_records.load(Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.get(id)
    }

    fn put(&self, id: &JobId, record: &JobRecord) -> Result<(), StoreError> {
        if self.rejects(record) {
            return Err(disk_full());
        }
        self.inner.put(id, record)
    }
}

impl<S: CheckpointStore> CheckpointStore for FaultyStore<S> {
    fn load(&self, id: &JobId, step: &str) -> Result<Option<Value>, StoreError> {
        self.inner.load(id, step)
    }

    fn save(&self, id: &JobId, step: &str, payload: &Value) -> Result<(), StoreError> {
        if self.reject_checkpoints.load(Ordering::SeqCst) {
            return Err(disk_full());
        }
        self.inner.save(id, step, payload)
    }

    fn clear(&self, id: &JobId) -> Result<(), StoreError> {
        self.inner.clear(id)
    }
}

/// Orchestrator over an in-memory store with scripted collaborators.
pub struct TestHarness {
    pub store: Arc<MemoryJobStore>,
    pub fetcher: Arc<FakeFetcher>,
    pub model: Arc<ScriptedModel>,
    pub orchestrator: Arc<Orchestrator>,
}

impl TestHarness {
    pub fn new(fetcher: Arc<FakeFetcher>, model: Arc<ScriptedModel>) -> Self {
        Self::with_config(fetcher, model, SynthesisConfig::default())
    }

    pub fn with_config(
        fetcher: Arc<FakeFetcher>,
        model: Arc<ScriptedModel>,
        config: SynthesisConfig,
    ) -> Self {
        let store = Arc::new(MemoryJobStore::new());
        let orchestrator = Self::build_orchestrator(store.clone(), store.clone(), &fetcher, &model, config);
        Self {
            store,
            fetcher,
            model,
            orchestrator: Arc::new(orchestrator),
        }
    }

    pub fn build_orchestrator(
        store: Arc<dyn JobStateStore>,
        checkpoints: Arc<dyn CheckpointStore>,
        fetcher: &Arc<FakeFetcher>,
        model: &Arc<ScriptedModel>,
        config: SynthesisConfig,
    ) -> Orchestrator {
        let model: Arc<dyn LanguageModel> = model.clone();
        let fetcher: Arc<dyn ContentFetcher> = fetcher.clone();
        Orchestrator::new(
            store,
            checkpoints,
            fetcher,
            ReportSynthesizer::new(model, config),
        )
    }

    pub fn service(&self) -> AuditService {
        AuditService::new(self.store.clone(), self.orchestrator.clone())
    }

    /// Runs a fresh job for `repo` to completion.
    pub async fn run(&self, repo: &str) -> (JobId, JobRecord) {
        let id = JobId::new();
        let record = self
            .orchestrator
            .run(JobDescriptor::new(id, repo))
            .await
            .expect("orchestrator returned an error");
        (id, record)
    }

    pub fn stored(&self, id: &JobId) -> Option<JobRecord> {
        self.store.get(id).unwrap()
    }
}

/// Polls until the job reaches a terminal status or the timeout elapses.
pub async fn wait_for_terminal(service: &AuditService, job_id: &str) -> JobRecord {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if let PollResult::Found(record) = service.poll(job_id).await.unwrap() {
            if record.is_terminal() {
                return record;
            }
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {} did not finish in time",
            job_id
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
