//! Durability of job records and checkpoints on an on-disk database.

mod common;

use std::sync::Arc;

use common::*;
use edgeinsight::db::Database;
use edgeinsight::job::{JobDescriptor, JobId, JobStage, JobStatus};
use edgeinsight::pipeline::ANALYZE_STEP;
use edgeinsight::store::{CheckpointStore, JobStateStore, SqliteJobStore};
use edgeinsight::synthesis::SynthesisConfig;
use tempfile::TempDir;

fn open_store(dir: &TempDir) -> Arc<SqliteJobStore> {
    let db = Database::open(&dir.path().join("data").join("edgeinsight.db")).unwrap();
    Arc::new(SqliteJobStore::new(db))
}

fn files() -> FetchBehavior {
    FetchBehavior::Files(vec![
        file("wrangler.toml", "name = \"widget\""),
        file("src/worker.js", "export default {}"),
    ])
}

#[tokio::test]
async fn test_completed_job_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let id = JobId::new();

    let finished = {
        let store = open_store(&dir);
        let fetcher = FakeFetcher::new(files());
        let model = ScriptedModel::new(vec![ReportJsonBuilder::new().verdict("B").as_text()]);
        let orchestrator = TestHarness::build_orchestrator(
            store.clone(),
            store.clone(),
            &fetcher,
            &model,
            SynthesisConfig::default(),
        );
        orchestrator.run(JobDescriptor::new(id, REPO)).await.unwrap()
    };
    assert_eq!(finished.status, JobStatus::Completed);

    let reopened = open_store(&dir);
    assert_eq!(reopened.get(&id).unwrap(), Some(finished));
    assert!(reopened.load(&id, ANALYZE_STEP).unwrap().is_none());
}

#[tokio::test]
async fn test_checkpoint_replays_after_reopen() {
    let dir = TempDir::new().unwrap();
    let id = JobId::new();

    {
        let store = FaultyStore::new(open_store(&dir));
        store.reject_terminal(true);
        let fetcher = FakeFetcher::new(files());
        let model = ScriptedModel::new(vec![ReportJsonBuilder::new()
            .risk("critical", "src/worker.js", "Secrets logged to console")
            .as_text()]);
        let orchestrator = TestHarness::build_orchestrator(
            store.clone(),
            store.clone(),
            &fetcher,
            &model,
            SynthesisConfig::default(),
        );
        assert!(orchestrator.run(JobDescriptor::new(id, REPO)).await.is_err());
        assert_eq!(
            store.inner().get(&id).unwrap().unwrap().stage,
            JobStage::GeneratingReport
        );
    }

    let store = open_store(&dir);
    assert!(store.load(&id, ANALYZE_STEP).unwrap().is_some());
    let fetcher = FakeFetcher::new(FetchBehavior::NotFound);
    let model = ScriptedModel::new(vec![]);
    let orchestrator = TestHarness::build_orchestrator(
        store.clone(),
        store.clone(),
        &fetcher,
        &model,
        SynthesisConfig::default(),
    );
    let replayed = orchestrator.run(JobDescriptor::new(id, REPO)).await.unwrap();

    assert_eq!(replayed.status, JobStatus::Completed);
    let report = replayed.report.unwrap();
    assert_eq!(report.security_risks[0].description, "Secrets logged to console");
    assert_eq!(replayed.files_found, 2);
    assert_eq!(fetcher.calls(), 0);
    assert_eq!(model.calls(), 0);
    assert!(store.load(&id, ANALYZE_STEP).unwrap().is_none());
}

#[tokio::test]
async fn test_failed_job_persists_error_message() {
    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let fetcher = FakeFetcher::new(FetchBehavior::Files(vec![]));
    let model = ScriptedModel::new(vec![]);
    let orchestrator = TestHarness::build_orchestrator(
        store.clone(),
        store.clone(),
        &fetcher,
        &model,
        SynthesisConfig::default(),
    );
    let id = JobId::new();
    orchestrator.run(JobDescriptor::new(id, REPO)).await.unwrap();

    let stored = open_store(&dir).get(&id).unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert_eq!(
        stored.error_message.as_deref(),
        Some("No files found in repository")
    );
    assert!(stored.report.is_none());
    assert!(stored.is_consistent());
}

#[tokio::test]
async fn test_service_over_sqlite_store() {
    use edgeinsight::service::AuditService;

    let dir = TempDir::new().unwrap();
    let store = open_store(&dir);
    let fetcher = FakeFetcher::new(files());
    let model = ScriptedModel::new(vec![ReportJsonBuilder::new().as_structured()]);
    let orchestrator = TestHarness::build_orchestrator(
        store.clone(),
        store.clone(),
        &fetcher,
        &model,
        SynthesisConfig::default(),
    );
    let service = AuditService::new(store, Arc::new(orchestrator));

    let job_id = service.submit(REPO).await.unwrap().job_id.to_string();
    let record = wait_for_terminal(&service, &job_id).await;

    assert_eq!(record.status, JobStatus::Completed);
    assert_eq!(record.files_found, 2);
    assert!(record.report.unwrap().is_well_formed());
}
