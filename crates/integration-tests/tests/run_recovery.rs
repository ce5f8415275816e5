//! Interrupted runs resumed after a daemon restart.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use common::{nunit, Pipeline};
use gradeflow_core::application::{PipelineConfig, RecoveryService};
use gradeflow_core::domain::{Run, RunId, RunState, RunTrigger};
use gradeflow_core::error::{AppError, Result};
use gradeflow_core::port::time_provider::mocks::FixedTimeProvider;
use gradeflow_core::port::{ArtifactStore, RunJournal, StepRecord};
use gradeflow_infra_sqlite::{create_pool, run_migrations};

/// Journal whose storage goes away after a fixed number of step records
struct CrashingJournal {
    inner: Arc<dyn RunJournal>,
    remaining: AtomicUsize,
}

impl CrashingJournal {
    fn new(inner: Arc<dyn RunJournal>, steps: usize) -> Self {
        Self {
            inner,
            remaining: AtomicUsize::new(steps),
        }
    }
}

#[async_trait]
impl RunJournal for CrashingJournal {
    async fn insert_run(&self, run: &Run) -> Result<()> {
        self.inner.insert_run(run).await
    }

    async fn find_run(&self, id: &RunId) -> Result<Option<Run>> {
        self.inner.find_run(id).await
    }

    async fn update_run(&self, run: &Run) -> Result<()> {
        self.inner.update_run(run).await
    }

    async fn find_unfinished(&self) -> Result<Vec<Run>> {
        self.inner.find_unfinished().await
    }

    async fn recent_runs(&self, limit: usize) -> Result<Vec<Run>> {
        self.inner.recent_runs(limit).await
    }

    async fn find_step(&self, run_id: &RunId, step_key: &str) -> Result<Option<StepRecord>> {
        self.inner.find_step(run_id, step_key).await
    }

    async fn record_step(&self, record: &StepRecord) -> Result<StepRecord> {
        let left = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if left.is_err() {
            return Err(AppError::Database("disk I/O error".to_string()));
        }
        self.inner.record_step(record).await
    }

    async fn count_steps(&self, run_id: &RunId) -> Result<i64> {
        self.inner.count_steps(run_id).await
    }

    async fn prune_finished_steps(&self) -> Result<u64> {
        self.inner.prune_finished_steps().await
    }
}

fn temp_db() -> String {
    std::env::temp_dir()
        .join(format!("gradeflow-recovery-{}.db", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .into_owned()
}

#[tokio::test]
async fn test_interrupted_run_resumes_after_restart() {
    let db_path = temp_db();
    let students = ["alice@uni.edu", "bob@uni.edu", "carol@uni.edu"];

    // First process: roster, resolve/lab1, grade alice, grade bob journaled.
    // Carol is graded but her step cannot be recorded.
    let run_id = {
        let p = Pipeline::open(&db_path).await;
        p.enroll("lab1", &students).await;
        for email in students {
            p.grader.document(email, nunit(&[("test1", "Passed", 2)]));
        }

        let journal = Arc::new(CrashingJournal::new(p.journal.clone(), 4));
        let orchestrator = p.orchestrator_with_journal(PipelineConfig::default(), journal);

        let run = orchestrator.create_run(RunTrigger::Scheduled).await.unwrap();
        let err = orchestrator.execute(run.clone()).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));

        let stored = p.journal.find_run(&run.id).await.unwrap().unwrap();
        assert_eq!(stored.state, RunState::ClassesResolved);
        assert_eq!(p.journal.count_steps(&run.id).await.unwrap(), 4);
        assert_eq!(p.grader.call_count(), 3);

        p.pool.close().await;
        run.id
    };

    // Second process, one minute later
    let pool = create_pool(&db_path).await.unwrap();
    run_migrations(&pool).await.unwrap();
    let p = Pipeline::with_pool(
        pool,
        Arc::new(FixedTimeProvider::at_utc(2024, 3, 7, 9, 1, 0)),
    );
    for email in students {
        p.grader.document(email, nunit(&[("test1", "Passed", 2)]));
    }

    let orchestrator = Arc::new(p.orchestrator(PipelineConfig::default()));
    let report = RecoveryService::new(orchestrator, p.journal.clone())
        .recover_unfinished_runs()
        .await
        .unwrap();
    assert_eq!(report.found, 1);
    assert_eq!(report.completed, 1);

    let run = p.journal.find_run(&run_id).await.unwrap().unwrap();
    assert_eq!(run.state, RunState::Completed);
    let summary = run.summary.unwrap();
    assert_eq!(summary.units_dispatched, 3);
    assert_eq!(summary.units_graded, 3);

    // Only the unjournaled unit is graded again
    assert_eq!(p.grader.calls_for("alice@uni.edu"), 0);
    assert_eq!(p.grader.calls_for("bob@uni.edu"), 0);
    assert_eq!(p.grader.calls_for("carol@uni.edu"), 1);

    // Carol's interrupted attempt and its retry both persisted
    let artifacts = p.artifacts.list("lab1").await.unwrap();
    assert_eq!(artifacts.len(), 4);
    assert_eq!(p.queue.count_for("carol@uni.edu").await.unwrap(), 2);

    let accumulated = p.report("lab1/accumulatedMarks.json").await.unwrap();
    assert_eq!(accumulated.as_object().unwrap().len(), 3);

    // The recovered run's steps, roster credentials included, are gone
    assert_eq!(p.journal.count_steps(&run_id).await.unwrap(), 0);
    let leftover: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM run_steps")
        .fetch_one(&p.pool)
        .await
        .unwrap();
    assert_eq!(leftover, 0);

    p.pool.close().await;
    let _ = std::fs::remove_file(&db_path);
}

#[tokio::test]
async fn test_recovery_with_nothing_unfinished() {
    let p = Pipeline::in_memory().await;
    p.enroll("lab1", &["alice@uni.edu"]).await;
    p.grader
        .document("alice@uni.edu", nunit(&[("test1", "Passed", 1)]));

    let orchestrator = Arc::new(p.orchestrator(PipelineConfig::default()));
    orchestrator.start(RunTrigger::Scheduled).await.unwrap();

    let report = RecoveryService::new(orchestrator, p.journal.clone())
        .recover_unfinished_runs()
        .await
        .unwrap();
    assert_eq!(report.found, 0);
    assert_eq!(p.grader.call_count(), 1);
}

#[tokio::test]
async fn test_roster_outage_fails_run_without_grading() {
    let p = Pipeline::in_memory().await;
    p.enroll("lab1", &["alice@uni.edu"]).await;
    sqlx::query("DROP TABLE credentials")
        .execute(&p.pool)
        .await
        .unwrap();

    let run = p
        .orchestrator(PipelineConfig::default())
        .start(RunTrigger::Scheduled)
        .await
        .unwrap();

    assert_eq!(run.state, RunState::Failed);
    assert!(run.error.unwrap().contains("Roster unavailable"));
    assert_eq!(p.grader.call_count(), 0);
    assert_eq!(p.journal.count_steps(&run.id).await.unwrap(), 0);
}
