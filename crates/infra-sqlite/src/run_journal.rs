// SQLite RunJournal Implementation

use crate::error::{decode_json, map_sqlx_error};
use async_trait::async_trait;
use gradeflow_core::domain::{Run, RunId, RunState, RunSummary, RunTrigger};
use gradeflow_core::error::{AppError, Result};
use gradeflow_core::port::{RunJournal, StepRecord};
use sqlx::SqlitePool;
use tracing::debug;

const TERMINAL_STATES: &str = "('COMPLETED', 'FAILED')";

pub struct SqliteRunJournal {
    pool: SqlitePool,
}

impl SqliteRunJournal {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn encode_summary(summary: &Option<RunSummary>) -> Result<Option<String>> {
    summary
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(AppError::from)
}

#[async_trait]
impl RunJournal for SqliteRunJournal {
    async fn insert_run(&self, run: &Run) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO runs (id, trigger_kind, state, created_at, started_at, finished_at, error, summary)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&run.id)
        .bind(run.trigger.to_string())
        .bind(run.state.to_string())
        .bind(run.created_at)
        .bind(run.started_at)
        .bind(run.finished_at)
        .bind(&run.error)
        .bind(encode_summary(&run.summary)?)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_run(&self, id: &RunId) -> Result<Option<Run>> {
        let row = sqlx::query_as::<_, RunRow>("SELECT * FROM runs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.map(RunRow::into_run).transpose()
    }

    async fn update_run(&self, run: &Run) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE runs
            SET state = ?, started_at = ?, finished_at = ?, error = ?, summary = ?
            WHERE id = ?
            "#,
        )
        .bind(run.state.to_string())
        .bind(run.started_at)
        .bind(run.finished_at)
        .bind(&run.error)
        .bind(encode_summary(&run.summary)?)
        .bind(&run.id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Run {} not found", run.id)));
        }
        Ok(())
    }

    async fn find_unfinished(&self) -> Result<Vec<Run>> {
        let sql = format!(
            "SELECT * FROM runs WHERE state NOT IN {} ORDER BY created_at ASC, id ASC",
            TERMINAL_STATES
        );
        let rows = sqlx::query_as::<_, RunRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter().map(RunRow::into_run).collect()
    }

    async fn recent_runs(&self, limit: usize) -> Result<Vec<Run>> {
        let rows = sqlx::query_as::<_, RunRow>(
            "SELECT * FROM runs ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter().map(RunRow::into_run).collect()
    }

    async fn find_step(&self, run_id: &RunId, step_key: &str) -> Result<Option<StepRecord>> {
        let row = sqlx::query_as::<_, StepRow>(
            "SELECT run_id, step_key, outcome, recorded_at FROM run_steps WHERE run_id = ? AND step_key = ?",
        )
        .bind(run_id)
        .bind(step_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(StepRow::into_record).transpose()
    }

    async fn record_step(&self, record: &StepRecord) -> Result<StepRecord> {
        // First write wins; a concurrent or replayed write keeps the stored outcome
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO run_steps (run_id, step_key, outcome, recorded_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&record.run_id)
        .bind(&record.step_key)
        .bind(record.outcome.to_string())
        .bind(record.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        self.find_step(&record.run_id, &record.step_key)
            .await?
            .ok_or_else(|| {
                AppError::Database(format!(
                    "Step {} of run {} vanished after insert",
                    record.step_key, record.run_id
                ))
            })
    }

    async fn count_steps(&self, run_id: &RunId) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM run_steps WHERE run_id = ?")
            .bind(run_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn prune_finished_steps(&self) -> Result<u64> {
        let sql = format!(
            "DELETE FROM run_steps WHERE run_id IN (SELECT id FROM runs WHERE state IN {})",
            TERMINAL_STATES
        );
        let result = sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let deleted = result.rows_affected();
        debug!(deleted_steps = deleted, "Pruned steps of finished runs");
        Ok(deleted)
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct RunRow {
    id: String,
    trigger_kind: String,
    state: String,
    created_at: i64,
    started_at: Option<i64>,
    finished_at: Option<i64>,
    error: Option<String>,
    summary: Option<String>,
}

impl RunRow {
    fn into_run(self) -> Result<Run> {
        let state = RunState::parse(&self.state).ok_or_else(|| {
            AppError::Database(format!("Run {} has unknown state {}", self.id, self.state))
        })?;
        let trigger = RunTrigger::parse(&self.trigger_kind).ok_or_else(|| {
            AppError::Database(format!(
                "Run {} has unknown trigger {}",
                self.id, self.trigger_kind
            ))
        })?;
        let summary = self
            .summary
            .as_deref()
            .map(|raw| decode_json("runs.summary", raw))
            .transpose()?;

        Ok(Run {
            id: self.id,
            trigger,
            state,
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
            error: self.error,
            summary,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StepRow {
    run_id: String,
    step_key: String,
    outcome: String,
    recorded_at: i64,
}

impl StepRow {
    fn into_record(self) -> Result<StepRecord> {
        Ok(StepRecord {
            outcome: decode_json("run_steps.outcome", &self.outcome)?,
            run_id: self.run_id,
            step_key: self.step_key,
            recorded_at: self.recorded_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use serde_json::json;

    async fn setup_journal() -> SqliteRunJournal {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteRunJournal::new(pool)
    }

    fn step(run_id: &str, key: &str, outcome: serde_json::Value) -> StepRecord {
        StepRecord {
            run_id: run_id.to_string(),
            step_key: key.to_string(),
            outcome,
            recorded_at: 10,
        }
    }

    #[tokio::test]
    async fn test_run_round_trip_and_lifecycle() {
        let journal = setup_journal().await;
        let mut run = Run::new("run-1", 100, RunTrigger::Manual);
        journal.insert_run(&run).await.unwrap();

        run.advance(RunState::ReportsSaved, 110).unwrap();
        run.complete(
            RunSummary {
                assignments: 2,
                units_graded: 5,
                ..Default::default()
            },
            120,
        )
        .unwrap();
        journal.update_run(&run).await.unwrap();

        let found = journal.find_run(&"run-1".to_string()).await.unwrap().unwrap();
        assert_eq!(found, run);
        assert!(journal.find_unfinished().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unfinished_and_recent_ordering() {
        let journal = setup_journal().await;
        for (id, created) in [("a", 1), ("b", 2), ("c", 3)] {
            journal
                .insert_run(&Run::new(id, created, RunTrigger::Scheduled))
                .await
                .unwrap();
        }
        let mut done = journal.find_run(&"b".to_string()).await.unwrap().unwrap();
        done.fail("roster down", 5).unwrap();
        journal.update_run(&done).await.unwrap();

        let unfinished: Vec<String> = journal
            .find_unfinished()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(unfinished, vec!["a", "c"]);

        let recent: Vec<String> = journal
            .recent_runs(2)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(recent, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_record_step_first_write_wins() {
        let journal = setup_journal().await;
        journal
            .insert_run(&Run::new("run-1", 1, RunTrigger::Scheduled))
            .await
            .unwrap();

        let first = journal
            .record_step(&step("run-1", "grade/lab1/a@uni.edu", json!({"outcome": "graded"})))
            .await
            .unwrap();
        let second = journal
            .record_step(&step("run-1", "grade/lab1/a@uni.edu", json!({"outcome": "failed"})))
            .await
            .unwrap();

        assert_eq!(first.outcome, json!({"outcome": "graded"}));
        assert_eq!(second, first);
        assert_eq!(journal.count_steps(&"run-1".to_string()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_prune_removes_only_finished_run_steps() {
        let journal = setup_journal().await;
        let mut done = Run::new("done", 1, RunTrigger::Scheduled);
        journal.insert_run(&done).await.unwrap();
        journal
            .insert_run(&Run::new("live", 2, RunTrigger::Scheduled))
            .await
            .unwrap();

        journal
            .record_step(&step("done", "roster", json!([{"credential": "s3cret"}])))
            .await
            .unwrap();
        journal
            .record_step(&step("done", "resolve/lab1", json!({"ok": true})))
            .await
            .unwrap();
        journal
            .record_step(&step("live", "roster", json!([{"credential": "s3cret"}])))
            .await
            .unwrap();

        // Nothing is terminal yet
        assert_eq!(journal.prune_finished_steps().await.unwrap(), 0);

        done.fail("roster down", 5).unwrap();
        journal.update_run(&done).await.unwrap();

        assert_eq!(journal.prune_finished_steps().await.unwrap(), 2);
        assert_eq!(journal.count_steps(&"done".to_string()).await.unwrap(), 0);
        assert_eq!(journal.count_steps(&"live".to_string()).await.unwrap(), 1);
        assert!(journal
            .find_step(&"live".to_string(), "roster")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_update_missing_run_is_not_found() {
        let journal = setup_journal().await;
        let err = journal
            .update_run(&Run::new("ghost", 1, RunTrigger::Manual))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
