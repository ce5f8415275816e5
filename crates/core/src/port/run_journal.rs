// Run Journal Port (Interface)
// Durable record of runs and of every completed suspension point

use crate::domain::{Run, RunId};
use crate::error::Result;
use async_trait::async_trait;

/// Recorded outcome of one orchestrator step
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub run_id: RunId,
    /// Deterministic key, e.g. `resolve/lab1` or `grade/lab1/alice@uni.edu`
    pub step_key: String,
    pub outcome: serde_json::Value,
    pub recorded_at: i64,
}

/// Repository interface for run and step persistence
#[async_trait]
pub trait RunJournal: Send + Sync {
    /// Insert a new run
    async fn insert_run(&self, run: &Run) -> Result<()>;

    /// Find run by ID
    async fn find_run(&self, id: &RunId) -> Result<Option<Run>>;

    /// Update run state, timestamps, error and summary
    async fn update_run(&self, run: &Run) -> Result<()>;

    /// Runs that have not reached a terminal state (for recovery), oldest first
    async fn find_unfinished(&self) -> Result<Vec<Run>>;

    /// Most recent runs, newest first
    async fn recent_runs(&self, limit: usize) -> Result<Vec<Run>>;

    /// Look up a recorded step outcome
    async fn find_step(&self, run_id: &RunId, step_key: &str) -> Result<Option<StepRecord>>;

    /// Record a step outcome.
    ///
    /// Checkpoint semantics: the first record for (run_id, step_key) wins; a later
    /// call returns the already stored record unchanged.
    async fn record_step(&self, record: &StepRecord) -> Result<StepRecord>;

    /// Number of recorded steps for a run
    async fn count_steps(&self, run_id: &RunId) -> Result<i64>;

    /// Delete the steps of every COMPLETED or FAILED run.
    ///
    /// Terminal runs are never replayed, and roster steps carry student
    /// credentials. Returns the number of deleted steps.
    async fn prune_finished_steps(&self) -> Result<u64>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory journal; can simulate a crash after N recorded steps
    #[derive(Default)]
    pub struct InMemoryRunJournal {
        runs: Mutex<BTreeMap<RunId, Run>>,
        steps: Mutex<Vec<StepRecord>>,
        crash_after: Mutex<Option<usize>>,
        recorded: AtomicUsize,
        yield_on_access: AtomicBool,
    }

    impl InMemoryRunJournal {
        pub fn new() -> Self {
            Self::default()
        }

        /// Reject every step record once `n` steps are stored
        pub fn crash_after_steps(&self, n: Option<usize>) {
            *self.crash_after.lock().unwrap() = n;
        }

        /// Yield to the scheduler inside `find_unfinished` and `insert_run`,
        /// like a real database round trip would
        pub fn yield_on_access(&self, enabled: bool) {
            self.yield_on_access.store(enabled, Ordering::SeqCst);
        }

        pub fn steps(&self) -> Vec<StepRecord> {
            self.steps.lock().unwrap().clone()
        }

        /// Steps ever stored, including pruned ones
        pub fn recorded(&self) -> usize {
            self.recorded.load(Ordering::SeqCst)
        }

        async fn maybe_yield(&self) {
            if self.yield_on_access.load(Ordering::SeqCst) {
                tokio::task::yield_now().await;
            }
        }
    }

    #[async_trait]
    impl RunJournal for InMemoryRunJournal {
        async fn insert_run(&self, run: &Run) -> Result<()> {
            self.maybe_yield().await;
            let mut runs = self.runs.lock().unwrap();
            if runs.contains_key(&run.id) {
                return Err(AppError::Conflict(format!("run {} exists", run.id)));
            }
            runs.insert(run.id.clone(), run.clone());
            Ok(())
        }

        async fn find_run(&self, id: &RunId) -> Result<Option<Run>> {
            Ok(self.runs.lock().unwrap().get(id).cloned())
        }

        async fn update_run(&self, run: &Run) -> Result<()> {
            let mut runs = self.runs.lock().unwrap();
            match runs.get_mut(&run.id) {
                Some(stored) => {
                    *stored = run.clone();
                    Ok(())
                }
                None => Err(AppError::NotFound(format!("run {} not found", run.id))),
            }
        }

        async fn find_unfinished(&self) -> Result<Vec<Run>> {
            self.maybe_yield().await;
            let mut runs: Vec<Run> = self
                .runs
                .lock()
                .unwrap()
                .values()
                .filter(|r| !r.state.is_terminal())
                .cloned()
                .collect();
            runs.sort_by_key(|r| r.created_at);
            Ok(runs)
        }

        async fn recent_runs(&self, limit: usize) -> Result<Vec<Run>> {
            let mut runs: Vec<Run> = self.runs.lock().unwrap().values().cloned().collect();
            runs.sort_by_key(|r| std::cmp::Reverse(r.created_at));
            runs.truncate(limit);
            Ok(runs)
        }

        async fn find_step(&self, run_id: &RunId, step_key: &str) -> Result<Option<StepRecord>> {
            Ok(self
                .steps
                .lock()
                .unwrap()
                .iter()
                .find(|s| &s.run_id == run_id && s.step_key == step_key)
                .cloned())
        }

        async fn record_step(&self, record: &StepRecord) -> Result<StepRecord> {
            let mut steps = self.steps.lock().unwrap();
            if let Some(existing) = steps
                .iter()
                .find(|s| s.run_id == record.run_id && s.step_key == record.step_key)
            {
                return Ok(existing.clone());
            }
            if let Some(limit) = *self.crash_after.lock().unwrap() {
                if steps.len() >= limit {
                    return Err(AppError::Database("journal unavailable".to_string()));
                }
            }
            steps.push(record.clone());
            self.recorded.fetch_add(1, Ordering::SeqCst);
            Ok(record.clone())
        }

        async fn count_steps(&self, run_id: &RunId) -> Result<i64> {
            Ok(self
                .steps
                .lock()
                .unwrap()
                .iter()
                .filter(|s| &s.run_id == run_id)
                .count() as i64)
        }

        async fn prune_finished_steps(&self) -> Result<u64> {
            let runs = self.runs.lock().unwrap();
            let mut steps = self.steps.lock().unwrap();
            let before = steps.len();
            steps.retain(|s| {
                runs.get(&s.run_id)
                    .map(|r| !r.state.is_terminal())
                    .unwrap_or(true)
            });
            Ok((before - steps.len()) as u64)
        }
    }
}
