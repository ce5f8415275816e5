// Orchestrator - durable, resumable run pipeline
//
// Stage A (roster) -> Stage B (resolve, fan-out/join) -> Stage C (grade, join)
// -> Stage D (report, fan-out/join). Every dispatched branch is a journaled
// step; replay returns the recorded outcome instead of dispatching again.

mod config;

pub use config::{IsolationMode, PipelineConfig};

use crate::application::barrier::JoinBarrier;
use crate::application::class_resolver::ClassResolver;
use crate::application::constants::{report_step_key, resolve_step_key, ROSTER_STEP_KEY};
use crate::application::grade_worker::{GradingOutcome, StudentGradeWorker};
use crate::application::report::{ReportAggregator, ReportOutcome};
use crate::application::roster::RosterService;
use crate::domain::{Assignment, ClassJob, GradingUnit, Run, RunId, RunState, RunSummary, RunTrigger};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, RunJournal, StepRecord, TimeProvider};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Journaled outcome of a branch that may fail without failing the run
type BranchResult<T> = std::result::Result<T, String>;

pub struct Orchestrator {
    roster: RosterService,
    resolver: ClassResolver,
    worker: StudentGradeWorker,
    aggregator: ReportAggregator,
    journal: Arc<dyn RunJournal>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    config: PipelineConfig,
    /// Serializes the unfinished-run check with the insert of a manual run
    manual_gate: Mutex<()>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        roster: RosterService,
        resolver: ClassResolver,
        worker: StudentGradeWorker,
        aggregator: ReportAggregator,
        journal: Arc<dyn RunJournal>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        config: PipelineConfig,
    ) -> Self {
        let worker = worker.with_timeout(config.grader_timeout);
        Self {
            roster,
            resolver,
            worker,
            aggregator,
            journal,
            id_provider,
            time_provider,
            config,
            manual_gate: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Persist a new run in `NotStarted`
    pub async fn create_run(&self, trigger: RunTrigger) -> Result<Run> {
        let run = Run::new(
            self.id_provider.generate_id(),
            self.time_provider.now_millis(),
            trigger,
        );
        self.journal.insert_run(&run).await?;
        info!(run_id = %run.id, trigger = %trigger, "Run created");
        Ok(run)
    }

    /// Create a manually triggered run.
    ///
    /// Refuses with `AppError::Conflict` while another run is unfinished,
    /// unless `force` is set.
    pub async fn create_manual_run(&self, force: bool) -> Result<Run> {
        let _gate = self.manual_gate.lock().await;
        if !force {
            if let Some(active) = self.journal.find_unfinished().await?.first() {
                return Err(AppError::Conflict(format!(
                    "run {} is still {}",
                    active.id, active.state
                )));
            }
        }
        self.create_run(RunTrigger::Manual).await
    }

    /// Create and execute a run to the end
    pub async fn start(&self, trigger: RunTrigger) -> Result<Run> {
        let run = self.create_run(trigger).await?;
        self.execute(run).await
    }

    /// Resume an unfinished run by replaying its journal
    pub async fn resume(&self, run_id: &RunId) -> Result<Run> {
        let run = self
            .journal
            .find_run(run_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("run {} not found", run_id)))?;

        if run.state.is_terminal() {
            return Err(AppError::InvalidState(format!(
                "run {} already {}",
                run.id, run.state
            )));
        }

        info!(run_id = %run.id, state = %run.state, "Resuming run");
        self.execute(run).await
    }

    /// Drive `run` through every remaining stage.
    ///
    /// Returns the terminal run (`Completed` or `Failed`). An `Err` means the
    /// run was interrupted (the journal or run record could not be written) and
    /// is left non-terminal for recovery.
    pub async fn execute(&self, mut run: Run) -> Result<Run> {
        let run_id = run.id.clone();
        let mut summary = RunSummary::default();

        // Stage A: roster. Never isolated, never journaled on failure.
        let assignments: Vec<Assignment> = match self.journal.find_step(&run_id, ROSTER_STEP_KEY).await? {
            Some(record) => {
                debug!(run_id = %run_id, step = ROSTER_STEP_KEY, "Replaying journaled step");
                serde_json::from_value(record.outcome)?
            }
            None => match self.roster.load().await {
                Ok(assignments) => self.record(&run_id, ROSTER_STEP_KEY, &assignments).await?,
                Err(e) => return self.fail(run, summary, e.to_string()).await,
            },
        };
        summary.assignments = assignments.len();
        self.transition(&mut run, RunState::RosterLoaded).await?;

        // Stage B: class resolution, all assignments concurrently
        let branches: Vec<_> = assignments
            .iter()
            .map(|assignment| {
                self.step(&run_id, resolve_step_key(&assignment.name), async move {
                    self.resolver
                        .resolve(assignment)
                        .map_err(|e| e.to_string())
                })
            })
            .collect();
        let resolved: Vec<BranchResult<ClassJob>> =
            JoinBarrier::unbounded().try_join(branches).await?;

        let mut jobs = Vec::with_capacity(resolved.len());
        let mut class_failures = Vec::new();
        for (assignment, outcome) in assignments.iter().zip(resolved) {
            match outcome {
                Ok(job) => jobs.push(job),
                Err(reason) => {
                    error!(
                        run_id = %run_id,
                        assignment = %assignment.name,
                        teacher = %assignment.teacher_email,
                        error = %reason,
                        "Class resolution failed"
                    );
                    class_failures.push(format!("{}: {}", assignment.name, reason));
                }
            }
        }
        summary.classes_resolved = jobs.len();
        summary.classes_failed = class_failures.len();

        if self.config.isolation == IsolationMode::Legacy && !class_failures.is_empty() {
            let reason = format!("class resolution failed: {}", class_failures.join("; "));
            return self.fail(run, summary, reason).await;
        }
        self.transition(&mut run, RunState::ClassesResolved).await?;

        // Stage C: grading, bounded by the configured concurrency
        let units: Vec<GradingUnit> = jobs.iter().flat_map(|job| job.units()).collect();
        summary.units_dispatched = units.len();

        let branches: Vec<_> = units
            .into_iter()
            .map(|unit| self.step(&run_id, unit.step_key(), self.worker.grade(unit)))
            .collect();
        let outcomes: Vec<GradingOutcome> = JoinBarrier::bounded(self.config.grading_concurrency)
            .try_join(branches)
            .await?;

        for outcome in &outcomes {
            match outcome {
                GradingOutcome::Graded { .. } => summary.units_graded += 1,
                GradingOutcome::ArtifactOnly { .. } => summary.units_partial += 1,
                GradingOutcome::Failed { .. } => summary.units_failed += 1,
            }
        }
        info!(
            run_id = %run_id,
            dispatched = summary.units_dispatched,
            graded = summary.units_graded,
            partial = summary.units_partial,
            failed = summary.units_failed,
            "Grading stage complete"
        );
        self.transition(&mut run, RunState::StudentsGraded).await?;

        // Stage D: reports, all assignments concurrently
        let branches: Vec<_> = assignments
            .iter()
            .map(|assignment| {
                self.step(&run_id, report_step_key(&assignment.name), async move {
                    self.aggregator
                        .aggregate(&assignment.name)
                        .await
                        .map_err(|e| e.to_string())
                })
            })
            .collect();
        let reports: Vec<BranchResult<ReportOutcome>> =
            JoinBarrier::unbounded().try_join(branches).await?;

        let mut report_failures = Vec::new();
        for (assignment, outcome) in assignments.iter().zip(reports) {
            match outcome {
                Ok(_) => summary.reports_saved += 1,
                Err(reason) => {
                    error!(
                        run_id = %run_id,
                        assignment = %assignment.name,
                        error = %reason,
                        "Report aggregation failed"
                    );
                    report_failures.push(format!("{}: {}", assignment.name, reason));
                }
            }
        }
        summary.reports_failed = report_failures.len();

        if self.config.isolation == IsolationMode::Legacy && !report_failures.is_empty() {
            let reason = format!("report aggregation failed: {}", report_failures.join("; "));
            return self.fail(run, summary, reason).await;
        }
        self.transition(&mut run, RunState::ReportsSaved).await?;

        run.complete(summary, self.time_provider.now_millis())?;
        self.journal.update_run(&run).await?;
        info!(run_id = %run_id, summary = ?run.summary, "Run completed");
        self.prune_journal(&run_id).await;
        Ok(run)
    }

    /// Replay a journaled step, or await `branch` and journal its outcome.
    ///
    /// `branch` is lazy: on replay it is dropped without being polled.
    async fn step<T, Fut>(&self, run_id: &RunId, key: String, branch: Fut) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        Fut: Future<Output = T>,
    {
        if let Some(record) = self.journal.find_step(run_id, &key).await? {
            debug!(run_id = %run_id, step = %key, "Replaying journaled step");
            return Ok(serde_json::from_value(record.outcome)?);
        }

        let outcome = branch.await;
        self.record(run_id, &key, &outcome).await
    }

    /// Journal an outcome; the first record for a key wins
    async fn record<T>(&self, run_id: &RunId, key: &str, outcome: &T) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let record = StepRecord {
            run_id: run_id.clone(),
            step_key: key.to_string(),
            outcome: serde_json::to_value(outcome)?,
            recorded_at: self.time_provider.now_millis(),
        };
        let stored = self.journal.record_step(&record).await.map_err(|e| {
            warn!(run_id = %run_id, step = %key, error = %e, "Step could not be journaled");
            e
        })?;
        Ok(serde_json::from_value(stored.outcome)?)
    }

    async fn transition(&self, run: &mut Run, to: RunState) -> Result<()> {
        run.advance(to, self.time_provider.now_millis())?;
        self.journal.update_run(run).await?;
        debug!(run_id = %run.id, state = %run.state, "Run advanced");
        Ok(())
    }

    async fn fail(&self, mut run: Run, summary: RunSummary, reason: String) -> Result<Run> {
        error!(run_id = %run.id, state = %run.state, error = %reason, "Run failed");
        run.summary = Some(summary);
        run.fail(reason, self.time_provider.now_millis())?;
        self.journal.update_run(&run).await?;
        self.prune_journal(&run.id).await;
        Ok(run)
    }

    /// Drop the steps of finished runs. A failure here leaves the run
    /// terminal; recovery prunes again at the next startup.
    async fn prune_journal(&self, run_id: &RunId) {
        match self.journal.prune_finished_steps().await {
            Ok(deleted) => debug!(run_id = %run_id, deleted_steps = deleted, "Journal pruned"),
            Err(e) => warn!(run_id = %run_id, error = %e, "Journal prune failed"),
        }
    }
}
