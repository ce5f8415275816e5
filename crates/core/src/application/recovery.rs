// Crash recovery: resume runs left unfinished by a previous daemon process
use crate::application::orchestrator::Orchestrator;
use crate::domain::RunState;
use crate::port::RunJournal;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Counts reported by one recovery pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub found: usize,
    pub completed: usize,
    pub failed: usize,
    /// Interrupted again; left for the next pass
    pub interrupted: usize,
}

/// Crash recovery service
///
/// On daemon startup, every run that never reached a terminal state is
/// replayed from its journal and driven to completion.
pub struct RecoveryService {
    orchestrator: Arc<Orchestrator>,
    journal: Arc<dyn RunJournal>,
}

impl RecoveryService {
    pub fn new(orchestrator: Arc<Orchestrator>, journal: Arc<dyn RunJournal>) -> Self {
        Self {
            orchestrator,
            journal,
        }
    }

    /// Resume unfinished runs, oldest first.
    ///
    /// A run that is interrupted again is logged and skipped; it does not stop
    /// the remaining runs from being recovered.
    pub async fn recover_unfinished_runs(&self) -> crate::error::Result<RecoveryReport> {
        // Steps left behind by a run that finished just before a crash
        match self.journal.prune_finished_steps().await {
            Ok(0) => {}
            Ok(deleted) => info!(deleted_steps = deleted, "Pruned steps of finished runs"),
            Err(e) => warn!(error = %e, "Journal prune failed"),
        }

        let unfinished = self.journal.find_unfinished().await?;
        let mut report = RecoveryReport {
            found: unfinished.len(),
            ..Default::default()
        };

        if unfinished.is_empty() {
            info!("No unfinished runs to recover");
            return Ok(report);
        }
        info!(count = unfinished.len(), "Recovering unfinished runs");

        for run in unfinished {
            let run_id = run.id.clone();
            info!(run_id = %run_id, state = %run.state, trigger = %run.trigger, "Recovering run");

            match self.orchestrator.execute(run).await {
                Ok(run) if run.state == RunState::Completed => report.completed += 1,
                Ok(run) => {
                    warn!(run_id = %run_id, error = ?run.error, "Recovered run failed");
                    report.failed += 1;
                }
                Err(e) => {
                    error!(run_id = %run_id, error = %e, "Run interrupted again during recovery");
                    report.interrupted += 1;
                }
            }
        }

        info!(
            completed = report.completed,
            failed = report.failed,
            interrupted = report.interrupted,
            "Run recovery complete"
        );
        Ok(report)
    }
}
