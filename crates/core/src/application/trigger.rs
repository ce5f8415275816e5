// Run Scheduler - fixed-cadence trigger for scheduled runs

use crate::application::constants::LATE_TICK_THRESHOLD;
use crate::application::orchestrator::Orchestrator;
use crate::application::shutdown::ShutdownToken;
use crate::domain::RunTrigger;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

/// Run scheduler
///
/// Starts one scheduled run per interval. Runs execute inline, so a run that
/// outlasts the interval delays the next tick instead of overlapping it.
pub struct RunScheduler {
    orchestrator: Arc<Orchestrator>,
    interval: Duration,
    run_on_start: bool,
}

impl RunScheduler {
    /// # Arguments
    /// * `orchestrator` - Pipeline to run on every tick
    /// * `interval` - Cadence between runs
    /// * `run_on_start` - Fire immediately instead of one interval from now
    pub fn new(orchestrator: Arc<Orchestrator>, interval: Duration, run_on_start: bool) -> Self {
        Self {
            orchestrator,
            interval,
            run_on_start,
        }
    }

    /// Scheduler loop (background task). Returns once `shutdown` fires.
    ///
    /// A run in flight at shutdown is dropped where it stands; it stays
    /// unfinished in the journal and is resumed by recovery on next start.
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            run_on_start = self.run_on_start,
            "Run scheduler started"
        );

        let mut tick = interval(self.interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        if !self.run_on_start {
            // First tick of a tokio interval completes immediately
            tick.tick().await;
        }

        loop {
            let scheduled = tokio::select! {
                at = tick.tick() => at,
                _ = shutdown.wait() => break,
            };

            let lag = Instant::now().saturating_duration_since(scheduled);
            if lag > LATE_TICK_THRESHOLD {
                warn!(lag_secs = lag.as_secs(), "Scheduled run is running late");
            }

            tokio::select! {
                result = self.orchestrator.start(RunTrigger::Scheduled) => match result {
                    Ok(run) => info!(run_id = %run.id, state = %run.state, "Scheduled run finished"),
                    Err(e) => error!(error = %e, "Scheduled run interrupted"),
                },
                _ = shutdown.wait() => {
                    warn!("Shutdown during scheduled run; it will be recovered on next start");
                    break;
                }
            }
        }

        info!("Run scheduler stopped");
    }
}
