// Pipeline constants (ADR: No magic values)
use std::time::Duration;

/// Default cadence between scheduled runs (12 hours)
pub const DEFAULT_RUN_INTERVAL_HOURS: u64 = 12;

/// Stage C runs students one at a time unless configured otherwise
pub const DEFAULT_GRADING_CONCURRENCY: usize = 1;

/// A scheduler tick observed later than this is logged as running late
pub const LATE_TICK_THRESHOLD: Duration = Duration::from_secs(60);

/// Rows per roster page
pub const DEFAULT_ROSTER_PAGE_SIZE: usize = 100;

/// Default page size for `run.list.v1`
pub const DEFAULT_RECENT_RUNS_LIMIT: usize = 20;

/// Local timestamp shown in notification subjects
pub const NOTIFICATION_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Journal key of the roster step
pub const ROSTER_STEP_KEY: &str = "roster";

pub fn resolve_step_key(assignment: &str) -> String {
    format!("resolve/{}", assignment)
}

pub fn report_step_key(assignment: &str) -> String {
    format!("report/{}", assignment)
}
