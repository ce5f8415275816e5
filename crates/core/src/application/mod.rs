// Application Layer - Use Cases and Pipeline Orchestration

pub mod barrier;
pub mod class_resolver;
pub mod constants;
pub mod grade_worker;
pub mod orchestrator;
pub mod recovery;
pub mod report;
pub mod roster;
pub mod shutdown;
pub mod trigger;

// Re-exports
pub use barrier::JoinBarrier;
pub use class_resolver::ClassResolver;
pub use grade_worker::{GradingOutcome, StudentGradeWorker, StudentGradingError};
pub use orchestrator::{IsolationMode, Orchestrator, PipelineConfig};
pub use recovery::{RecoveryReport, RecoveryService};
pub use report::{ReportAggregator, ReportOutcome};
pub use roster::RosterService;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use trigger::RunScheduler;
