// Port Layer - Interfaces for external collaborators

pub mod artifact_store;
pub mod grader_client;
pub mod id_provider; // For deterministic testing
pub mod notification_queue;
pub mod report_store;
pub mod result_parser;
pub mod roster_store;
pub mod run_journal;
pub mod time_provider;

// Re-exports
pub use artifact_store::ArtifactStore;
pub use grader_client::{GraderClient, GraderError, GraderRequest, DEFAULT_GRADER_TIMEOUT};
pub use id_provider::IdProvider;
pub use notification_queue::NotificationQueue;
pub use report_store::{ReportStore, StoredReport};
pub use result_parser::{ParseError, ResultParser};
pub use roster_store::{AssignmentRecord, ContinuationToken, CredentialRecord, Page, RosterStore};
pub use run_journal::{RunJournal, StepRecord};
pub use time_provider::TimeProvider;
