// Domain Layer - Pure business logic and entities

pub mod artifact;
pub mod error;
pub mod notification;
pub mod report;
pub mod roster;
pub mod run;

// Re-exports
pub use artifact::{artifact_path, sanitize_email, Artifact, ArtifactRef, XML_CONTENT_TYPE};
pub use error::DomainError;
pub use notification::Notification;
pub use report::{MarkReport, MarkTable, ReportKind, JSON_CONTENT_TYPE};
pub use roster::{Assignment, AssignmentName, ClassJob, GradingUnit, Student};
pub use run::{Run, RunId, RunState, RunSummary, RunTrigger};
