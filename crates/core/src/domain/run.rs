// Run Domain Model - one durable pipeline execution

use crate::domain::error::{DomainError, Result};
use serde::{Deserialize, Serialize};

/// Run ID (UUID v4)
pub type RunId = String;

/// Run State
///
/// Forward-only: `NotStarted → RosterLoaded → ClassesResolved → StudentsGraded
/// → ReportsSaved → Completed`, `Failed` from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    NotStarted,
    RosterLoaded,
    ClassesResolved,
    StudentsGraded,
    ReportsSaved,
    Completed,
    Failed,
}

impl RunState {
    fn rank(&self) -> u8 {
        match self {
            RunState::NotStarted => 0,
            RunState::RosterLoaded => 1,
            RunState::ClassesResolved => 2,
            RunState::StudentsGraded => 3,
            RunState::ReportsSaved => 4,
            RunState::Completed => 5,
            RunState::Failed => 6,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NOT_STARTED" => Some(RunState::NotStarted),
            "ROSTER_LOADED" => Some(RunState::RosterLoaded),
            "CLASSES_RESOLVED" => Some(RunState::ClassesResolved),
            "STUDENTS_GRADED" => Some(RunState::StudentsGraded),
            "REPORTS_SAVED" => Some(RunState::ReportsSaved),
            "COMPLETED" => Some(RunState::Completed),
            "FAILED" => Some(RunState::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::NotStarted => write!(f, "NOT_STARTED"),
            RunState::RosterLoaded => write!(f, "ROSTER_LOADED"),
            RunState::ClassesResolved => write!(f, "CLASSES_RESOLVED"),
            RunState::StudentsGraded => write!(f, "STUDENTS_GRADED"),
            RunState::ReportsSaved => write!(f, "REPORTS_SAVED"),
            RunState::Completed => write!(f, "COMPLETED"),
            RunState::Failed => write!(f, "FAILED"),
        }
    }
}

/// What started the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunTrigger {
    Scheduled,
    Manual,
}

impl RunTrigger {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SCHEDULED" => Some(RunTrigger::Scheduled),
            "MANUAL" => Some(RunTrigger::Manual),
            _ => None,
        }
    }
}

impl std::fmt::Display for RunTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunTrigger::Scheduled => write!(f, "SCHEDULED"),
            RunTrigger::Manual => write!(f, "MANUAL"),
        }
    }
}

/// Counters collected at the stage barriers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub assignments: usize,
    pub classes_resolved: usize,
    pub classes_failed: usize,
    pub units_dispatched: usize,
    pub units_graded: usize,
    /// Artifact persisted but parse or notification enqueue failed
    pub units_partial: usize,
    pub units_failed: usize,
    pub reports_saved: usize,
    pub reports_failed: usize,
}

/// Run Entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub trigger: RunTrigger,
    pub state: RunState,
    pub created_at: i64, // epoch ms
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
    pub error: Option<String>,
    pub summary: Option<RunSummary>,
}

impl Run {
    /// Create a new run
    ///
    /// # Arguments
    ///
    /// * `id` - Unique run ID (injected, not generated)
    /// * `created_at` - Creation timestamp in epoch ms (injected, not system time)
    /// * `trigger` - What started the run
    pub fn new(id: impl Into<String>, created_at: i64, trigger: RunTrigger) -> Self {
        Self {
            id: id.into(),
            trigger,
            state: RunState::NotStarted,
            created_at,
            started_at: None,
            finished_at: None,
            error: None,
            summary: None,
        }
    }

    /// Move forward to `to`.
    ///
    /// Re-advancing to an already reached state is a no-op (replay).
    pub fn advance(&mut self, to: RunState, now_millis: i64) -> Result<()> {
        if self.state.is_terminal() || to.is_terminal() {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }
        if self.started_at.is_none() {
            self.started_at = Some(now_millis);
        }
        if to.rank() > self.state.rank() {
            self.state = to;
        }
        Ok(())
    }

    /// Transition to Completed (only from ReportsSaved)
    pub fn complete(&mut self, summary: RunSummary, now_millis: i64) -> Result<()> {
        if self.state != RunState::ReportsSaved {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: RunState::Completed.to_string(),
            });
        }
        self.state = RunState::Completed;
        self.summary = Some(summary);
        self.finished_at = Some(now_millis);
        Ok(())
    }

    /// Mark as Failed with explicit timestamp
    pub fn fail(&mut self, reason: impl Into<String>, now_millis: i64) -> Result<()> {
        if self.state.is_terminal() {
            return Err(DomainError::InvalidStateTransition {
                from: self.state.to_string(),
                to: RunState::Failed.to_string(),
            });
        }
        self.state = RunState::Failed;
        self.error = Some(reason.into());
        self.finished_at = Some(now_millis);
        Ok(())
    }
}
