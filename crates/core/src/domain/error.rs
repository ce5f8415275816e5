// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid run state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    /// Embedded roster of one assignment could not be decoded
    #[error("Roster decode error for {assignment}: {reason}")]
    RosterDecode { assignment: String, reason: String },
}

pub type Result<T> = std::result::Result<T, DomainError>;
