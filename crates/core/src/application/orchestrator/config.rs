// Pipeline configuration

use crate::application::constants::DEFAULT_GRADING_CONCURRENCY;
use crate::error::AppError;
use crate::port::DEFAULT_GRADER_TIMEOUT;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Which failures may fail a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IsolationMode {
    /// Only student failures are contained; any class or report failure fails
    /// the run once its stage barrier has resolved
    Legacy,
    /// Class and report failures are contained per assignment and counted
    #[default]
    PerBranch,
}

impl FromStr for IsolationMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(IsolationMode::Legacy),
            "per-branch" | "per_branch" => Ok(IsolationMode::PerBranch),
            other => Err(AppError::Config(format!(
                "unknown isolation mode '{}' (expected legacy or per-branch)",
                other
            ))),
        }
    }
}

impl fmt::Display for IsolationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IsolationMode::Legacy => write!(f, "legacy"),
            IsolationMode::PerBranch => write!(f, "per-branch"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Maximum grading units in flight during Stage C
    pub grading_concurrency: usize,
    pub isolation: IsolationMode,
    pub grader_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            grading_concurrency: DEFAULT_GRADING_CONCURRENCY,
            isolation: IsolationMode::default(),
            grader_timeout: DEFAULT_GRADER_TIMEOUT,
        }
    }
}
