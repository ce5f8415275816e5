//! RPC Request/Response Types
//!
//! JSON-RPC method parameters and results.

use gradeflow_core::domain::{Run, RunSummary};
use serde::{Deserialize, Serialize};

/// run.trigger.v1 - Start a manual run in the background
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TriggerRequest {
    /// Start even if another run is unfinished
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub run_id: String,
    pub state: String,
    pub trigger: String,
}

/// run.status.v1 - Inspect one run
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusRequest {
    pub run_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub run: RunView,
    /// Journaled steps so far; 0 once the run is finished and pruned
    pub steps: i64,
}

/// run.list.v1 - Recent runs, newest first
#[derive(Debug, Serialize, Deserialize)]
pub struct ListRequest {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    gradeflow_core::application::constants::DEFAULT_RECENT_RUNS_LIMIT
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub runs: Vec<RunView>,
}

/// Wire form of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunView {
    pub run_id: String,
    pub trigger: String,
    pub state: String,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub finished_at: Option<i64>,
    pub error: Option<String>,
    pub summary: Option<RunSummary>,
}

impl From<Run> for RunView {
    fn from(run: Run) -> Self {
        Self {
            run_id: run.id,
            trigger: run.trigger.to_string(),
            state: run.state.to_string(),
            created_at: run.created_at,
            started_at: run.started_at,
            finished_at: run.finished_at,
            error: run.error,
            summary: run.summary,
        }
    }
}
