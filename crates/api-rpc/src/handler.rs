//! RPC Handler
//!
//! Run trigger and inspection business logic.

use crate::error::to_rpc_error;
use crate::types::*;
use gradeflow_core::application::Orchestrator;
use gradeflow_core::error::AppError;
use gradeflow_core::port::RunJournal;
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;
use tracing::{error, info};

/// RPC Handler
pub struct RpcHandler {
    orchestrator: Arc<Orchestrator>,
    journal: Arc<dyn RunJournal>,
}

impl RpcHandler {
    pub fn new(orchestrator: Arc<Orchestrator>, journal: Arc<dyn RunJournal>) -> Self {
        Self {
            orchestrator,
            journal,
        }
    }

    /// run.trigger.v1 - Create a manual run and execute it in the background
    pub async fn trigger(&self, req: TriggerRequest) -> Result<TriggerResponse, ErrorObjectOwned> {
        let run = self
            .orchestrator
            .create_manual_run(req.force)
            .await
            .map_err(to_rpc_error)?;

        let response = TriggerResponse {
            run_id: run.id.clone(),
            state: run.state.to_string(),
            trigger: run.trigger.to_string(),
        };

        let orchestrator = self.orchestrator.clone();
        tokio::spawn(async move {
            let run_id = run.id.clone();
            match orchestrator.execute(run).await {
                Ok(finished) => {
                    info!(run_id = %run_id, state = %finished.state, "Manual run finished")
                }
                Err(e) => error!(run_id = %run_id, error = %e, "Manual run interrupted"),
            }
        });

        info!(run_id = %response.run_id, force = req.force, "Manual run triggered");
        Ok(response)
    }

    /// run.status.v1
    pub async fn status(&self, req: StatusRequest) -> Result<StatusResponse, ErrorObjectOwned> {
        let run = self
            .journal
            .find_run(&req.run_id)
            .await
            .map_err(to_rpc_error)?
            .ok_or_else(|| {
                to_rpc_error(AppError::NotFound(format!("run {} not found", req.run_id)))
            })?;

        let steps = self
            .journal
            .count_steps(&run.id)
            .await
            .map_err(to_rpc_error)?;

        Ok(StatusResponse {
            run: run.into(),
            steps,
        })
    }

    /// run.list.v1
    pub async fn list(&self, req: ListRequest) -> Result<ListResponse, ErrorObjectOwned> {
        if req.limit == 0 {
            return Err(to_rpc_error(AppError::Validation(
                "limit must be at least 1".to_string(),
            )));
        }

        let runs = self
            .journal
            .recent_runs(req.limit)
            .await
            .map_err(to_rpc_error)?;

        Ok(ListResponse {
            runs: runs.into_iter().map(RunView::from).collect(),
        })
    }
}
