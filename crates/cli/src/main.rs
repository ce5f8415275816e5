//! Gradeflow CLI - trigger and inspect grading runs on a running daemon

use anyhow::{Context, Result};
use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tabled::{Table, Tabled};

const DEFAULT_RPC_URL: &str = "http://127.0.0.1:9627";

#[derive(Parser)]
#[command(name = "gradeflow")]
#[command(about = "Gradeflow grading pipeline CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// RPC server URL
    #[arg(long, env = "GRADEFLOW_RPC_URL", default_value = DEFAULT_RPC_URL)]
    rpc_url: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a grading run now
    Trigger {
        /// Start even if another run is unfinished
        #[arg(long)]
        force: bool,
    },

    /// Show one run
    Status {
        /// Run ID
        run_id: String,
    },

    /// List recent runs, newest first
    Runs {
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Serialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    method: String,
    params: serde_json::Value,
    id: u64,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[allow(dead_code)]
    jsonrpc: String,
    #[allow(dead_code)]
    id: u64,
    result: Option<serde_json::Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

#[derive(Deserialize, Tabled)]
struct TriggerResult {
    run_id: String,
    state: String,
    trigger: String,
}

#[derive(Deserialize)]
struct RunView {
    run_id: String,
    trigger: String,
    state: String,
    created_at: i64,
    finished_at: Option<i64>,
    error: Option<String>,
    summary: Option<serde_json::Value>,
}

#[derive(Tabled)]
struct RunRow {
    run_id: String,
    trigger: String,
    state: String,
    created: String,
    finished: String,
    graded: String,
}

impl From<&RunView> for RunRow {
    fn from(run: &RunView) -> Self {
        let graded = run
            .summary
            .as_ref()
            .map(|s| format!("{}/{}", s["units_graded"], s["units_dispatched"]))
            .unwrap_or_else(|| "-".to_string());
        Self {
            run_id: run.run_id.clone(),
            trigger: run.trigger.clone(),
            state: run.state.clone(),
            created: format_millis(run.created_at),
            finished: run.finished_at.map(format_millis).unwrap_or_else(|| "-".to_string()),
            graded,
        }
    }
}

fn format_millis(millis: i64) -> String {
    Local
        .timestamp_millis_opt(millis)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| millis.to_string())
}

fn colored_state(state: &str) -> colored::ColoredString {
    match state {
        "COMPLETED" => state.green(),
        "FAILED" => state.red(),
        _ => state.yellow(),
    }
}

async fn call_rpc(url: &str, method: &str, params: serde_json::Value) -> Result<serde_json::Value> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0".to_string(),
        method: method.to_string(),
        params,
        id: 1,
    };

    let client = reqwest::Client::new();
    let response: JsonRpcResponse = client
        .post(url)
        .json(&request)
        .send()
        .await
        .context("Failed to connect to daemon")?
        .json()
        .await
        .context("Failed to parse response")?;

    if let Some(error) = response.error {
        anyhow::bail!("RPC error ({}): {}", error.code, error.message);
    }

    response
        .result
        .ok_or_else(|| anyhow::anyhow!("No result in response"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Trigger { force } => {
            let result = call_rpc(&cli.rpc_url, "run.trigger.v1", json!({ "force": force })).await?;
            let trigger: TriggerResult = serde_json::from_value(result)?;

            println!("{}", "✓ Run started".green().bold());
            println!();
            println!("{}", Table::new(vec![trigger]));
        }

        Commands::Status { run_id } => {
            let result = call_rpc(&cli.rpc_url, "run.status.v1", json!({ "run_id": run_id })).await?;
            let run: RunView = serde_json::from_value(result["run"].clone())?;

            println!("{} {}", "Run".cyan().bold(), run.run_id);
            println!();
            println!("  {} {}", "State:".bold(), colored_state(&run.state));
            println!("  {} {}", "Trigger:".bold(), run.trigger);
            println!("  {} {}", "Created:".bold(), format_millis(run.created_at));
            if let Some(finished) = run.finished_at {
                println!("  {} {}", "Finished:".bold(), format_millis(finished));
            }
            println!("  {} {}", "Steps:".bold(), result["steps"]);
            if let Some(error) = &run.error {
                println!("  {} {}", "Error:".bold(), error.red());
            }

            if let Some(summary) = run.summary.as_ref().and_then(|s| s.as_object()) {
                println!();
                for (key, value) in summary {
                    println!("  {:<18} {}", format!("{}:", key), value);
                }
            }
        }

        Commands::Runs { limit } => {
            let result = call_rpc(&cli.rpc_url, "run.list.v1", json!({ "limit": limit })).await?;
            let runs: Vec<RunView> = serde_json::from_value(result["runs"].clone())?;

            if runs.is_empty() {
                println!("{}", "No runs yet".yellow());
            } else {
                let rows: Vec<RunRow> = runs.iter().map(RunRow::from).collect();
                println!("{}", Table::new(rows));
            }
        }
    }

    Ok(())
}
