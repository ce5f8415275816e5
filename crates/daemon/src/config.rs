//! Daemon configuration, read from `GRADEFLOW_*` environment variables

use gradeflow_core::application::constants::{
    DEFAULT_GRADING_CONCURRENCY, DEFAULT_ROSTER_PAGE_SIZE, DEFAULT_RUN_INTERVAL_HOURS,
};
use gradeflow_core::application::{IsolationMode, PipelineConfig};
use gradeflow_core::error::{AppError, Result};
use gradeflow_core::port::DEFAULT_GRADER_TIMEOUT;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_DB_PATH: &str = "~/.gradeflow/gradeflow.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    pub db_path: String,
    pub rpc_port: u16,
    pub run_interval: Duration,
    pub run_on_start: bool,
    pub roster_page_size: usize,
    pub pipeline: PipelineConfig,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset keys take their defaults; set but
    /// invalid values are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup("GRADEFLOW_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let db_path = shellexpand::tilde(&db_path).into_owned();

        let rpc_port = parse(&lookup, "GRADEFLOW_RPC_PORT", gradeflow_api_rpc::server::DEFAULT_RPC_PORT)?;

        let interval_hours: u64 = parse(&lookup, "GRADEFLOW_RUN_INTERVAL_HOURS", DEFAULT_RUN_INTERVAL_HOURS)?;
        if interval_hours == 0 {
            return Err(AppError::Config(
                "GRADEFLOW_RUN_INTERVAL_HOURS must be at least 1".to_string(),
            ));
        }

        let run_on_start = parse(&lookup, "GRADEFLOW_RUN_ON_START", false)?;
        let timeout_secs: u64 = parse(
            &lookup,
            "GRADEFLOW_GRADER_TIMEOUT_SECS",
            DEFAULT_GRADER_TIMEOUT.as_secs(),
        )?;
        let grading_concurrency: usize =
            parse(&lookup, "GRADEFLOW_GRADING_CONCURRENCY", DEFAULT_GRADING_CONCURRENCY)?;
        let roster_page_size: usize =
            parse(&lookup, "GRADEFLOW_ROSTER_PAGE_SIZE", DEFAULT_ROSTER_PAGE_SIZE)?;
        let isolation: IsolationMode = match lookup("GRADEFLOW_ISOLATION") {
            Some(raw) => raw.parse()?,
            None => IsolationMode::default(),
        };

        for (key, value) in [
            ("GRADEFLOW_GRADER_TIMEOUT_SECS", timeout_secs as usize),
            ("GRADEFLOW_GRADING_CONCURRENCY", grading_concurrency),
            ("GRADEFLOW_ROSTER_PAGE_SIZE", roster_page_size),
        ] {
            if value == 0 {
                return Err(AppError::Config(format!("{} must be at least 1", key)));
            }
        }

        Ok(Self {
            db_path,
            rpc_port,
            run_interval: Duration::from_secs(interval_hours * 60 * 60),
            run_on_start,
            roster_page_size,
            pipeline: PipelineConfig {
                grading_concurrency,
                isolation,
                grader_timeout: Duration::from_secs(timeout_secs),
            },
        })
    }
}

fn parse<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{}={:?}: {}", key, raw, e))),
        None => Ok(default),
    }
}
