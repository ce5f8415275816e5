//! Gradeflow Engine - Main Entry Point
//! Scheduled grading runs + crash recovery + JSON-RPC trigger

mod config;
mod telemetry;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::DaemonConfig;
use gradeflow_api_rpc::{RpcServer, RpcServerConfig};
use gradeflow_core::application::{
    shutdown_channel, ClassResolver, Orchestrator, RecoveryService, ReportAggregator,
    RosterService, RunScheduler, StudentGradeWorker,
};
use gradeflow_core::port::id_provider::UuidProvider;
use gradeflow_core::port::time_provider::SystemTimeProvider;
use gradeflow_core::port::{
    ArtifactStore, GraderClient, NotificationQueue, ReportStore, ResultParser, RosterStore,
    RunJournal, TimeProvider,
};
use gradeflow_infra_grader::{NUnitResultParser, ReqwestGraderClient};
use gradeflow_infra_sqlite::{
    create_pool, run_migrations, SqliteArtifactStore, SqliteNotificationQueue, SqliteReportStore,
    SqliteRosterStore, SqliteRunJournal,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

type Base = tracing_subscriber::layer::Layered<EnvFilter, tracing_subscriber::Registry>;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize logging
    let log_format =
        std::env::var("GRADEFLOW_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("gradeflow=info"))
        .context("Failed to create env filter")?;

    let (otel_layer, otel_error) = match telemetry::layer::<Base>() {
        Ok(layer) => (layer, None),
        Err(e) => (None, Some(e)),
    };
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(otel_layer);

    match log_format.as_str() {
        "json" => registry.with(fmt::layer().json()).init(),
        _ => registry.with(fmt::layer().pretty()).init(),
    }

    info!("Gradeflow Engine v{} starting...", VERSION);
    if let Some(e) = otel_error {
        warn!(error = %e, "OpenTelemetry disabled");
    }

    // 2. Load configuration
    let config = DaemonConfig::from_env().context("Invalid configuration")?;
    info!(
        db_path = %config.db_path,
        rpc_port = config.rpc_port,
        interval_secs = config.run_interval.as_secs(),
        isolation = %config.pipeline.isolation,
        concurrency = config.pipeline.grading_concurrency,
        "Configuration loaded"
    );

    // 3. Initialize database
    if let Some(dir) = Path::new(&config.db_path).parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let pool = create_pool(&config.db_path)
        .await
        .context("DB pool creation failed")?;
    run_migrations(&pool).await.context("Migration failed")?;

    // 4. Setup dependencies (DI wiring)
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let roster: Arc<dyn RosterStore> =
        Arc::new(SqliteRosterStore::new(pool.clone(), config.roster_page_size));
    let artifacts: Arc<dyn ArtifactStore> = Arc::new(SqliteArtifactStore::new(pool.clone()));
    let notifications: Arc<dyn NotificationQueue> = Arc::new(SqliteNotificationQueue::new(
        pool.clone(),
        time_provider.clone(),
    ));
    let reports: Arc<dyn ReportStore> = Arc::new(SqliteReportStore::new(pool.clone()));
    let journal: Arc<dyn RunJournal> = Arc::new(SqliteRunJournal::new(pool.clone()));
    let grader: Arc<dyn GraderClient> = Arc::new(
        ReqwestGraderClient::new(config.pipeline.grader_timeout)
            .context("Grader client creation failed")?,
    );
    let parser: Arc<dyn ResultParser> = Arc::new(NUnitResultParser::new());

    let worker = StudentGradeWorker::new(
        grader,
        artifacts.clone(),
        notifications,
        parser.clone(),
        time_provider.clone(),
    );

    let orchestrator = Arc::new(Orchestrator::new(
        RosterService::new(roster),
        ClassResolver::new(),
        worker,
        ReportAggregator::new(artifacts, reports, parser, time_provider.clone()),
        journal.clone(),
        Arc::new(UuidProvider),
        time_provider,
        config.pipeline.clone(),
    ));

    // 5. Start JSON-RPC server
    let rpc_server = RpcServer::new(
        RpcServerConfig {
            port: config.rpc_port,
            ..Default::default()
        },
        orchestrator.clone(),
        journal.clone(),
    );
    let (rpc_handle, rpc_addr) = rpc_server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;
    info!(addr = %rpc_addr, "JSON-RPC server listening");

    // 6. Crash recovery, then the scheduler. Both run in the background so
    // that Ctrl+C stays responsive during a long resumed run.
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let recovery = RecoveryService::new(orchestrator.clone(), journal);
    let scheduler = RunScheduler::new(orchestrator, config.run_interval, config.run_on_start);

    let pipeline_handle = tokio::spawn(async move {
        info!("Running crash recovery...");
        match recovery.recover_unfinished_runs().await {
            Ok(report) => info!(
                found = report.found,
                completed = report.completed,
                failed = report.failed,
                interrupted = report.interrupted,
                "Crash recovery completed"
            ),
            Err(e) => error!(error = %e, "Crash recovery failed"),
        }
        scheduler.run(shutdown_rx).await;
    });

    info!("System ready. Press Ctrl+C to shutdown");

    // 7. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    // 8. Graceful shutdown
    shutdown_tx.shutdown();
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    if tokio::time::timeout(std::time::Duration::from_secs(5), pipeline_handle)
        .await
        .is_err()
    {
        warn!("Pipeline still busy at shutdown; unfinished run will be recovered on next start");
    }
    pool.close().await;

    info!("Shutdown complete.");
    Ok(())
}
