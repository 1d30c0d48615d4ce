use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod background_jobs;
mod deadline_alerts;
mod directory;
mod notifications;
mod preferences;
mod server;
mod sqlite_persistence;
mod store;

use background_jobs::{DailyTime, JobScheduler};
use deadline_alerts::{
    CompanyDeadlineAlertsJob, FavoriteDeadlineAlertsJob, NotificationRetentionJob,
};
use directory::SqliteJobDirectory;
use notifications::NotificationEngine;
use server::websocket::ConnectionManager;
use server::{run_server, RequestsLoggingLevel};
use store::SqliteStore;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to the SQLite database file for notification storage.
    #[clap(value_parser = parse_path)]
    pub notification_db: PathBuf,

    /// Path to the platform's SQLite database (jobs, favorites, accounts).
    /// Read-only from this server's point of view.
    #[clap(value_parser = parse_path)]
    pub platform_db: PathBuf,

    /// Secret used to verify session tokens issued by the identity service.
    #[clap(long)]
    pub jwt_secret: String,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 4000)]
    pub port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Daily wall-clock time (platform timezone) of the favorite-job
    /// deadline scan.
    #[clap(long, default_value = "09:00")]
    pub favorite_alerts_at: DailyTime,

    /// Daily wall-clock time of the company deadline scan.
    #[clap(long, default_value = "09:30")]
    pub company_alerts_at: DailyTime,

    /// Daily wall-clock time of the retention housekeeping run.
    #[clap(long, default_value = "03:10")]
    pub housekeeping_at: DailyTime,

    /// Number of days to retain read notifications before pruning.
    /// Set to 0 to disable pruning.
    #[clap(long, default_value_t = 90)]
    pub notification_retention_days: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .unwrap();

    info!(
        "Opening notification database at {:?}...",
        cli_args.notification_db
    );
    let store = Arc::new(SqliteStore::new(&cli_args.notification_db)?);

    info!("Opening platform database at {:?}...", cli_args.platform_db);
    let job_directory = Arc::new(SqliteJobDirectory::new(&cli_args.platform_db)?);

    let connection_manager = Arc::new(ConnectionManager::new());
    let engine = Arc::new(NotificationEngine::new(
        store.clone(),
        connection_manager.clone(),
    ));

    let shutdown_token = CancellationToken::new();
    let mut scheduler = JobScheduler::new(shutdown_token.clone());
    scheduler.register_job(Arc::new(FavoriteDeadlineAlertsJob::new(
        engine.clone(),
        job_directory.clone(),
        cli_args.favorite_alerts_at,
    )));
    scheduler.register_job(Arc::new(CompanyDeadlineAlertsJob::new(
        engine.clone(),
        job_directory.clone(),
        cli_args.company_alerts_at,
    )));
    if cli_args.notification_retention_days > 0 {
        scheduler.register_job(Arc::new(NotificationRetentionJob::new(
            store.clone(),
            cli_args.notification_retention_days,
            cli_args.housekeeping_at,
        )));
    }
    let scheduler_handle = tokio::spawn(scheduler.run());

    // Stop the scheduler loop when the process is asked to terminate
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            signal_token.cancel();
        }
    });

    info!("Ready to serve at port {}!", cli_args.port);
    let result = run_server(
        store,
        engine,
        job_directory,
        connection_manager,
        cli_args.logging_level,
        cli_args.port,
        cli_args.jwt_secret,
    )
    .await;

    shutdown_token.cancel();
    let _ = scheduler_handle.await;
    result
}
