#![forbid(unsafe_code)]

//! Server binary for the `recordkeeper` civil-records service.
//!
//! Bootstraps configuration, establishes the database pool, ensures the
//! schema, and serves the record API until a shutdown signal arrives.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use recordkeeper::api::{self, AppState};
use recordkeeper::config::GlobalConfig;
use recordkeeper::persistence::executor::{Executor, RetryPolicy};
use recordkeeper::persistence::person_repo::PersonRepo;
use recordkeeper::persistence::{db, schema};
use recordkeeper::upload::UploadClient;
use recordkeeper::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "recordkeeper", about = "Civil-records service", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "recordkeeper.toml")]
    config: PathBuf,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Drop and recreate all record tables before serving. Destroys every
    /// stored record; never done implicitly.
    #[arg(long)]
    reset_schema: bool,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("recordkeeper server bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load_from_path(&args.config)?;
    config.load_credentials().await?;
    let config = Arc::new(config);
    info!("configuration loaded");

    // ── Initialize database ─────────────────────────────
    let pool = db::connect(&config.database).await?;
    let executor = Executor::new(pool.clone(), RetryPolicy::default());

    // Schema failure is fatal; there is nothing to serve without tables.
    if args.reset_schema {
        schema::reset_schema(&executor).await?;
    } else {
        schema::ensure_schema(&executor).await?;
    }

    // ── Build shared application state ──────────────────
    let state = AppState {
        config: Arc::clone(&config),
        repo: PersonRepo::new(executor),
        uploader: UploadClient::new(config.upload.clone()),
    };

    // ── Serve until shutdown ────────────────────────────
    let ct = CancellationToken::new();
    let signal_ct = ct.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        signal_ct.cancel();
    });

    api::serve(state, ct).await?;

    // ── Dispose resources ───────────────────────────────
    pool.close().await;
    info!("recordkeeper shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
