//! Database Snapshot Scheduler
//!
//! Periodically copies the live SQLite database and uploads the copy to S3.
//! `schedule` (the default) runs the timer loop until interrupted; `snapshot`
//! performs a single upload and exits.

// zkvrm-snapshot/src/main.rs
mod backup;
mod config;
mod errors;
mod scheduler;
mod utils;

use anyhow::{Context, Result};
use config::{EnvVars, SnapshotConfig};
use scheduler::SnapshotScheduler;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_LEVEL: &str = "info";

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    init_tracing();

    match run_app().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let directive = env::var("LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string());
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| {
        eprintln!("Invalid LOG_LEVEL '{}', falling back to '{}'", directive, DEFAULT_LOG_LEVEL);
        EnvFilter::new(DEFAULT_LOG_LEVEL)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn run_app() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let choice = args
        .get(1)
        .map(|arg| arg.trim().to_string())
        .unwrap_or_else(|| "schedule".to_string());

    let config = SnapshotConfig::from_env(&EnvVars::from_process());
    let scheduler = Arc::new(SnapshotScheduler::from_config(config).await);

    match choice.as_str() {
        "schedule" => run_schedule(scheduler).await,
        "snapshot" | "now" => {
            let result = scheduler
                .upload_now()
                .await
                .context("Manual snapshot failed")?;
            println!(
                "✅ Manual snapshot completed: {} ({} bytes in {}ms)",
                result.object_key, result.bytes, result.duration_ms
            );
            Ok(())
        }
        other => {
            anyhow::bail!(
                "Invalid command '{}'. Use 'schedule' (default) or 'snapshot'.",
                other
            )
        }
    }
}

async fn run_schedule(scheduler: Arc<SnapshotScheduler>) -> Result<()> {
    let shutdown = CancellationToken::new();
    let Some(handle) = scheduler.start(shutdown.clone()) else {
        return Ok(());
    };

    wait_for_shutdown_signal().await;
    info!("Shutdown signal received");
    shutdown.cancel();

    handle.await.context("Snapshot scheduler task failed")?;
    Ok(())
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
                return;
            }
            Err(e) => warn!(error = %e, "SIGTERM listener unavailable, waiting for Ctrl-C only"),
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Ctrl-C listener failed, running until killed");
        std::future::pending::<()>().await;
    }
}
