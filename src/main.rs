//! AOI Store server: runs the background worker over the content store.
//!
//! Imports, updates and exports are enqueued by the `aoistore` CLI (or any
//! other process sharing the database) and executed here until Ctrl+C or
//! SIGTERM.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use aoistore_core::config::AppConfig;
use aoistore_core::error::AppError;
use aoistore_core::traits::{Clock, SystemClock};
use aoistore_database::repositories::JobRepository;
use aoistore_database::DatabasePool;
use aoistore_service::ContentStore;
use aoistore_worker::{default_executor, JobQueue, WorkerRunner};

#[tokio::main]
async fn main() {
    let env = std::env::var("AOISTORE_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    info!(env = %env, "Configuration loaded");

    if let Err(e) = run(config).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

async fn run(config: AppConfig) -> Result<(), AppError> {
    info!(version = env!("CARGO_PKG_VERSION"), "Starting AOI Store");

    // ── Step 1: Data directories ─────────────────────────────────
    create_data_directories(&config).await?;

    // ── Step 2: Database connection + migrations ─────────────────
    info!("Connecting to database");
    let db = DatabasePool::connect_and_migrate(&config.database).await?;

    // ── Step 3: Content store ────────────────────────────────────
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(ContentStore::open(&config, db.pool().clone(), clock.clone()).await?);

    // ── Step 4: Worker ───────────────────────────────────────────
    if !config.worker.enabled {
        warn!("Background worker disabled; nothing to run");
        db.close().await;
        return Ok(());
    }

    let queue = Arc::new(JobQueue::new(
        Arc::new(JobRepository::new(db.pool().clone())),
        clock,
        config.worker.id.clone(),
        config.worker.max_attempts,
    ));
    let executor = Arc::new(default_executor(store));
    info!(job_types = ?executor.registered_types(), "Job handlers registered");
    let runner = WorkerRunner::new(queue, executor, config.worker.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = tokio::spawn(async move { runner.run(shutdown_rx).await });

    // ── Step 5: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    info!("Shutdown signal received, stopping worker");
    let _ = shutdown_tx.send(true);
    if let Err(e) = worker.await {
        error!(error = %e, "Worker task panicked");
    }

    db.close().await;
    info!("AOI Store stopped");
    Ok(())
}

/// Create the data, export and scratch directories.
async fn create_data_directories(config: &AppConfig) -> Result<(), AppError> {
    let dirs = [
        config.storage.data_root_path(),
        config.storage.data_root_path().join(&config.storage.aoi_dir),
        config.storage.export_root_path(),
        config.storage.temp_root_path(),
    ];

    for dir in &dirs {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| AppError::io(format!("Failed to create dir '{}'", dir.display()), e))?;
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
