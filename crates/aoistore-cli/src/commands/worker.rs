//! Worker CLI commands.

use std::sync::Arc;

use clap::{Args, Subcommand};
use tokio::sync::watch;
use tracing::info;

use aoistore_core::error::AppError;
use aoistore_entity::job::JobStatus;
use aoistore_worker::{default_executor, WorkerRunner};

use super::Session;
use crate::output;

/// Arguments for worker commands
#[derive(Debug, Args)]
pub struct WorkerArgs {
    /// Worker subcommand
    #[command(subcommand)]
    pub command: WorkerCommand,
}

/// Worker subcommands
#[derive(Debug, Subcommand)]
pub enum WorkerCommand {
    /// Process jobs until Ctrl+C
    Run,
    /// Run pending jobs one by one, then exit
    Drain,
    /// Show queue status
    Status,
}

/// Execute worker commands
pub async fn execute(args: &WorkerArgs, session: &Session) -> Result<(), AppError> {
    let runner = WorkerRunner::new(
        session.queue.clone(),
        Arc::new(default_executor(session.store.clone())),
        session.config.worker.clone(),
    );

    match &args.command {
        WorkerCommand::Run => {
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Interrupted, stopping worker");
                    let _ = shutdown_tx.send(true);
                }
            });
            runner.run(shutdown_rx).await;
        }
        WorkerCommand::Drain => {
            session.queue.recover().await?;
            let mut processed = 0usize;
            while runner.process_next().await?.is_some() {
                processed += 1;
            }
            output::print_success(&format!("Processed {processed} jobs"));
        }
        WorkerCommand::Status => {
            println!("Worker Queue Status:");
            for status in [
                JobStatus::Pending,
                JobStatus::Running,
                JobStatus::Succeeded,
                JobStatus::Failed,
                JobStatus::Aborted,
            ] {
                let count = session.queue.count(status).await?;
                output::print_kv(status.as_str(), &count.to_string());
            }
            output::print_kv("Worker id", &session.config.worker.id);
            output::print_kv("Concurrency", &session.config.worker.concurrency.to_string());
        }
    }

    Ok(())
}
