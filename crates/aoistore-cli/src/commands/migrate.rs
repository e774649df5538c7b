//! Database migration management commands.

use clap::{Args, Subcommand};

use aoistore_core::config::AppConfig;
use aoistore_core::error::AppError;

use crate::output;

/// Arguments for the migrate command
#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Migration subcommand
    #[command(subcommand)]
    pub command: MigrateCommand,
}

/// Migration subcommands
#[derive(Debug, Subcommand)]
pub enum MigrateCommand {
    /// Run all pending migrations
    Run,
    /// Check that the database is reachable
    Status,
}

/// Execute migration commands
pub async fn execute(args: &MigrateArgs, config: &AppConfig) -> Result<(), AppError> {
    match &args.command {
        MigrateCommand::Run => {
            println!("Running database migrations...");
            let db = super::connect(config).await?;
            db.close().await;
            output::print_success("All migrations applied successfully.");
        }
        MigrateCommand::Status => {
            let db = super::connect(config).await?;
            let healthy = db.health_check().await?;
            output::print_kv("Database", &config.database.url);
            output::print_kv("Reachable", &healthy.to_string());
            output::print_kv("Data root", &config.storage.data_root);
            db.close().await;
        }
    }

    Ok(())
}
