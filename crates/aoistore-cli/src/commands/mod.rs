//! CLI command definitions and dispatch.

pub mod aoi;
pub mod export;
pub mod job;
pub mod lifecycle;
pub mod migrate;
pub mod node;
pub mod worker;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use aoistore_core::config::AppConfig;
use aoistore_core::error::AppError;
use aoistore_core::traits::{Clock, SystemClock};
use aoistore_database::repositories::JobRepository;
use aoistore_database::DatabasePool;
use aoistore_service::{ContentStore, RequestContext};
use aoistore_worker::JobQueue;

use crate::output::OutputFormat;

/// AOI Store: versioned storage for AOI geospatial datasets
#[derive(Debug, Parser)]
#[command(name = "aoistore", version, about, long_about = None)]
pub struct Cli {
    /// Configuration environment overlay (`config/<env>.toml`)
    #[arg(short, long, env = "AOISTORE_ENV", default_value = "development")]
    pub env: String,

    /// Use a self-contained store under this directory instead of the
    /// configuration files
    #[arg(long, global = true)]
    pub data_root: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", global = true)]
    pub format: OutputFormat,

    /// User recorded as the creator of new records and jobs
    #[arg(short, long, env = "AOISTORE_USER", default_value = "cli", global = true)]
    pub user: String,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Database migration management
    Migrate(migrate::MigrateArgs),
    /// AOI management
    Aoi(aoi::AoiArgs),
    /// Directory and file management
    Node(node::NodeArgs),
    /// Point-in-time export of a subtree
    Export(export::ExportArgs),
    /// Removal, deactivation and deletion
    Lifecycle(lifecycle::LifecycleArgs),
    /// Background job management
    Job(job::JobArgs),
    /// Background worker
    Worker(worker::WorkerArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        let config = self.load_config()?;
        match &self.command {
            Commands::Migrate(args) => migrate::execute(args, &config).await,
            Commands::Aoi(args) => aoi::execute(args, &Session::open(self, config).await?).await,
            Commands::Node(args) => node::execute(args, &Session::open(self, config).await?).await,
            Commands::Export(args) => export::execute(args, &Session::open(self, config).await?).await,
            Commands::Lifecycle(args) => {
                lifecycle::execute(args, &Session::open(self, config).await?).await
            }
            Commands::Job(args) => job::execute(args, &Session::open(self, config).await?).await,
            Commands::Worker(args) => worker::execute(args, &Session::open(self, config).await?).await,
        }
    }

    fn load_config(&self) -> Result<AppConfig, AppError> {
        match &self.data_root {
            Some(root) => Ok(AppConfig::for_data_root(root.clone())),
            None => AppConfig::load(&self.env),
        }
    }
}

/// Everything a command needs: the store, the job queue and the caller.
#[derive(Debug)]
pub struct Session {
    pub config: AppConfig,
    pub db: DatabasePool,
    pub store: Arc<ContentStore>,
    pub queue: Arc<JobQueue>,
    pub format: OutputFormat,
    pub user: String,
}

impl Session {
    /// Connects, applies pending migrations and builds the store.
    pub async fn open(cli: &Cli, config: AppConfig) -> Result<Self, AppError> {
        let db = connect(&config).await?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let store = Arc::new(ContentStore::open(&config, db.pool().clone(), clock.clone()).await?);
        let queue = Arc::new(JobQueue::new(
            Arc::new(JobRepository::new(db.pool().clone())),
            clock,
            config.worker.id.clone(),
            config.worker.max_attempts,
        ));
        Ok(Self {
            config,
            db,
            store,
            queue,
            format: cli.format,
            user: cli.user.clone(),
        })
    }

    /// A context that is cancelled when the user presses Ctrl+C, so long
    /// imports and exports stop at their next checkpoint.
    pub fn request_context(&self) -> RequestContext {
        let token = CancellationToken::new();
        let watcher = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling at the next checkpoint");
                watcher.cancel();
            }
        });
        RequestContext::new(self.user.clone()).with_cancellation(token)
    }
}

/// Helper: open the pool and run migrations.
pub async fn connect(config: &AppConfig) -> Result<DatabasePool, AppError> {
    tokio::fs::create_dir_all(config.storage.data_root_path())
        .await
        .map_err(|e| AppError::io("Failed to create data root", e))?;
    DatabasePool::connect_and_migrate(&config.database).await
}
