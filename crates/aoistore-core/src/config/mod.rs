//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section.

pub mod app;
pub mod database;
pub mod logging;
pub mod storage;
pub mod worker;

use serde::{Deserialize, Serialize};

pub use self::app::AppSection;
pub use self::database::DatabaseConfig;
pub use self::logging::LoggingConfig;
pub use self::storage::StorageConfig;
pub use self::worker::WorkerConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// This struct is the top-level deserialization target for the merged
/// TOML configuration files (default.toml + environment overlay).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application identity and public addressing.
    #[serde(default)]
    pub app: AppSection,
    /// Database connection settings.
    pub database: DatabaseConfig,
    /// Content storage layout.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Background worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges the default configuration with an environment-specific overlay
    /// and environment variables prefixed with `AOISTORE__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("AOISTORE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Build a configuration rooted at `data_root` with a SQLite database
    /// file inside it. Used by tests and the CLI's `--data-root` flag.
    pub fn for_data_root(data_root: impl Into<String>) -> Self {
        let data_root = data_root.into();
        let database_url = format!("sqlite://{data_root}/aoistore.db?mode=rwc");
        Self {
            app: AppSection::default(),
            database: DatabaseConfig::with_url(database_url),
            storage: StorageConfig {
                data_root,
                ..StorageConfig::default()
            },
            worker: WorkerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
