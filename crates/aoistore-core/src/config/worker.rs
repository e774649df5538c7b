//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Background job worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Whether the worker is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Identifier recorded on claimed jobs. Keep it stable across restarts
    /// so jobs left `running` by a crash are requeued on the next start.
    #[serde(default = "default_worker_id")]
    pub id: String,
    /// Number of concurrent job processing tasks.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Interval in seconds between job queue polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Attempts before a transient failure becomes final.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i32,
    /// Seconds to wait for running jobs on shutdown.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_seconds: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            id: default_worker_id(),
            concurrency: default_concurrency(),
            poll_interval_seconds: default_poll_interval(),
            max_attempts: default_max_attempts(),
            shutdown_grace_seconds: default_shutdown_grace(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_worker_id() -> String {
    "worker-1".to_string()
}

fn default_concurrency() -> usize {
    2
}

fn default_poll_interval() -> u64 {
    2
}

fn default_max_attempts() -> i32 {
    3
}

fn default_shutdown_grace() -> u64 {
    30
}
