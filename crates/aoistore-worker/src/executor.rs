//! Job executor: dispatches jobs to registered handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use aoistore_core::error::{AppError, ErrorKind};
use aoistore_entity::job::Job;
use aoistore_service::RequestContext;

/// Trait for job handler implementations.
#[async_trait]
pub trait JobHandler: Send + Sync + std::fmt::Debug {
    /// The job type this handler processes.
    fn job_type(&self) -> &str;

    /// Execute the job. `ctx` carries the job's creator and its
    /// cancellation token.
    async fn execute(&self, job: &Job, ctx: &RequestContext) -> Result<Option<Value>, JobExecutionError>;
}

/// Error from job execution.
#[derive(Debug, thiserror::Error)]
pub enum JobExecutionError {
    /// Permanent failure, do not retry.
    #[error("Permanent job failure: {0}")]
    Permanent(String),

    /// Transient failure, may retry.
    #[error("Transient job failure: {0}")]
    Transient(String),

    /// Stopped at a checkpoint after an abort request.
    #[error("Job cancelled: {0}")]
    Cancelled(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(AppError),
}

impl From<AppError> for JobExecutionError {
    /// Classifies a store error by the kind of its underlying cause.
    fn from(err: AppError) -> Self {
        match err.root_kind() {
            ErrorKind::Cancelled => Self::Cancelled(err.to_string()),
            ErrorKind::Database | ErrorKind::Filesystem => Self::Transient(err.to_string()),
            ErrorKind::NotFound
            | ErrorKind::Validation
            | ErrorKind::Conflict
            | ErrorKind::TemporalQuery
            | ErrorKind::ReadOnly
            | ErrorKind::Configuration
            | ErrorKind::Serialization => Self::Permanent(err.to_string()),
            ErrorKind::PartialImport | ErrorKind::Internal => Self::Internal(err),
        }
    }
}

/// Dispatches jobs to the appropriate handler based on `job_type`.
#[derive(Debug, Default)]
pub struct JobExecutor {
    /// Registered job handlers by type.
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl JobExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job handler.
    pub fn register(&mut self, handler: Arc<dyn JobHandler>) {
        let job_type = handler.job_type().to_string();
        info!(job_type = %job_type, "Registered job handler");
        self.handlers.insert(job_type, handler);
    }

    /// Execute a job by dispatching to the correct handler.
    pub async fn execute(&self, job: &Job, ctx: &RequestContext) -> Result<Option<Value>, JobExecutionError> {
        let handler = self.handlers.get(&job.job_type).ok_or_else(|| {
            JobExecutionError::Permanent(format!(
                "No handler registered for job type '{}'",
                job.job_type
            ))
        })?;

        info!(
            job_id = %job.id,
            job_type = %job.job_type,
            attempt = job.attempts,
            max_attempts = job.max_attempts,
            "Executing job"
        );
        handler.execute(job, ctx).await
    }

    pub fn has_handler(&self, job_type: &str) -> bool {
        self.handlers.contains_key(job_type)
    }

    /// Registered job types, sorted.
    pub fn registered_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }
}
