//! Job handlers for imports, updates and exports.

pub mod export;
pub mod import;
pub mod update;

use std::sync::Arc;

use aoistore_entity::job::{Job, JobPayload};
use aoistore_service::ContentStore;

use crate::executor::{JobExecutionError, JobExecutor};

pub use export::ExportJobHandler;
pub use import::{ImportAoiJobHandler, ImportJobHandler};
pub use update::UpdateJobHandler;

/// Decodes a job's payload; a malformed payload is never retried.
pub(crate) fn payload(job: &Job) -> Result<JobPayload, JobExecutionError> {
    job.typed_payload().map_err(|e| {
        JobExecutionError::Permanent(format!("Malformed payload for job {}: {e}", job.id))
    })
}

/// An executor with every content store handler registered.
pub fn default_executor(store: Arc<ContentStore>) -> JobExecutor {
    let mut executor = JobExecutor::new();
    executor.register(Arc::new(ImportAoiJobHandler::new(store.clone())));
    executor.register(Arc::new(ImportJobHandler::new(store.clone())));
    executor.register(Arc::new(UpdateJobHandler::new(store.clone())));
    executor.register(Arc::new(ExportJobHandler::new(store)));
    executor
}
