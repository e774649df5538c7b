//! Directory update job handler.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use aoistore_entity::job::{Job, JobPayload};
use aoistore_service::{ContentStore, DirectorySource, RequestContext};

use super::payload;
use crate::executor::{JobExecutionError, JobHandler};

/// Handles `update` jobs by applying the directory's archiving rule.
#[derive(Debug)]
pub struct UpdateJobHandler {
    /// Content store
    store: Arc<ContentStore>,
}

impl UpdateJobHandler {
    pub fn new(store: Arc<ContentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl JobHandler for UpdateJobHandler {
    fn job_type(&self) -> &str {
        "update"
    }

    async fn execute(&self, job: &Job, ctx: &RequestContext) -> Result<Option<Value>, JobExecutionError> {
        let JobPayload::Update {
            directory_id,
            source_path,
        } = payload(job)?
        else {
            return Err(JobExecutionError::Permanent(format!(
                "Job {} does not carry an update payload",
                job.id
            )));
        };

        let source = DirectorySource::shared(&source_path).await?;
        let outcome = self.store.update(ctx, directory_id, source).await?;
        info!(job_id = %job.id, directory_id = %directory_id, "Update job finished");

        serde_json::to_value(&outcome)
            .map(Some)
            .map_err(|e| JobExecutionError::Permanent(format!("Failed to encode update result: {e}")))
    }
}
