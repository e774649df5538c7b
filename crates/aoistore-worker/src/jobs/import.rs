//! AOI and node import job handlers.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use aoistore_entity::job::{Job, JobPayload};
use aoistore_service::{ContentInput, ContentStore, CreateAoiRequest, DirectorySource, RequestContext};

use super::payload;
use crate::executor::{JobExecutionError, JobHandler};

/// Handles `import_aoi` jobs.
#[derive(Debug)]
pub struct ImportAoiJobHandler {
    /// Content store
    store: Arc<ContentStore>,
}

impl ImportAoiJobHandler {
    pub fn new(store: Arc<ContentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl JobHandler for ImportAoiJobHandler {
    fn job_type(&self) -> &str {
        "import_aoi"
    }

    async fn execute(&self, job: &Job, ctx: &RequestContext) -> Result<Option<Value>, JobExecutionError> {
        let JobPayload::ImportAoi {
            name,
            source_path,
            boundary,
            pourpoint,
            parent_aoi_id,
            comment,
        } = payload(job)?
        else {
            return Err(JobExecutionError::Permanent(format!(
                "Job {} does not carry an AOI import payload",
                job.id
            )));
        };

        let source = DirectorySource::shared(&source_path).await?;
        let aoi = self
            .store
            .create_aoi(
                ctx,
                CreateAoiRequest {
                    name,
                    source,
                    boundary,
                    pourpoint,
                    parent_aoi_id,
                    comment,
                },
            )
            .await?;
        let root = self.store.aois.root_directory(aoi.id).await?;
        info!(job_id = %job.id, aoi_id = %aoi.id, "AOI import job finished");

        Ok(Some(serde_json::json!({
            "aoi_id": aoi.id,
            "root_id": root.id,
            "name": aoi.name,
            "url": self.store.urls.resolve_aoi(aoi.id),
        })))
    }
}

/// Handles `import` jobs: one node under an existing directory.
#[derive(Debug)]
pub struct ImportJobHandler {
    /// Content store
    store: Arc<ContentStore>,
}

impl ImportJobHandler {
    pub fn new(store: Arc<ContentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl JobHandler for ImportJobHandler {
    fn job_type(&self) -> &str {
        "import"
    }

    async fn execute(&self, job: &Job, ctx: &RequestContext) -> Result<Option<Value>, JobExecutionError> {
        let JobPayload::Import {
            parent_id,
            type_tag,
            source_path,
            name,
            comment,
        } = payload(job)?
        else {
            return Err(JobExecutionError::Permanent(format!(
                "Job {} does not carry an import payload",
                job.id
            )));
        };

        let input = ContentInput::open(&source_path).await?;
        let node = self
            .store
            .create(ctx, &type_tag, parent_id, &input, name.as_deref(), comment.as_deref())
            .await?;
        info!(job_id = %job.id, node = %node.node_ref(), "Import job finished");

        Ok(Some(serde_json::json!({
            "node": node.node_ref(),
            "name": node.name(),
            "url": self.store.urls.resolve(&node)?,
        })))
    }
}
