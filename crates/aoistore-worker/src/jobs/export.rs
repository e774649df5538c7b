//! Snapshot export job handler.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use aoistore_entity::job::{Job, JobPayload};
use aoistore_service::{ContentStore, RequestContext};

use super::payload;
use crate::executor::{JobExecutionError, JobHandler};

/// Handles `export` jobs.
///
/// Without an explicit output directory the export lands in
/// `<export_root>/<job id>`.
#[derive(Debug)]
pub struct ExportJobHandler {
    /// Content store
    store: Arc<ContentStore>,
}

impl ExportJobHandler {
    pub fn new(store: Arc<ContentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl JobHandler for ExportJobHandler {
    fn job_type(&self) -> &str {
        "export"
    }

    async fn execute(&self, job: &Job, ctx: &RequestContext) -> Result<Option<Value>, JobExecutionError> {
        let JobPayload::Export {
            node,
            output_dir,
            as_of,
        } = payload(job)?
        else {
            return Err(JobExecutionError::Permanent(format!(
                "Job {} does not carry an export payload",
                job.id
            )));
        };

        let output_dir = match output_dir {
            Some(dir) => PathBuf::from(dir),
            None => self
                .store
                .config
                .storage
                .export_root_path()
                .join(job.id.to_string()),
        };
        let report = self.store.export(ctx, node, &output_dir, as_of).await?;
        info!(job_id = %job.id, path = %report.path.display(), "Export job finished");

        serde_json::to_value(&report)
            .map(Some)
            .map_err(|e| JobExecutionError::Permanent(format!("Failed to encode export result: {e}")))
    }
}
