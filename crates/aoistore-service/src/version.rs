//! File version writing.
//!
//! A version is an immutable blob named after its own id, stored in the
//! directory of the file's parent, plus one `file_data` row.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use aoistore_core::result::AppResult;
use aoistore_database::repositories::FileRepository;
use aoistore_entity::directory::Directory;
use aoistore_entity::file::{CreateFileData, File, FileData};
use aoistore_storage::checksum::sha256_file;

use crate::context::RequestContext;
use crate::import::source::SourceLayer;
use crate::materializer::FilesystemMaterializer;

/// Result of offering new content for an existing file.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", content = "version", rename_all = "lowercase")]
pub enum AppendOutcome {
    /// A new version was stored.
    Added(FileData),
    /// The content matched the current version, which is returned.
    Unchanged(FileData),
}

impl AppendOutcome {
    pub fn version(&self) -> &FileData {
        match self {
            Self::Added(v) | Self::Unchanged(v) => v,
        }
    }

    pub fn is_added(&self) -> bool {
        matches!(self, Self::Added(_))
    }
}

/// Stores version blobs and records them.
#[derive(Debug, Clone)]
pub struct VersionWriter {
    /// File and version repository.
    files: Arc<FileRepository>,
    /// Path resolution and blob removal.
    materializer: Arc<FilesystemMaterializer>,
}

impl VersionWriter {
    /// Creates a new version writer.
    pub fn new(files: Arc<FileRepository>, materializer: Arc<FilesystemMaterializer>) -> Self {
        Self {
            files,
            materializer,
        }
    }

    /// Copies `layer` into the store as a new version of `file`.
    ///
    /// The blob is removed again when the row cannot be inserted.
    #[allow(clippy::too_many_arguments)]
    pub async fn write(
        &self,
        ctx: &RequestContext,
        file: &File,
        parent: &Directory,
        layer: &SourceLayer,
        extension: &str,
        created_at: DateTime<Utc>,
        comment: Option<&str>,
    ) -> AppResult<FileData> {
        ctx.checkpoint()?;
        let directory_path = self.materializer.resolve_path(parent).await?;
        let id = Uuid::new_v4();
        let storage_path = self.materializer.version_path(&directory_path, id, extension);

        let stored = self
            .materializer
            .storage()
            .copy_in(&layer.path, &storage_path)
            .await?;

        let record = CreateFileData {
            id,
            file_id: file.id,
            content_hash: stored.sha256,
            encoding: None,
            size_bytes: i64::try_from(stored.size_bytes).unwrap_or(i64::MAX),
            storage_path: storage_path.clone(),
            comment: comment.map(String::from),
            created_by: ctx.username.clone(),
            created_at,
        };

        match self.files.insert_version(&record).await {
            Ok(version) => {
                info!(
                    file_id = %file.id,
                    version_id = %version.id,
                    seq = version.seq,
                    bytes = version.size_bytes,
                    "File version stored"
                );
                Ok(version)
            }
            Err(e) => {
                if let Err(cleanup) = self.materializer.remove_blob(&storage_path).await {
                    warn!(path = %storage_path, error = %cleanup, "Failed to remove orphaned version blob");
                }
                Err(e)
            }
        }
    }

    /// Adds a version unless the content equals the current version.
    ///
    /// Only the latest version counts: reverting to older content stores
    /// it again so the timeline shows the revert.
    #[allow(clippy::too_many_arguments)]
    pub async fn append(
        &self,
        ctx: &RequestContext,
        file: &File,
        parent: &Directory,
        layer: &SourceLayer,
        extension: &str,
        created_at: DateTime<Utc>,
        comment: Option<&str>,
    ) -> AppResult<AppendOutcome> {
        let hash = sha256_file(&layer.path).await?;
        if let Some(latest) = self.files.find_latest_version(file.id).await? {
            if latest.content_hash == hash {
                info!(file_id = %file.id, version_id = %latest.id, "Content unchanged, no version added");
                return Ok(AppendOutcome::Unchanged(latest));
            }
        }

        self.write(ctx, file, parent, layer, extension, created_at, comment)
            .await
            .map(AppendOutcome::Added)
    }
}
