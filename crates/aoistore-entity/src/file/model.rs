//! File entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::node::{NodeLifecycle, NodeRef, NodeStatus};

/// A logical file whose content lives in its versions.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct File {
    /// Unique file identifier.
    pub id: Uuid,
    /// The AOI this file belongs to.
    pub aoi_id: Uuid,
    /// The directory containing this file.
    pub directory_id: Uuid,
    /// Logical name (including extension), unique among current siblings.
    pub name: String,
    /// Variant discriminator.
    pub type_tag: String,
    /// Free-form comment.
    pub comment: Option<String>,
    /// User who created the file.
    pub created_by: String,
    /// When the file was created.
    pub created_at: DateTime<Utc>,
    /// Soft-delete marker.
    pub removed_at: Option<DateTime<Utc>>,
    /// Cleared by cascaded deactivation.
    pub active: bool,
    /// Creation progress.
    pub status: NodeStatus,
}

impl File {
    /// Reference to this file.
    pub fn node_ref(&self) -> NodeRef {
        NodeRef::file(self.id)
    }

    /// Get the file extension (lowercase), if any.
    pub fn extension(&self) -> Option<String> {
        self.name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .filter(|ext| !ext.is_empty())
    }
}

impl NodeLifecycle for File {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn removed_at(&self) -> Option<DateTime<Utc>> {
        self.removed_at
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn status(&self) -> NodeStatus {
        self.status
    }
}

/// Data required to insert a provisional file record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFile {
    /// Identifier to assign.
    pub id: Uuid,
    /// Owning AOI.
    pub aoi_id: Uuid,
    /// Containing directory.
    pub directory_id: Uuid,
    /// Logical name.
    pub name: String,
    /// Variant discriminator.
    pub type_tag: String,
    /// Free-form comment.
    pub comment: Option<String>,
    /// Creating user.
    pub created_by: String,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}
