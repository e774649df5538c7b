//! Directory entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::rule::ArchivingRule;
use crate::node::{NodeLifecycle, NodeRef, NodeStatus};

/// A directory in an AOI tree.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Directory {
    /// Unique directory identifier.
    pub id: Uuid,
    /// The AOI this directory belongs to.
    pub aoi_id: Uuid,
    /// Parent directory (None only for the AOI root).
    pub parent_id: Option<Uuid>,
    /// Logical name, unique among current siblings.
    pub name: String,
    /// Variant discriminator.
    pub type_tag: String,
    /// Archiving rule fixed at creation.
    pub archiving_rule: ArchivingRule,
    /// On-disk location relative to the data root, set on first materialization.
    pub fs_path: Option<String>,
    /// Free-form comment.
    pub comment: Option<String>,
    /// User who created the directory.
    pub created_by: String,
    /// When the directory was created.
    pub created_at: DateTime<Utc>,
    /// Soft-delete marker.
    pub removed_at: Option<DateTime<Utc>>,
    /// Cleared by cascaded deactivation.
    pub active: bool,
    /// Creation progress.
    pub status: NodeStatus,
}

impl Directory {
    /// Reference to this directory.
    pub fn node_ref(&self) -> NodeRef {
        NodeRef::directory(self.id)
    }

    /// Whether this is an AOI root.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

impl NodeLifecycle for Directory {
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

/// Data required to insert a provisional directory record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDirectory {
    /// Identifier to assign.
    pub id: Uuid,
    /// Owning AOI.
    pub aoi_id: Uuid,
    /// Parent directory.
    pub parent_id: Option<Uuid>,
    /// Logical name.
    pub name: String,
    /// Variant discriminator.
    pub type_tag: String,
    /// Archiving rule of the variant.
    pub archiving_rule: ArchivingRule,
    /// Free-form comment.
    pub comment: Option<String>,
    /// Creating user.
    pub created_by: String,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}
