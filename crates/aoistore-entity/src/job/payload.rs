//! Typed job payload definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aoi::GeoPoint;
use crate::node::NodeRef;

/// Typed payloads for known job types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "job_type")]
pub enum JobPayload {
    /// Create a new AOI from an unpacked bundle.
    #[serde(rename = "import_aoi")]
    ImportAoi {
        /// AOI display name.
        name: String,
        /// Bundle directory on local disk.
        source_path: String,
        /// Boundary geometry.
        #[serde(default)]
        boundary: Option<String>,
        /// Outlet used to match a pour point.
        #[serde(default)]
        pourpoint: Option<GeoPoint>,
        /// Enclosing AOI.
        parent_aoi_id: Option<Uuid>,
        /// Free-form comment.
        comment: Option<String>,
    },
    /// Create a node of the given variant under an existing directory.
    #[serde(rename = "import")]
    Import {
        /// Target parent directory.
        parent_id: Uuid,
        /// Variant tag.
        type_tag: String,
        /// Content location on local disk.
        source_path: String,
        /// Name override.
        name: Option<String>,
        /// Free-form comment.
        comment: Option<String>,
    },
    /// Apply the archiving policy of a directory to new content.
    #[serde(rename = "update")]
    Update {
        /// Directory to update.
        directory_id: Uuid,
        /// Content location on local disk.
        source_path: String,
    },
    /// Reconstruct a subtree as of an instant.
    #[serde(rename = "export")]
    Export {
        /// Node to export.
        node: NodeRef,
        /// Output directory (defaults to a per-job directory under the export root).
        output_dir: Option<String>,
        /// Query instant (defaults to the time the job runs).
        as_of: Option<DateTime<Utc>>,
    },
}

impl JobPayload {
    /// The job type identifier stored alongside the payload.
    pub fn job_type(&self) -> &'static str {
        match self {
            Self::ImportAoi { .. } => "import_aoi",
            Self::Import { .. } => "import",
            Self::Update { .. } => "update",
            Self::Export { .. } => "export",
        }
    }
}
