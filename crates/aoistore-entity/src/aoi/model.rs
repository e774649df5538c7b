//! AOI entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::node::{NodeLifecycle, NodeStatus};

/// Maximum length of a derived short name.
pub const SHORT_NAME_MAX_LEN: usize = 15;

/// A root-level study area.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Aoi {
    /// Unique AOI identifier.
    pub id: Uuid,
    /// Display name, unique among active AOIs.
    pub name: String,
    /// Filesystem-friendly name used as the export directory name.
    pub shortname: String,
    /// Boundary geometry (WKT or GeoJSON text, passed through untouched).
    pub boundary: Option<String>,
    /// Matched hydrological reference point.
    pub pourpoint_id: Option<Uuid>,
    /// Enclosing AOI, when this one is nested.
    pub parent_aoi_id: Option<Uuid>,
    /// Free-form comment.
    pub comment: Option<String>,
    /// User who created the AOI.
    pub created_by: String,
    /// When the AOI was created.
    pub created_at: DateTime<Utc>,
    /// Soft-delete marker.
    pub removed_at: Option<DateTime<Utc>>,
    /// Cleared once the AOI has been deactivated.
    pub active: bool,
    /// Creation progress.
    pub status: NodeStatus,
}

impl NodeLifecycle for Aoi {
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

/// Data required to create a new AOI record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAoi {
    /// Identifier to assign.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Derived short name.
    pub shortname: String,
    /// Boundary geometry.
    pub boundary: Option<String>,
    /// Matched pour point.
    pub pourpoint_id: Option<Uuid>,
    /// Enclosing AOI.
    pub parent_aoi_id: Option<Uuid>,
    /// Free-form comment.
    pub comment: Option<String>,
    /// Creating user.
    pub created_by: String,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}

/// Replace whitespace runs with `_` and cut to [`SHORT_NAME_MAX_LEN`] characters.
pub fn make_short_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .take(SHORT_NAME_MAX_LEN)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_name_joins_words() {
        assert_eq!(make_short_name("Upper  Basin 1"), "Upper_Basin_1");
    }

    #[test]
    fn test_short_name_truncates() {
        assert_eq!(
            make_short_name("Yellowstone River at Billings"),
            "Yellowstone_Riv"
        );
    }
}
