//! File version entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One immutable version of a file's content.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FileData {
    /// Unique version identifier, also the on-disk file stem.
    pub id: Uuid,
    /// The file this version belongs to.
    pub file_id: Uuid,
    /// Insertion order, used to break `created_at` ties.
    pub seq: i64,
    /// Lowercase hex SHA-256 of the content.
    pub content_hash: String,
    /// Character encoding, when the content is text.
    pub encoding: Option<String>,
    /// Size in bytes.
    pub size_bytes: i64,
    /// Location relative to the data root.
    pub storage_path: String,
    /// Free-form comment.
    pub comment: Option<String>,
    /// User who created this version.
    pub created_by: String,
    /// When this version was created.
    pub created_at: DateTime<Utc>,
}

/// Data required to insert a version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFileData {
    /// Identifier to assign (must match the on-disk stem).
    pub id: Uuid,
    /// Owning file.
    pub file_id: Uuid,
    /// Content hash.
    pub content_hash: String,
    /// Character encoding.
    pub encoding: Option<String>,
    /// Size in bytes.
    pub size_bytes: i64,
    /// Location relative to the data root.
    pub storage_path: String,
    /// Free-form comment.
    pub comment: Option<String>,
    /// Creating user.
    pub created_by: String,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
}
