//! Storage provider trait for the on-disk side of the content store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::result::AppResult;

/// Metadata about a stored object.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StorageObjectMeta {
    /// Path relative to the provider root.
    pub path: String,
    /// Final path component.
    pub name: String,
    /// Size in bytes (0 for directories).
    pub size_bytes: u64,
    /// Whether this is a directory.
    pub is_directory: bool,
}

/// Result of copying external content into the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredContent {
    /// Number of bytes written.
    pub size_bytes: u64,
    /// Lowercase hex SHA-256 of the bytes written.
    pub sha256: String,
}

/// Trait for content storage backends.
///
/// All paths are relative to the provider's root. The trait is defined in
/// `aoistore-core` and implemented in `aoistore-storage`.
#[async_trait]
pub trait StorageProvider: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local").
    fn provider_type(&self) -> &str;

    /// Absolute location of a relative path, for display and external tools.
    fn locate(&self, path: &str) -> PathBuf;

    /// Check whether the provider is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Create a directory and any missing parents. Existing directories are fine.
    async fn create_dir(&self, path: &str) -> AppResult<()>;

    /// Create a directory that must not exist yet.
    ///
    /// Missing parents are created. Returns `false` when the directory was
    /// already present.
    async fn create_dir_exclusive(&self, path: &str) -> AppResult<bool>;

    /// Delete a directory and all its contents recursively.
    ///
    /// A missing directory yields a `Filesystem` error for which
    /// [`AppError::is_path_absent`](crate::AppError::is_path_absent) is true.
    async fn delete_dir(&self, path: &str) -> AppResult<()>;

    /// Delete a single file.
    async fn delete(&self, path: &str) -> AppResult<()>;

    /// Check whether a file or directory exists at the given path.
    async fn exists(&self, path: &str) -> AppResult<bool>;

    /// List the immediate contents of a directory.
    async fn list(&self, path: &str) -> AppResult<Vec<StorageObjectMeta>>;

    /// Read a stored file into memory.
    async fn read_bytes(&self, path: &str) -> AppResult<Bytes>;

    /// Write bytes to a stored file, replacing any existing content.
    async fn write(&self, path: &str, data: Bytes) -> AppResult<StoredContent>;

    /// Stream an external file into the store, hashing it on the way.
    async fn copy_in(&self, source: &Path, dest: &str) -> AppResult<StoredContent>;

    /// Copy a stored file to an external location.
    async fn copy_out(&self, source: &str, dest: &Path) -> AppResult<u64>;
}
