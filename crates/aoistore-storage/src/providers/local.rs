//! Local filesystem storage provider.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::debug;

use aoistore_core::error::AppError;
use aoistore_core::result::AppResult;
use aoistore_core::traits::storage::{StorageObjectMeta, StorageProvider, StoredContent};

use crate::checksum::sha256_hex;

/// Local filesystem storage provider.
#[derive(Debug, Clone)]
pub struct LocalStorageProvider {
    /// Root directory for all stored content.
    root: PathBuf,
}

impl LocalStorageProvider {
    /// Create a new local storage provider rooted at the given path.
    pub async fn new(root_path: impl AsRef<Path>) -> AppResult<Self> {
        let root = root_path.as_ref().to_path_buf();
        fs::create_dir_all(&root).await.map_err(|e| {
            AppError::io(format!("Failed to create storage root: {}", root.display()), e)
        })?;
        Ok(Self { root })
    }

    /// Resolve a relative path to an absolute path within the root.
    fn resolve(&self, path: &str) -> PathBuf {
        let clean = path.trim_start_matches('/');
        self.root.join(clean)
    }

    /// Ensure the parent directory of a path exists.
    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::io(
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageProvider for LocalStorageProvider {
    fn provider_type(&self) -> &str {
        "local"
    }

    fn locate(&self, path: &str) -> PathBuf {
        self.resolve(path)
    }

    async fn health_check(&self) -> AppResult<bool> {
        Ok(self.root.is_dir())
    }

    async fn create_dir(&self, path: &str) -> AppResult<()> {
        let full_path = self.resolve(path);
        fs::create_dir_all(&full_path)
            .await
            .map_err(|e| AppError::io(format!("Failed to create directory: {path}"), e))
    }

    async fn create_dir_exclusive(&self, path: &str) -> AppResult<bool> {
        let full_path = self.resolve(path);
        self.ensure_parent(&full_path).await?;
        match fs::create_dir(&full_path).await {
            Ok(()) => {
                debug!(path, "Created directory");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && full_path.is_dir() => {
                Ok(false)
            }
            Err(e) => Err(AppError::io(format!("Failed to create directory: {path}"), e)),
        }
    }

    async fn delete_dir(&self, path: &str) -> AppResult<()> {
        let full_path = self.resolve(path);
        fs::remove_dir_all(&full_path)
            .await
            .map_err(|e| AppError::io(format!("Failed to delete directory: {path}"), e))?;
        debug!(path, "Deleted directory tree");
        Ok(())
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        let full_path = self.resolve(path);
        fs::remove_file(&full_path)
            .await
            .map_err(|e| AppError::io(format!("Failed to delete file: {path}"), e))
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        fs::try_exists(self.resolve(path))
            .await
            .map_err(|e| AppError::io(format!("Failed to stat: {path}"), e))
    }

    async fn list(&self, path: &str) -> AppResult<Vec<StorageObjectMeta>> {
        let full_path = self.resolve(path);
        let mut dir = fs::read_dir(&full_path)
            .await
            .map_err(|e| AppError::io(format!("Failed to list directory: {path}"), e))?;

        let mut entries = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| AppError::io(format!("Failed to read directory entry: {path}"), e))?
        {
            let meta = entry
                .metadata()
                .await
                .map_err(|e| AppError::io(format!("Failed to stat entry in: {path}"), e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let rel = if path.is_empty() {
                name.clone()
            } else {
                format!("{}/{}", path.trim_end_matches('/'), name)
            };
            entries.push(StorageObjectMeta {
                path: rel,
                name,
                size_bytes: if meta.is_file() { meta.len() } else { 0 },
                is_directory: meta.is_dir(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn read_bytes(&self, path: &str) -> AppResult<Bytes> {
        let full_path = self.resolve(path);
        let data = fs::read(&full_path)
            .await
            .map_err(|e| AppError::io(format!("Failed to read file: {path}"), e))?;
        Ok(Bytes::from(data))
    }

    async fn write(&self, path: &str, data: Bytes) -> AppResult<StoredContent> {
        let full_path = self.resolve(path);
        self.ensure_parent(&full_path).await?;
        fs::write(&full_path, &data)
            .await
            .map_err(|e| AppError::io(format!("Failed to write file: {path}"), e))?;

        debug!(path, bytes = data.len(), "Wrote file");
        Ok(StoredContent {
            size_bytes: data.len() as u64,
            sha256: sha256_hex(&data),
        })
    }

    async fn copy_in(&self, source: &Path, dest: &str) -> AppResult<StoredContent> {
        let full_path = self.resolve(dest);
        self.ensure_parent(&full_path).await?;

        let input = fs::File::open(source)
            .await
            .map_err(|e| AppError::io(format!("Failed to open source: {}", source.display()), e))?;
        let mut output = fs::File::create(&full_path)
            .await
            .map_err(|e| AppError::io(format!("Failed to create file: {dest}"), e))?;

        let mut hasher = Sha256::new();
        let mut total_bytes = 0u64;
        let mut stream = ReaderStream::new(input);
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                AppError::io(format!("Failed to read source: {}", source.display()), e)
            })?;
            hasher.update(&chunk);
            total_bytes += chunk.len() as u64;
            output
                .write_all(&chunk)
                .await
                .map_err(|e| AppError::io(format!("Failed to write chunk: {dest}"), e))?;
        }
        output
            .flush()
            .await
            .map_err(|e| AppError::io(format!("Failed to flush file: {dest}"), e))?;

        debug!(dest, bytes = total_bytes, "Copied content into store");
        Ok(StoredContent {
            size_bytes: total_bytes,
            sha256: hex::encode(hasher.finalize()),
        })
    }

    async fn copy_out(&self, source: &str, dest: &Path) -> AppResult<u64> {
        let from_path = self.resolve(source);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::io(format!("Failed to create directory: {}", parent.display()), e)
            })?;
        }
        fs::copy(&from_path, dest).await.map_err(|e| {
            AppError::io(format!("Failed to copy {source} -> {}", dest.display()), e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_delete_missing_dir_reports_absent_path() {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalStorageProvider::new(dir.path()).await.unwrap();

        provider.create_dir("aois/a").await.unwrap();
        provider.delete_dir("aois/a").await.unwrap();
        let err = provider.delete_dir("aois/a").await.unwrap_err();
        assert!(err.is_path_absent());
    }

    #[tokio::test]
    async fn test_create_dir_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalStorageProvider::new(dir.path()).await.unwrap();

        assert!(provider.create_dir_exclusive("aois/x/prism_20240101000000").await.unwrap());
        assert!(!provider.create_dir_exclusive("aois/x/prism_20240101000000").await.unwrap());
        assert!(provider.exists("aois/x").await.unwrap());
    }

    #[tokio::test]
    async fn test_copy_in_hashes_and_copy_out_restores() {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalStorageProvider::new(dir.path().join("store")).await.unwrap();
        let source = dir.path().join("roads.shp");
        tokio::fs::write(&source, b"V1 bytes").await.unwrap();

        let stored = provider.copy_in(&source, "layers/abc.shp").await.unwrap();
        assert_eq!(stored.size_bytes, 8);
        assert_eq!(stored.sha256, sha256_hex(b"V1 bytes"));

        let out = dir.path().join("out/roads.shp");
        assert_eq!(provider.copy_out("layers/abc.shp", &out).await.unwrap(), 8);
        assert_eq!(tokio::fs::read(&out).await.unwrap(), b"V1 bytes");
    }

    #[tokio::test]
    async fn test_list_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let provider = LocalStorageProvider::new(dir.path()).await.unwrap();
        provider.write("d/b.txt", Bytes::from_static(b"b")).await.unwrap();
        provider.write("d/a.txt", Bytes::from_static(b"aa")).await.unwrap();
        provider.create_dir("d/sub").await.unwrap();

        let names: Vec<String> = provider
            .list("d")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.path)
            .collect();
        assert_eq!(names, vec!["d/a.txt", "d/b.txt", "d/sub"]);
    }
}
