//! Filesystem materializer: derives, creates and removes on-disk paths.
//!
//! A directory's path is resolved once, the first time it is needed, and
//! cached on its record. Paths are relative to the storage root.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use aoistore_core::error::AppError;
use aoistore_core::result::AppResult;
use aoistore_core::traits::StorageProvider;
use aoistore_database::repositories::DirectoryRepository;
use aoistore_entity::directory::Directory;

use crate::registry::NodeRegistry;

/// How many `_<n>` suffixes are tried before giving up on a name.
const MAX_NAME_ATTEMPTS: usize = 100;

/// Joins two relative storage paths.
pub fn join_path(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}/{name}", base.trim_end_matches('/'))
    }
}

/// Creates on-disk directories for tree nodes and removes them again.
#[derive(Debug, Clone)]
pub struct FilesystemMaterializer {
    /// Storage backend rooted at the data root.
    storage: Arc<dyn StorageProvider>,
    /// Directory repository (path cache).
    directories: Arc<DirectoryRepository>,
    /// Variant lookup for naming.
    registry: Arc<NodeRegistry>,
    /// Relative directory holding AOI roots.
    aoi_dir: String,
}

impl FilesystemMaterializer {
    /// Creates a new materializer.
    pub fn new(
        storage: Arc<dyn StorageProvider>,
        directories: Arc<DirectoryRepository>,
        registry: Arc<NodeRegistry>,
        aoi_dir: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            directories,
            registry,
            aoi_dir: aoi_dir.into(),
        }
    }

    /// The storage backend.
    pub fn storage(&self) -> &Arc<dyn StorageProvider> {
        &self.storage
    }

    /// Returns the directory's path, creating it and any unmaterialized
    /// ancestors first.
    pub async fn resolve_path(&self, dir: &Directory) -> AppResult<String> {
        if let Some(path) = &dir.fs_path {
            return Ok(path.clone());
        }

        // Climb to the nearest ancestor with a cached path.
        let mut pending = vec![dir.clone()];
        let mut base = self.aoi_dir.clone();
        let mut parent_id = dir.parent_id;
        while let Some(id) = parent_id {
            let parent = self.directories.get(id).await?;
            if let Some(path) = &parent.fs_path {
                base = path.clone();
                break;
            }
            parent_id = parent.parent_id;
            pending.push(parent);
        }

        while let Some(next) = pending.pop() {
            base = self.materialize(&next, &base).await?;
        }
        Ok(base)
    }

    async fn materialize(&self, dir: &Directory, parent_path: &str) -> AppResult<String> {
        let variant = self.registry.resolve(&dir.type_tag)?;
        let base_name = variant.filesystem_name(dir);
        let exclusive = dir.archiving_rule.is_timestamped();

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = match attempt {
                0 => base_name.clone(),
                n => format!("{base_name}_{n}"),
            };
            let path = join_path(parent_path, &name);

            if self.directories.fs_path_claimed(&path, dir.id).await? {
                continue;
            }
            let created = self.storage.create_dir_exclusive(&path).await?;
            if !created && exclusive {
                continue;
            }

            let stored = self.directories.cache_fs_path(dir.id, &path).await?;
            if stored != path && created {
                // Lost a race for this record; keep the winner's path.
                if let Err(e) = self.remove_path(&path).await {
                    warn!(directory_id = %dir.id, path = %path, error = %e, "Failed to remove surplus directory");
                }
            }
            debug!(directory_id = %dir.id, path = %stored, "Directory materialized");
            return Ok(stored);
        }

        Err(AppError::filesystem(format!(
            "No free path for directory '{}' under {parent_path}",
            dir.name
        )))
    }

    /// Removes a directory's subtree from disk. Unmaterialized directories
    /// and already-absent paths are not errors.
    pub async fn remove_tree(&self, dir: &Directory) -> AppResult<()> {
        let Some(path) = &dir.fs_path else {
            return Ok(());
        };
        self.remove_path(path).await
    }

    /// Recursively removes `path`, swallowing a missing path.
    pub async fn remove_path(&self, path: &str) -> AppResult<()> {
        match self.storage.delete_dir(path).await {
            Err(e) if e.is_path_absent() => {
                debug!(path = %path, "Path already absent");
                Ok(())
            }
            other => other,
        }
    }

    /// Storage path of a version blob.
    pub fn version_path(&self, directory_path: &str, version_id: Uuid, extension: &str) -> String {
        join_path(directory_path, &format!("{version_id}.{extension}"))
    }

    /// Removes a version blob, swallowing a missing file.
    pub async fn remove_blob(&self, path: &str) -> AppResult<()> {
        match self.storage.delete(path).await {
            Err(e) if e.is_path_absent() => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Fixture, t};
    use aoistore_core::error::ErrorKind;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("aois", "x"), "aois/x");
        assert_eq!(join_path("aois/", "x"), "aois/x");
        assert_eq!(join_path("", "x"), "x");
    }

    #[tokio::test]
    async fn test_resolve_creates_ancestors_and_caches() {
        let fx = Fixture::new().await;
        let root = fx.root_directory("Basin1").await;
        let layers = fx.plain_directory(&root, "layers", t(10)).await;

        let path = fx.materializer.resolve_path(&layers).await.unwrap();
        assert_eq!(path, format!("aois/{}/layers", root.id));
        assert!(fx.storage.exists(&path).await.unwrap());

        let cached = fx.tree.directory(layers.id).await.unwrap();
        assert_eq!(cached.fs_path.as_deref(), Some(path.as_str()));
        let root_cached = fx.tree.directory(root.id).await.unwrap();
        assert_eq!(root_cached.fs_path, Some(format!("aois/{}", root.id)));

        // second resolution is served from the cache
        assert_eq!(fx.materializer.resolve_path(&cached).await.unwrap(), path);
    }

    #[tokio::test]
    async fn test_concurrent_first_use_agrees_on_one_path() {
        let fx = Fixture::new().await;
        let root = fx.root_directory("Basin1").await;
        let layers = fx.plain_directory(&root, "layers", t(10)).await;

        let (a, b) = tokio::join!(
            fx.materializer.resolve_path(&layers),
            fx.materializer.resolve_path(&layers)
        );
        assert_eq!(a.unwrap(), b.unwrap());
        let parent = fx.tree.directory(root.id).await.unwrap();
        let listing = fx.storage.list(parent.fs_path.as_deref().unwrap()).await.unwrap();
        assert_eq!(listing.len(), 1);
    }

    #[tokio::test]
    async fn test_group_name_collision_gets_counter() {
        let fx = Fixture::new().await;
        let root = fx.root_directory("Basin1").await;
        let container = fx.plain_directory(&root, "prism", t(10)).await;
        let first = fx.group_directory(&container, "prism", t(20)).await;
        fx.tree.tree.soft_remove(&[first.node_ref()], t(20)).await.unwrap();
        let second = fx.group_directory(&container, "prism", t(20)).await;

        let a = fx.materializer.resolve_path(&first).await.unwrap();
        let b = fx.materializer.resolve_path(&second).await.unwrap();
        assert!(a.ends_with("/prism_19700101000020"));
        assert!(b.ends_with("/prism_19700101000020_1"));
    }

    #[tokio::test]
    async fn test_removed_sibling_keeps_its_path() {
        let fx = Fixture::new().await;
        let root = fx.root_directory("Basin1").await;
        let old = fx.plain_directory(&root, "maps", t(10)).await;
        let old_path = fx.materializer.resolve_path(&old).await.unwrap();
        fx.tree.tree.soft_remove(&[old.node_ref()], t(15)).await.unwrap();

        let new = fx.plain_directory(&root, "maps", t(20)).await;
        let new_path = fx.materializer.resolve_path(&new).await.unwrap();
        assert_ne!(old_path, new_path);
        assert!(new_path.ends_with("/maps_1"));
    }

    #[tokio::test]
    async fn test_remove_tree_is_idempotent() {
        let fx = Fixture::new().await;
        let root = fx.root_directory("Basin1").await;
        let layers = fx.plain_directory(&root, "layers", t(10)).await;
        let path = fx.materializer.resolve_path(&layers).await.unwrap();
        let layers = fx.tree.directory(layers.id).await.unwrap();

        fx.materializer.remove_tree(&layers).await.unwrap();
        assert!(!fx.storage.exists(&path).await.unwrap());
        fx.materializer.remove_tree(&layers).await.unwrap();
        fx.materializer.remove_path("never/created").await.unwrap();
    }

    #[tokio::test]
    async fn test_create_failure_caches_nothing() {
        let fx = Fixture::new().await;
        let root = fx.root_directory("Basin1").await;
        let root_path = fx.materializer.resolve_path(&root).await.unwrap();
        // a regular file where the directory should go
        fx.storage
            .write(&format!("{root_path}/layers"), bytes::Bytes::from_static(b"x"))
            .await
            .unwrap();
        let layers = fx.plain_directory(&root, "layers", t(10)).await;

        let err = fx.materializer.resolve_path(&layers).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Filesystem);
        assert!(fx.tree.directory(layers.id).await.unwrap().fs_path.is_none());
    }
}
