//! Shared fixtures for the service tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use aoistore_core::config::DatabaseConfig;
use aoistore_core::traits::{epoch_seconds, ManualClock, StorageProvider};
use aoistore_database::DatabasePool;
use aoistore_entity::aoi::CreateAoi;
use aoistore_entity::directory::{ArchivingRule, CreateDirectory, Directory};
use aoistore_entity::file::{CreateFile, File};
use aoistore_storage::LocalStorageProvider;

use crate::archive::ArchivingPolicyEngine;
use crate::context::RequestContext;
use crate::export::SnapshotExportEngine;
use crate::import::coordinator::ImportCoordinator;
use crate::import::source::{ContentSource, DirectorySource};
use crate::lifecycle::LifecycleManager;
use crate::materializer::FilesystemMaterializer;
use crate::registry::layout;
use crate::registry::NodeRegistry;
use crate::tree::TreeStore;
use crate::version::VersionWriter;

/// Instant `secs` after the epoch.
pub fn t(secs: i64) -> DateTime<Utc> {
    epoch_seconds(secs)
}

/// Writes a complete, valid AOI bundle named `name` under `dir`.
pub async fn write_aoi_bundle(dir: &Path, name: &str) -> PathBuf {
    let root = dir.join(name);
    let mut entries: Vec<(String, String)> = Vec::new();

    for vector in layout::AOI_REQUIRED_VECTORS {
        entries.push((format!("aoi.gdb/{vector}.shp"), format!("vector {vector}")));
    }
    for raster in layout::AOI_REQUIRED_RASTERS.iter().chain(&["aoi"]) {
        entries.push((format!("aoi.gdb/{raster}.img"), format!("raster {raster}")));
    }
    for raster in layout::SURFACES_REQUIRED_RASTERS {
        entries.push((format!("surfaces.gdb/{raster}.img"), format!("surface {raster}")));
    }
    for raster in layout::PRISM_REQUIRED_RASTERS {
        entries.push((format!("prism.gdb/{raster}.img"), format!("prism {raster}")));
    }
    entries.push(("layers.gdb/roads.shp".to_string(), "roads".to_string()));
    entries.push(("analysis.gdb/elevzone.img".to_string(), "zones".to_string()));

    for (rel, content) in entries {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.unwrap();
        }
        tokio::fs::write(&path, content).await.unwrap();
    }
    root
}

/// A store over a scratch directory with a frozen clock at t=100.
pub struct Fixture {
    dir: tempfile::TempDir,
    pub db: DatabasePool,
    pub tree: Arc<TreeStore>,
    pub clock: Arc<ManualClock>,
    pub storage: Arc<dyn StorageProvider>,
    pub registry: Arc<NodeRegistry>,
    pub materializer: Arc<FilesystemMaterializer>,
    pub coordinator: Arc<ImportCoordinator>,
    pub lifecycle: Arc<LifecycleManager>,
    pub policy: Arc<ArchivingPolicyEngine>,
    pub export: Arc<SnapshotExportEngine>,
}

impl Fixture {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("test.db").display());
        let db = DatabasePool::connect_and_migrate(&DatabaseConfig::with_url(url))
            .await
            .unwrap();

        let clock = Arc::new(ManualClock::at_seconds(100));
        let storage: Arc<dyn StorageProvider> =
            Arc::new(LocalStorageProvider::new(dir.path().join("data")).await.unwrap());
        let tree = Arc::new(TreeStore::from_pool(db.pool().clone()));
        let registry = Arc::new(NodeRegistry::with_defaults());
        let materializer = Arc::new(FilesystemMaterializer::new(
            storage.clone(),
            tree.directories.clone(),
            registry.clone(),
            "aois",
        ));
        let versions = Arc::new(VersionWriter::new(tree.files.clone(), materializer.clone()));
        let coordinator = Arc::new(ImportCoordinator::new(
            tree.clone(),
            registry.clone(),
            materializer.clone(),
            versions,
            clock.clone(),
        ));
        let lifecycle = Arc::new(LifecycleManager::new(
            tree.clone(),
            registry.clone(),
            materializer.clone(),
            clock.clone(),
        ));
        let policy = Arc::new(ArchivingPolicyEngine::new(coordinator.clone(), lifecycle.clone()));
        let export = Arc::new(SnapshotExportEngine::new(
            tree.clone(),
            registry.clone(),
            storage.clone(),
            clock.clone(),
        ));

        Self {
            dir,
            db,
            tree,
            clock,
            storage,
            registry,
            materializer,
            coordinator,
            lifecycle,
            policy,
            export,
        }
    }

    pub fn ctx(&self) -> RequestContext {
        RequestContext::new("tester")
    }

    /// Writes `files` into a fresh source directory and opens it.
    pub async fn bundle(&self, files: &[(&str, &str)]) -> Arc<dyn ContentSource> {
        let root = self.dir.path().join("sources").join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&root).await.unwrap();
        for (rel, content) in files {
            let path = root.join(rel);
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent).await.unwrap();
            }
            tokio::fs::write(&path, content).await.unwrap();
        }
        DirectorySource::shared(root).await.unwrap()
    }

    /// A path under the scratch directory that does not exist yet.
    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("out").join(Uuid::new_v4().to_string())
    }

    /// An AOI with a finalized, unmaterialized root directory at t=0.
    pub async fn root_directory(&self, name: &str) -> Directory {
        let aoi_id = Uuid::new_v4();
        self.tree
            .aois
            .insert_provisional(&CreateAoi {
                id: aoi_id,
                name: name.to_string(),
                shortname: name.to_string(),
                boundary: None,
                pourpoint_id: None,
                parent_aoi_id: None,
                comment: None,
                created_by: "tester".to_string(),
                created_at: t(0),
            })
            .await
            .unwrap();
        self.tree.aois.finalize(aoi_id).await.unwrap();
        self.directory(aoi_id, None, name, "AOIDirectory", ArchivingRule::None, t(0))
            .await
    }

    pub async fn plain_directory(&self, parent: &Directory, name: &str, at: DateTime<Utc>) -> Directory {
        self.directory(parent.aoi_id, Some(parent.id), name, "Directory", ArchivingRule::None, at)
            .await
    }

    pub async fn group_directory(&self, parent: &Directory, name: &str, at: DateTime<Utc>) -> Directory {
        self.directory(parent.aoi_id, Some(parent.id), name, "Prism", ArchivingRule::Group, at)
            .await
    }

    pub async fn plain_file(&self, parent: &Directory, name: &str, at: DateTime<Utc>) -> File {
        let id = Uuid::new_v4();
        self.tree
            .files
            .insert_provisional(&CreateFile {
                id,
                aoi_id: parent.aoi_id,
                directory_id: parent.id,
                name: name.to_string(),
                type_tag: "File".to_string(),
                comment: None,
                created_by: "tester".to_string(),
                created_at: at,
            })
            .await
            .unwrap();
        self.tree.files.finalize(id).await.unwrap();
        self.tree.file(id).await.unwrap()
    }

    async fn directory(
        &self,
        aoi_id: Uuid,
        parent_id: Option<Uuid>,
        name: &str,
        type_tag: &str,
        archiving_rule: ArchivingRule,
        at: DateTime<Utc>,
    ) -> Directory {
        let id = Uuid::new_v4();
        self.tree
            .directories
            .insert_provisional(&CreateDirectory {
                id,
                aoi_id,
                parent_id,
                name: name.to_string(),
                type_tag: type_tag.to_string(),
                archiving_rule,
                comment: None,
                created_by: "tester".to_string(),
                created_at: at,
            })
            .await
            .unwrap();
        self.tree.directories.finalize(id).await.unwrap();
        self.tree.directory(id).await.unwrap()
    }
}
