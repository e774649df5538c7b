//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use aoistore_core::config::AppConfig;
use aoistore_core::traits::{Clock, ManualClock};
use aoistore_core::{AppError, AppResult};
use aoistore_database::DatabasePool;
use aoistore_entity::aoi::Aoi;
use aoistore_entity::directory::{ArchivingRule, Directory};
use aoistore_entity::file::File;
use aoistore_entity::node::NodeKind;
use aoistore_service::registry::{layout, ContentInput, NodeRegistry, NodeVariant};
use aoistore_service::{
    ContentStore, CreateAoiRequest, DirectorySource, ImportCoordinator, Node, RequestContext,
    TreeStore,
};

/// A store over a scratch directory with a hand-driven clock.
pub struct TestStore {
    dir: tempfile::TempDir,
    pub store: ContentStore,
    pub clock: Arc<ManualClock>,
    pub config: AppConfig,
}

impl TestStore {
    pub async fn new() -> Self {
        Self::with_registry(NodeRegistry::with_defaults()).await
    }

    pub async fn with_registry(registry: NodeRegistry) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let data_root = dir.path().join("data");
        tokio::fs::create_dir_all(&data_root).await.unwrap();
        let config = AppConfig::for_data_root(data_root.display().to_string());
        let db = DatabasePool::connect_and_migrate(&config.database).await.unwrap();
        let clock = Arc::new(ManualClock::at_seconds(1));
        let shared: Arc<dyn Clock> = clock.clone();
        let store = ContentStore::with_registry(&config, db.pool().clone(), shared, registry)
            .await
            .unwrap();
        Self {
            dir,
            store,
            clock,
            config,
        }
    }

    pub fn ctx(&self) -> RequestContext {
        RequestContext::new("tester")
    }

    /// A path under the scratch root that does not exist yet.
    pub fn scratch(&self, name: &str) -> PathBuf {
        self.dir
            .path()
            .join("scratch")
            .join(format!("{name}-{}", Uuid::new_v4()))
    }

    /// Directory holding every AOI directory on disk.
    pub fn aoi_root(&self) -> PathBuf {
        self.config
            .storage
            .data_root_path()
            .join(&self.config.storage.aoi_dir)
    }

    /// Writes `entries` (relative path, content) under a fresh directory.
    pub async fn write(&self, entries: &[(&str, &str)]) -> PathBuf {
        let root = self.scratch("source");
        for (rel, content) in entries {
            let path = root.join(rel);
            tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
            tokio::fs::write(&path, content).await.unwrap();
        }
        root
    }

    /// Writes a complete AOI bundle. `roads` is the content of the only
    /// layer in `layers.gdb`.
    pub async fn aoi_bundle(&self, roads: &str) -> PathBuf {
        let mut entries: Vec<(String, String)> = Vec::new();
        for vector in layout::AOI_REQUIRED_VECTORS {
            entries.push((format!("aoi.gdb/{vector}.shp"), (*vector).to_string()));
        }
        for raster in layout::AOI_REQUIRED_RASTERS.iter().chain(&["aoi"]) {
            entries.push((format!("aoi.gdb/{raster}.img"), (*raster).to_string()));
        }
        for raster in layout::SURFACES_REQUIRED_RASTERS {
            entries.push((format!("surfaces.gdb/{raster}.img"), (*raster).to_string()));
        }
        for raster in layout::PRISM_REQUIRED_RASTERS {
            entries.push((format!("prism.gdb/{raster}.img"), format!("{raster} v1")));
        }
        entries.push(("layers.gdb/roads.shp".to_string(), roads.to_string()));
        entries.push(("analysis.gdb/elevzone.img".to_string(), "zones".to_string()));

        let borrowed: Vec<(&str, &str)> = entries
            .iter()
            .map(|(p, c)| (p.as_str(), c.as_str()))
            .collect();
        self.write(&borrowed).await
    }

    pub async fn create_aoi(&self, name: &str, bundle: &Path) -> Aoi {
        self.try_create_aoi(name, bundle).await.unwrap()
    }

    pub async fn try_create_aoi(&self, name: &str, bundle: &Path) -> AppResult<Aoi> {
        self.store
            .create_aoi(
                &self.ctx(),
                CreateAoiRequest {
                    name: name.to_string(),
                    source: DirectorySource::shared(bundle).await?,
                    boundary: None,
                    pourpoint: None,
                    parent_aoi_id: None,
                    comment: None,
                },
            )
            .await
    }

    pub async fn root(&self, aoi: &Aoi) -> Directory {
        self.store.aois.root_directory(aoi.id).await.unwrap()
    }

    /// The current child directory of `type_tag` under `parent`.
    pub async fn child_dir(&self, parent: Uuid, type_tag: &str) -> Directory {
        self.store
            .tree
            .current_child_of_type(parent, type_tag)
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("no current {type_tag} under {parent}"))
    }

    /// The current file called `name` under `parent`.
    pub async fn child_file(&self, parent: Uuid, name: &str) -> File {
        self.store
            .children(parent, None)
            .await
            .unwrap()
            .files
            .into_iter()
            .find(|f| f.name == name)
            .unwrap_or_else(|| panic!("no file {name} under {parent}"))
    }
}

/// Entries directly under `dir`; zero when it does not exist.
pub async fn entry_count(dir: &Path) -> usize {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return 0;
    };
    let mut count = 0;
    while entries.next_entry().await.unwrap().is_some() {
        count += 1;
    }
    count
}

/// Depth-first search for a file whose name starts with `prefix`.
pub fn find_file(root: &Path, prefix: &str) -> Option<PathBuf> {
    for entry in std::fs::read_dir(root).ok()? {
        let path = entry.ok()?.path();
        if path.is_dir() {
            if let Some(found) = find_file(&path, prefix) {
                return Some(found);
            }
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(prefix))
        {
            return Some(path);
        }
    }
    None
}

/// Which step of a [`FaultyVariant`] fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Content import, after the wrapped import finished.
    Import,
    /// The deactivation cleanup hook.
    Cleanup,
}

/// Wraps a registered variant and fails one step of it.
#[derive(Debug)]
pub struct FaultyVariant {
    inner: Arc<dyn NodeVariant>,
    fault: Fault,
}

impl FaultyVariant {
    /// A registry of the defaults with `type_tag` replaced by a faulty copy.
    pub fn registry(type_tag: &str, fault: Fault) -> NodeRegistry {
        let mut registry = NodeRegistry::with_defaults();
        let inner = registry.resolve(type_tag).unwrap();
        registry.register(Arc::new(Self { inner, fault }));
        registry
    }
}

#[async_trait]
impl NodeVariant for FaultyVariant {
    fn type_tag(&self) -> &'static str {
        self.inner.type_tag()
    }

    fn kind(&self) -> NodeKind {
        self.inner.kind()
    }

    fn plural_name(&self) -> &'static str {
        self.inner.plural_name()
    }

    fn archiving_rule(&self) -> ArchivingRule {
        self.inner.archiving_rule()
    }

    fn default_name(&self, parent: Option<&Directory>, input: &ContentInput) -> String {
        self.inner.default_name(parent, input)
    }

    fn filesystem_name(&self, dir: &Directory) -> String {
        self.inner.filesystem_name(dir)
    }

    async fn export_name(&self, tree: &TreeStore, dir: &Directory) -> AppResult<Option<String>> {
        self.inner.export_name(tree, dir).await
    }

    fn storage_extension(&self, file: &File) -> String {
        self.inner.storage_extension(file)
    }

    fn export_file_name(&self, file: &File) -> String {
        self.inner.export_file_name(file)
    }

    async fn import_content(
        &self,
        coordinator: &ImportCoordinator,
        ctx: &RequestContext,
        node: &Node,
        input: &ContentInput,
    ) -> AppResult<()> {
        self.inner.import_content(coordinator, ctx, node, input).await?;
        match self.fault {
            Fault::Import => Err(AppError::filesystem("No space left on device")),
            Fault::Cleanup => Ok(()),
        }
    }

    fn snapshot_tag(&self) -> Option<&'static str> {
        self.inner.snapshot_tag()
    }

    fn accepts_updates(&self) -> bool {
        self.inner.accepts_updates()
    }

    fn can_deactivate(&self, node: &Node) -> bool {
        self.inner.can_deactivate(node)
    }

    async fn cleanup(&self, node: &Node) -> AppResult<()> {
        match self.fault {
            Fault::Cleanup => Err(AppError::filesystem("Cleanup of external index failed")),
            Fault::Import => self.inner.cleanup(node).await,
        }
    }
}
