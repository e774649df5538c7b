//! The content store facade wiring every service over one pool.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use aoistore_core::config::AppConfig;
use aoistore_core::result::AppResult;
use aoistore_core::traits::{Clock, StorageProvider};
use aoistore_entity::aoi::Aoi;
use aoistore_entity::file::FileData;
use aoistore_entity::node::NodeRef;
use aoistore_storage::LocalStorageProvider;

use crate::aoi::{AoiService, CreateAoiRequest, NearestPourPointMatcher};
use crate::archive::{ArchivingPolicyEngine, UpdateOutcome};
use crate::context::RequestContext;
use crate::export::{ExportReport, SnapshotExportEngine};
use crate::import::{ContentSource, ImportCoordinator, SourceLayer};
use crate::lifecycle::LifecycleManager;
use crate::materializer::FilesystemMaterializer;
use crate::registry::{ContentInput, NodeRegistry};
use crate::tree::{Children, Node, TreeStore};
use crate::url::UrlResolver;
use crate::version::{AppendOutcome, VersionWriter};

/// Every service of the store, built once and shared.
#[derive(Debug, Clone)]
pub struct ContentStore {
    // ── Configuration ────────────────────────────────────────
    /// Application configuration
    pub config: Arc<AppConfig>,

    // ── Infrastructure ───────────────────────────────────────
    /// SQLite connection pool
    pub pool: SqlitePool,
    /// Storage rooted at `storage.data_root`
    pub storage: Arc<dyn StorageProvider>,
    /// Source of `created_at` and default query instants
    pub clock: Arc<dyn Clock>,

    // ── Tree ─────────────────────────────────────────────────
    pub tree: Arc<TreeStore>,
    pub registry: Arc<NodeRegistry>,
    pub materializer: Arc<FilesystemMaterializer>,

    // ── Services ─────────────────────────────────────────────
    pub coordinator: Arc<ImportCoordinator>,
    pub lifecycle: Arc<LifecycleManager>,
    pub policy: Arc<ArchivingPolicyEngine>,
    pub exporter: Arc<SnapshotExportEngine>,
    pub aois: Arc<AoiService>,
    pub urls: Arc<UrlResolver>,
}

impl ContentStore {
    /// Builds the store with the well-known variants.
    pub async fn open(config: &AppConfig, pool: SqlitePool, clock: Arc<dyn Clock>) -> AppResult<Self> {
        Self::with_registry(config, pool, clock, NodeRegistry::with_defaults()).await
    }

    /// Builds the store with a custom variant registry.
    pub async fn with_registry(
        config: &AppConfig,
        pool: SqlitePool,
        clock: Arc<dyn Clock>,
        registry: NodeRegistry,
    ) -> AppResult<Self> {
        let storage: Arc<dyn StorageProvider> =
            Arc::new(LocalStorageProvider::new(config.storage.data_root_path()).await?);
        let registry = Arc::new(registry);
        let tree = Arc::new(TreeStore::from_pool(pool.clone()));

        let materializer = Arc::new(FilesystemMaterializer::new(
            storage.clone(),
            tree.directories.clone(),
            registry.clone(),
            config.storage.aoi_dir.clone(),
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
        let exporter = Arc::new(SnapshotExportEngine::new(
            tree.clone(),
            registry.clone(),
            storage.clone(),
            clock.clone(),
        ));
        let matcher = Arc::new(NearestPourPointMatcher::new(tree.aois.clone(), clock.clone()));
        let aois = Arc::new(AoiService::new(
            tree.clone(),
            coordinator.clone(),
            matcher,
            clock.clone(),
        ));
        let urls = Arc::new(UrlResolver::new(&config.app.public_url, registry.clone()));

        info!(
            data_root = %config.storage.data_root,
            variants = registry.tags().len(),
            "Content store ready"
        );

        Ok(Self {
            config: Arc::new(config.clone()),
            pool,
            storage,
            clock,
            tree,
            registry,
            materializer,
            coordinator,
            lifecycle,
            policy,
            exporter,
            aois,
            urls,
        })
    }

    /// Creates a node of `type_tag` under `parent_id` from `input`.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        type_tag: &str,
        parent_id: Uuid,
        input: &ContentInput,
        name: Option<&str>,
        comment: Option<&str>,
    ) -> AppResult<Node> {
        let parent = self.tree.directory(parent_id).await?;
        self.coordinator
            .create(ctx, type_tag, &parent, input, name, comment)
            .await
    }

    pub async fn create_aoi(&self, ctx: &RequestContext, req: CreateAoiRequest) -> AppResult<Aoi> {
        self.aois.create_aoi(ctx, req).await
    }

    /// Applies the directory's archiving rule to new content.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        directory_id: Uuid,
        source: Arc<dyn ContentSource>,
    ) -> AppResult<UpdateOutcome> {
        self.policy.update(ctx, directory_id, source).await
    }

    pub async fn append_version(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
        layer: &SourceLayer,
        comment: Option<&str>,
    ) -> AppResult<AppendOutcome> {
        self.policy.append_version(ctx, file_id, layer, comment).await
    }

    /// Writes `node` as it was at `as_of` (default now) into `output_dir`.
    pub async fn export(
        &self,
        ctx: &RequestContext,
        node: NodeRef,
        output_dir: &Path,
        as_of: Option<DateTime<Utc>>,
    ) -> AppResult<ExportReport> {
        self.exporter.export(ctx, node, output_dir, as_of).await
    }

    pub async fn soft_remove(
        &self,
        ctx: &RequestContext,
        node: NodeRef,
        at: Option<DateTime<Utc>>,
    ) -> AppResult<u64> {
        self.lifecycle.soft_remove(ctx, node, at).await
    }

    pub async fn deactivate(&self, ctx: &RequestContext, node: NodeRef) -> AppResult<usize> {
        self.lifecycle.deactivate(ctx, node).await
    }

    pub async fn hard_delete(&self, ctx: &RequestContext, node: NodeRef) -> AppResult<()> {
        self.lifecycle.hard_delete(ctx, node).await
    }

    pub async fn remove_aoi(
        &self,
        ctx: &RequestContext,
        aoi_id: Uuid,
        at: Option<DateTime<Utc>>,
    ) -> AppResult<Aoi> {
        self.lifecycle.remove_aoi(ctx, aoi_id, at).await
    }

    pub async fn deactivate_aoi(&self, ctx: &RequestContext, aoi_id: Uuid) -> AppResult<Aoi> {
        self.lifecycle.deactivate_aoi(ctx, aoi_id).await
    }

    pub async fn delete_aoi(&self, ctx: &RequestContext, aoi_id: Uuid) -> AppResult<()> {
        self.lifecycle.delete_aoi(ctx, aoi_id).await
    }

    /// Stable external URL of a node.
    pub async fn resolve_url(&self, node: NodeRef) -> AppResult<String> {
        let loaded = self.tree.load(node).await?;
        self.urls.resolve(&loaded)
    }

    pub async fn node(&self, node: NodeRef) -> AppResult<Node> {
        self.tree.load(node).await
    }

    /// Children current now, or visible at `as_of`.
    pub async fn children(
        &self,
        directory_id: Uuid,
        as_of: Option<DateTime<Utc>>,
    ) -> AppResult<Children> {
        self.tree.directory(directory_id).await?;
        self.tree.children(directory_id, as_of).await
    }

    pub async fn versions(&self, file_id: Uuid) -> AppResult<Vec<FileData>> {
        self.tree.file(file_id).await?;
        self.tree.versions(file_id).await
    }

    pub async fn aois(&self) -> AppResult<Vec<Aoi>> {
        self.aois.list().await
    }

    pub async fn aoi(&self, aoi_id: Uuid) -> AppResult<Aoi> {
        self.aois.get(aoi_id).await
    }

    pub async fn child_aois(&self, aoi_id: Uuid) -> AppResult<Vec<Aoi>> {
        self.aois.child_aois(aoi_id).await
    }
}
