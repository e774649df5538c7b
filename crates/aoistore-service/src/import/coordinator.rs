//! Content import coordinator: atomic node creation with compensation.
//!
//! Creation runs in two phases. The record is inserted as provisional,
//! then its path is materialized and the variant imports its content. If
//! the second phase fails, the on-disk subtree and the record are removed
//! before the error is returned, so a node either exists completely in
//! both stores or not at all.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use aoistore_core::error::AppError;
use aoistore_core::result::AppResult;
use aoistore_core::traits::Clock;
use aoistore_entity::aoi::Aoi;
use aoistore_entity::directory::{ArchivingRule, CreateDirectory, Directory};
use aoistore_entity::file::{CreateFile, File};
use aoistore_entity::node::{NodeKind, NodeLifecycle, NodeStatus};

use crate::context::RequestContext;
use crate::import::source::SourceLayer;
use crate::materializer::FilesystemMaterializer;
use crate::registry::{ContentInput, NodeRegistry, NodeVariant};
use crate::tree::{Node, TreeStore};
use crate::version::VersionWriter;

/// Where a new directory goes.
#[derive(Debug, Clone, Copy)]
pub enum Placement<'a> {
    /// As the root directory of an AOI.
    AoiRoot(&'a Aoi),
    /// As a child of an existing directory.
    Under(&'a Directory),
}

/// Orchestrates node creation across the database and the filesystem.
#[derive(Debug, Clone)]
pub struct ImportCoordinator {
    /// Tree store.
    tree: Arc<TreeStore>,
    /// Variant lookup.
    registry: Arc<NodeRegistry>,
    /// Path creation and removal.
    materializer: Arc<FilesystemMaterializer>,
    /// Version blobs.
    versions: Arc<VersionWriter>,
    /// Time source for `created_at`.
    clock: Arc<dyn Clock>,
}

impl ImportCoordinator {
    /// Creates a new import coordinator.
    pub fn new(
        tree: Arc<TreeStore>,
        registry: Arc<NodeRegistry>,
        materializer: Arc<FilesystemMaterializer>,
        versions: Arc<VersionWriter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tree,
            registry,
            materializer,
            versions,
            clock,
        }
    }

    pub fn tree(&self) -> &TreeStore {
        &self.tree
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn versions(&self) -> &VersionWriter {
        &self.versions
    }

    /// The context's pinned instant, or the clock.
    pub fn now_for(&self, ctx: &RequestContext) -> DateTime<Utc> {
        ctx.instant().unwrap_or_else(|| self.clock.now())
    }

    /// Creates a node of any variant under `parent`.
    pub async fn create(
        &self,
        ctx: &RequestContext,
        type_tag: &str,
        parent: &Directory,
        input: &ContentInput,
        name: Option<&str>,
        comment: Option<&str>,
    ) -> AppResult<Node> {
        match self.registry.resolve(type_tag)?.kind() {
            NodeKind::Directory => self
                .create_directory(ctx, type_tag, Placement::Under(parent), input, name, comment)
                .await
                .map(Node::Directory),
            NodeKind::File => self
                .create_file(ctx, type_tag, parent, input.layer()?, name, comment)
                .await
                .map(Node::File),
        }
    }

    /// Creates the root directory of an AOI from its bundle.
    pub async fn create_root(
        &self,
        ctx: &RequestContext,
        aoi: &Aoi,
        input: &ContentInput,
    ) -> AppResult<Directory> {
        self.create_directory(
            ctx,
            "AOIDirectory",
            Placement::AoiRoot(aoi),
            input,
            Some(&aoi.shortname),
            aoi.comment.as_deref(),
        )
        .await
    }

    /// Creates a directory and imports its content.
    pub async fn create_directory(
        &self,
        ctx: &RequestContext,
        type_tag: &str,
        placement: Placement<'_>,
        input: &ContentInput,
        name: Option<&str>,
        comment: Option<&str>,
    ) -> AppResult<Directory> {
        ctx.checkpoint()?;
        let variant = self.registry.resolve_kind(type_tag, NodeKind::Directory)?;

        let (aoi_id, parent) = match placement {
            Placement::AoiRoot(aoi) => (aoi.id, None),
            Placement::Under(parent) => {
                ensure_writable(parent)?;
                (parent.aoi_id, Some(parent))
            }
        };
        let name = match name {
            Some(n) => n.to_string(),
            None => variant.default_name(parent, input),
        };
        validate_name(&name)?;

        // Name check before anything is written. Files and directories
        // share one namespace per parent.
        let taken = match parent {
            Some(p) => self.name_taken(p.id, &name).await?,
            None => self
                .tree
                .directories
                .find_roots(aoi_id)
                .await?
                .iter()
                .any(|d| d.is_active() && d.removed_at.is_none()),
        };
        if taken {
            return Err(AppError::conflict(format!(
                "A node named '{name}' already exists here"
            )));
        }

        let record = CreateDirectory {
            id: Uuid::new_v4(),
            aoi_id,
            parent_id: parent.map(|p| p.id),
            name,
            type_tag: variant.type_tag().to_string(),
            archiving_rule: variant.archiving_rule(),
            comment: comment.map(String::from),
            created_by: ctx.username.clone(),
            created_at: self.now_for(ctx),
        };
        let dir = self.tree.directories.insert_provisional(&record).await?;
        info!(
            directory_id = %dir.id,
            type_tag = %dir.type_tag,
            name = %dir.name,
            parent_id = ?dir.parent_id,
            "Directory record created"
        );

        match self.populate_directory(ctx, variant.as_ref(), dir.clone(), input).await {
            Ok(created) => Ok(created),
            Err(e) => {
                self.discard_directory(dir.id, &e).await;
                Err(AppError::partial_import(e))
            }
        }
    }

    async fn populate_directory(
        &self,
        ctx: &RequestContext,
        variant: &dyn NodeVariant,
        dir: Directory,
        input: &ContentInput,
    ) -> AppResult<Directory> {
        let path = self.materializer.resolve_path(&dir).await?;
        let mut dir = Directory {
            fs_path: Some(path),
            ..dir
        };
        ctx.checkpoint()?;
        variant
            .import_content(self, ctx, &Node::Directory(dir.clone()), input)
            .await?;

        self.tree.directories.finalize(dir.id).await?;
        dir.status = NodeStatus::Finalized;
        info!(directory_id = %dir.id, type_tag = %dir.type_tag, "Directory finalized");
        Ok(dir)
    }

    /// Removes a half-created directory from disk and database.
    async fn discard_directory(&self, id: Uuid, cause: &AppError) {
        warn!(directory_id = %id, error = %cause, "Directory import failed, rolling back");
        let dir = match self.tree.directories.find_by_id(id).await {
            Ok(Some(dir)) => dir,
            Ok(None) => return,
            Err(e) => {
                error!(directory_id = %id, error = %e, "Rollback could not load directory");
                return;
            }
        };
        if let Err(e) = self.materializer.remove_tree(&dir).await {
            error!(directory_id = %id, error = %e, "Rollback failed to remove directory tree");
        }
        if let Err(e) = self.tree.directories.delete(id).await {
            error!(directory_id = %id, error = %e, "Rollback failed to delete directory record");
        }
    }

    /// Creates a file and stores its first version.
    pub async fn create_file(
        &self,
        ctx: &RequestContext,
        type_tag: &str,
        parent: &Directory,
        layer: &SourceLayer,
        name: Option<&str>,
        comment: Option<&str>,
    ) -> AppResult<File> {
        ctx.checkpoint()?;
        let variant = self.registry.resolve_kind(type_tag, NodeKind::File)?;
        ensure_writable(parent)?;

        let input = ContentInput::Layer(layer.clone());
        let name = match name {
            Some(n) => n.to_string(),
            None => variant.default_name(Some(parent), &input),
        };
        validate_name(&name)?;

        if self.name_taken(parent.id, &name).await? {
            return Err(AppError::conflict(format!(
                "A node named '{name}' already exists here"
            )));
        }

        let record = CreateFile {
            id: Uuid::new_v4(),
            aoi_id: parent.aoi_id,
            directory_id: parent.id,
            name,
            type_tag: variant.type_tag().to_string(),
            comment: comment.map(String::from),
            created_by: ctx.username.clone(),
            created_at: self.now_for(ctx),
        };
        let file = self.tree.files.insert_provisional(&record).await?;
        info!(file_id = %file.id, type_tag = %file.type_tag, name = %file.name, "File record created");

        let populated = async {
            variant
                .import_content(self, ctx, &Node::File(file.clone()), &input)
                .await?;
            self.tree.files.finalize(file.id).await
        };
        match populated.await {
            Ok(()) => Ok(File {
                status: NodeStatus::Finalized,
                ..file
            }),
            Err(e) => {
                self.discard_file(file.id, &e).await;
                Err(AppError::partial_import(e))
            }
        }
    }

    /// Whether a current directory or file under `parent_id` uses `name`.
    async fn name_taken(&self, parent_id: Uuid, name: &str) -> AppResult<bool> {
        if self.tree.directories.find_current_child(parent_id, name).await?.is_some() {
            return Ok(true);
        }
        Ok(self.tree.files.find_current_by_name(parent_id, name).await?.is_some())
    }

    /// Removes a half-created file's blobs and record.
    async fn discard_file(&self, id: Uuid, cause: &AppError) {
        warn!(file_id = %id, error = %cause, "File import failed, rolling back");
        match self.tree.files.find_versions(id).await {
            Ok(versions) => {
                for version in versions {
                    if let Err(e) = self.materializer.remove_blob(&version.storage_path).await {
                        error!(file_id = %id, path = %version.storage_path, error = %e, "Rollback failed to remove blob");
                    }
                }
            }
            Err(e) => error!(file_id = %id, error = %e, "Rollback could not list versions"),
        }
        if let Err(e) = self.tree.files.delete(id).await {
            error!(file_id = %id, error = %e, "Rollback failed to delete file record");
        }
    }
}

/// New children need a live parent, and finalized READONLY or GROUP
/// directories never gain content.
fn ensure_writable(parent: &Directory) -> AppResult<()> {
    if !parent.active || parent.removed_at.is_some() {
        return Err(AppError::validation(format!(
            "Directory {} is no longer current",
            parent.id
        )));
    }
    if parent.status == NodeStatus::Finalized
        && matches!(parent.archiving_rule, ArchivingRule::ReadOnly | ArchivingRule::Group)
    {
        return Err(AppError::read_only(format!(
            "Directory '{}' is {} and cannot gain content",
            parent.name, parent.archiving_rule
        )));
    }
    Ok(())
}

pub(crate) fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::validation("Node name cannot be empty"));
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(AppError::validation(format!("Invalid node name '{name}'")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Fixture, t};
    use aoistore_core::error::ErrorKind;

    #[tokio::test]
    async fn test_create_layers_directory_with_files() {
        let fx = Fixture::new().await;
        fx.clock.set_seconds(10);
        let root = fx.root_directory("Basin1").await;
        let source = fx.bundle(&[("layers.gdb/roads.shp", "V1"), ("layers.gdb/streams.shp", "S1")]).await;
        let input = ContentInput::Source(source.child("layers.gdb").await.unwrap().unwrap());

        let layers = fx
            .coordinator
            .create_directory(&fx.ctx(), "Layers", Placement::Under(&root), &input, None, None)
            .await
            .unwrap();
        assert_eq!(layers.name, "layers");
        assert_eq!(layers.archiving_rule, ArchivingRule::Individual);
        assert_eq!(layers.status, NodeStatus::Finalized);

        let files = fx.tree.children(layers.id, None).await.unwrap().files;
        assert_eq!(files.len(), 2);
        let roads = files.iter().find(|f| f.name == "roads").unwrap();
        let versions = fx.tree.versions(roads.id).await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].created_at, roads.created_at);
        assert_eq!(
            fx.storage.read_bytes(&versions[0].storage_path).await.unwrap().as_ref(),
            b"V1"
        );
        assert!(versions[0].storage_path.ends_with(&format!("{}.shp", versions[0].id)));
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts_without_side_effects() {
        let fx = Fixture::new().await;
        let root = fx.root_directory("Basin1").await;
        let root_path = fx.materializer.resolve_path(&root).await.unwrap();
        let source = fx.bundle(&[("layers.gdb/roads.shp", "V1")]).await;
        let input = ContentInput::Source(source.child("layers.gdb").await.unwrap().unwrap());

        fx.coordinator
            .create_directory(&fx.ctx(), "Layers", Placement::Under(&root), &input, None, None)
            .await
            .unwrap();
        let before = fx.storage.list(&root_path).await.unwrap().len();

        let err = fx
            .coordinator
            .create_directory(&fx.ctx(), "Layers", Placement::Under(&root), &input, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
        assert_eq!(fx.storage.list(&root_path).await.unwrap().len(), before);
        assert_eq!(fx.tree.all_children(root.id).await.unwrap().directories.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_child_rolls_back_parent() {
        let fx = Fixture::new().await;
        let root = fx.root_directory("Basin1").await;
        // zone without its geodatabase fails inside HRUZonesData
        let source = fx.bundle(&[("zones/elev/log.xml", "<log/>")]).await;
        let input = ContentInput::Source(source.child("zones").await.unwrap().unwrap());

        let err = fx
            .coordinator
            .create_directory(&fx.ctx(), "Zones", Placement::Under(&root), &input, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::PartialImport);
        assert_eq!(err.root_kind(), ErrorKind::Validation);

        assert!(fx.tree.all_children(root.id).await.unwrap().is_empty());
        let root_path = fx.tree.directory(root.id).await.unwrap().fs_path.unwrap();
        assert!(fx.storage.list(&root_path).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_before_insert_leaves_nothing() {
        let fx = Fixture::new().await;
        let root = fx.root_directory("Basin1").await;
        let source = fx.bundle(&[("layers.gdb/roads.shp", "V1")]).await;
        let input = ContentInput::Source(source.child("layers.gdb").await.unwrap().unwrap());
        let ctx = fx.ctx();
        ctx.cancellation().cancel();

        let err = fx
            .coordinator
            .create_directory(&ctx, "Layers", Placement::Under(&root), &input, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Cancelled);
        assert!(fx.tree.all_children(root.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_readonly_parent_rejects_new_children() {
        let fx = Fixture::new().await;
        let root = fx.root_directory("Basin1").await;
        let source = fx.bundle(&[("surfaces.gdb/dem_filled.img", "D"), ("extra/x.img", "X")]).await;
        let surfaces = fx
            .coordinator
            .create_directory(
                &fx.ctx(),
                "Surfaces",
                Placement::Under(&root),
                &ContentInput::Source(source.child("surfaces.gdb").await.unwrap().unwrap()),
                None,
                None,
            )
            .await
            .unwrap();

        let extra = source.child("extra").await.unwrap().unwrap();
        let layer = extra.layer("x.img").await.unwrap().unwrap();
        let err = fx
            .coordinator
            .create_file(&fx.ctx(), "Raster", &surfaces, &layer, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ReadOnly);
    }

    #[tokio::test]
    async fn test_unknown_variant_is_configuration_error() {
        let fx = Fixture::new().await;
        let root = fx.root_directory("Basin1").await;
        let source = fx.bundle(&[("a/b.txt", "x")]).await;
        let err = fx
            .coordinator
            .create(&fx.ctx(), "Folder", &root, &ContentInput::Source(source), None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_files_and_directories_share_sibling_names() {
        let fx = Fixture::new().await;
        let root = fx.root_directory("Basin1").await;
        let source = fx.bundle(&[("roads/a.txt", "x"), ("loose/a.txt", "y")]).await;
        let loose = source.child("loose").await.unwrap().unwrap();
        let layer = loose.layer("a.txt").await.unwrap().unwrap();

        fx.coordinator
            .create_directory(
                &fx.ctx(),
                "Directory",
                Placement::Under(&root),
                &ContentInput::Source(source.child("roads").await.unwrap().unwrap()),
                None,
                None,
            )
            .await
            .unwrap();
        let err = fx
            .coordinator
            .create_file(&fx.ctx(), "File", &root, &layer, Some("roads"), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        fx.coordinator
            .create_file(&fx.ctx(), "File", &root, &layer, Some("streams"), None)
            .await
            .unwrap();
        let err = fx
            .coordinator
            .create_directory(
                &fx.ctx(),
                "Directory",
                Placement::Under(&root),
                &ContentInput::Source(loose),
                Some("streams"),
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);

        let children = fx.tree.all_children(root.id).await.unwrap();
        assert_eq!(children.directories.len(), 1);
        assert_eq!(children.files.len(), 1);
    }
}
