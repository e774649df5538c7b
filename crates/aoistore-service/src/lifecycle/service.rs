//! Lifecycle manager: soft removal, deactivation and destruction.
//!
//! Cascades always act on a post-order listing of the subtree, so children
//! are handled before their parent. Soft removal and deactivation commit
//! the whole subtree in one transaction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use aoistore_core::error::AppError;
use aoistore_core::result::AppResult;
use aoistore_core::traits::Clock;
use aoistore_entity::aoi::Aoi;
use aoistore_entity::node::{NodeLifecycle, NodeRef, NodeState};

use crate::context::RequestContext;
use crate::materializer::FilesystemMaterializer;
use crate::registry::NodeRegistry;
use crate::tree::{Node, TreeStore};

/// Moves nodes forward through current, removed, archived and destroyed.
#[derive(Debug, Clone)]
pub struct LifecycleManager {
    /// Tree store.
    tree: Arc<TreeStore>,
    /// Variant lookup for eligibility and cleanup hooks.
    registry: Arc<NodeRegistry>,
    /// On-disk removal.
    materializer: Arc<FilesystemMaterializer>,
    /// Default removal instant.
    clock: Arc<dyn Clock>,
}

impl LifecycleManager {
    /// Creates a new lifecycle manager.
    pub fn new(
        tree: Arc<TreeStore>,
        registry: Arc<NodeRegistry>,
        materializer: Arc<FilesystemMaterializer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tree,
            registry,
            materializer,
            clock,
        }
    }

    /// Stamps `removed_at` on the node and every descendant not yet removed.
    ///
    /// Nothing on disk is touched. Returns the number of rows stamped.
    pub async fn soft_remove(
        &self,
        ctx: &RequestContext,
        node: NodeRef,
        at: Option<DateTime<Utc>>,
    ) -> AppResult<u64> {
        let at = at.unwrap_or_else(|| self.clock.now());
        let nodes = self.tree.subtree(node).await?;
        let target = nodes
            .last()
            .ok_or_else(|| AppError::not_found(format!("{node} not found")))?;
        if at < target.created_at() {
            return Err(AppError::validation(format!(
                "Cannot remove {node} before it was created"
            )));
        }

        let refs: Vec<NodeRef> = nodes.iter().map(Node::node_ref).collect();
        let stamped = self.tree.tree.soft_remove(&refs, at).await?;
        info!(
            user = %ctx.username,
            node = %node,
            removed_at = %at,
            rows = stamped,
            "Subtree soft-removed"
        );
        Ok(stamped)
    }

    /// Marks the node and its descendants inactive.
    ///
    /// Every node must be eligible and every cleanup hook must succeed
    /// before anything is flipped; the flags are then written in one
    /// transaction, children first.
    pub async fn deactivate(&self, ctx: &RequestContext, node: NodeRef) -> AppResult<usize> {
        let nodes: Vec<Node> = self
            .tree
            .subtree(node)
            .await?
            .into_iter()
            .filter(|n| n.is_active())
            .collect();
        if nodes.is_empty() {
            return Ok(0);
        }

        let mut variants = Vec::with_capacity(nodes.len());
        for n in &nodes {
            let variant = self.registry.resolve(n.type_tag())?;
            if !variant.can_deactivate(n) {
                return Err(AppError::validation(format!(
                    "{} '{}' must be removed before it can be deactivated",
                    n.node_ref(),
                    n.name()
                )));
            }
            variants.push(variant);
        }

        for (n, variant) in nodes.iter().zip(&variants) {
            ctx.checkpoint()?;
            variant.cleanup(n).await.map_err(|e| {
                warn!(node = %n.node_ref(), error = %e, "Cleanup hook failed, deactivation aborted");
                e
            })?;
        }

        let refs: Vec<NodeRef> = nodes.iter().map(Node::node_ref).collect();
        self.tree.tree.deactivate(&refs).await?;
        info!(user = %ctx.username, node = %node, count = refs.len(), "Subtree deactivated");
        Ok(refs.len())
    }

    /// Destroys an archived node: database rows and on-disk content.
    pub async fn hard_delete(&self, ctx: &RequestContext, node: NodeRef) -> AppResult<()> {
        let loaded = self.tree.load(node).await?;
        if loaded.state() != NodeState::Archived {
            return Err(AppError::validation(format!(
                "{node} is {} and must be archived before deletion",
                loaded.state()
            )));
        }
        self.destroy(&loaded).await?;
        info!(user = %ctx.username, node = %node, "Node destroyed");
        Ok(())
    }

    /// Removes a node regardless of state. Used by hard deletion and by
    /// in-place replacement of NONE directories.
    pub(crate) async fn destroy(&self, node: &Node) -> AppResult<()> {
        match node {
            Node::Directory(dir) => {
                // Re-read so a path cached after loading is not missed.
                let dir = self.tree.directory(dir.id).await?;
                self.tree.directories.delete(dir.id).await?;
                self.materializer.remove_tree(&dir).await
            }
            Node::File(file) => {
                let versions = self.tree.versions(file.id).await?;
                self.tree.files.delete(file.id).await?;
                for version in versions {
                    self.materializer.remove_blob(&version.storage_path).await?;
                }
                Ok(())
            }
        }
    }

    /// Soft-removes an AOI and all its directories.
    pub async fn remove_aoi(
        &self,
        ctx: &RequestContext,
        aoi_id: Uuid,
        at: Option<DateTime<Utc>>,
    ) -> AppResult<Aoi> {
        let at = at.unwrap_or_else(|| self.clock.now());
        for root in self.tree.directories.find_roots(aoi_id).await? {
            self.soft_remove(ctx, root.node_ref(), Some(at)).await?;
        }
        self.tree.aois.mark_removed(aoi_id, at).await?;
        info!(user = %ctx.username, aoi_id = %aoi_id, "AOI removed");
        self.tree.aoi(aoi_id).await
    }

    /// Deactivates a removed AOI and all its directories.
    pub async fn deactivate_aoi(&self, ctx: &RequestContext, aoi_id: Uuid) -> AppResult<Aoi> {
        let aoi = self.tree.aoi(aoi_id).await?;
        if aoi.removed_at.is_none() {
            return Err(AppError::validation(format!(
                "AOI '{}' must be removed before it can be deactivated",
                aoi.name
            )));
        }
        for root in self.tree.directories.find_roots(aoi_id).await? {
            self.deactivate(ctx, root.node_ref()).await?;
        }
        self.tree.aois.deactivate(aoi_id).await?;
        info!(user = %ctx.username, aoi_id = %aoi_id, "AOI deactivated");
        self.tree.aoi(aoi_id).await
    }

    /// Destroys an archived AOI with all its content.
    pub async fn delete_aoi(&self, ctx: &RequestContext, aoi_id: Uuid) -> AppResult<()> {
        let aoi = self.tree.aoi(aoi_id).await?;
        if aoi.state() != NodeState::Archived {
            return Err(AppError::validation(format!(
                "AOI '{}' is {} and must be archived before deletion",
                aoi.name,
                aoi.state()
            )));
        }
        for root in self.tree.directories.find_roots(aoi_id).await? {
            self.destroy(&Node::Directory(root)).await?;
        }
        self.tree.aois.delete(aoi_id).await?;
        info!(user = %ctx.username, aoi_id = %aoi_id, "AOI destroyed");
        Ok(())
    }
}
