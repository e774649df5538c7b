//! Archiving policy engine: how existing content takes an update.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use aoistore_core::error::AppError;
use aoistore_core::result::AppResult;
use aoistore_entity::directory::{ArchivingRule, Directory};
use aoistore_entity::file::{File, FileData};
use aoistore_entity::node::{NodeKind, NodeLifecycle, NodeRef};

use crate::context::RequestContext;
use crate::import::coordinator::{ImportCoordinator, Placement};
use crate::import::source::{ContentSource, SourceLayer};
use crate::lifecycle::LifecycleManager;
use crate::registry::{ContentInput, file_tag_for};
use crate::tree::Node;
use crate::version::AppendOutcome;

/// What an update did.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum UpdateOutcome {
    /// NONE: children were replaced in place.
    Replaced {
        directory: Directory,
        removed: usize,
    },
    /// GROUP: a new snapshot sibling now holds the content.
    Snapshot {
        previous: Option<Uuid>,
        snapshot: Directory,
    },
    /// INDIVIDUAL: matching files gained versions, new layers became files.
    Versioned {
        added: Vec<FileData>,
        unchanged: usize,
        created: Vec<File>,
    },
}

/// Applies each directory's archiving rule to updates and version appends.
#[derive(Debug, Clone)]
pub struct ArchivingPolicyEngine {
    /// Node creation.
    coordinator: Arc<ImportCoordinator>,
    /// Destruction of replaced content.
    lifecycle: Arc<LifecycleManager>,
}

impl ArchivingPolicyEngine {
    /// Creates a new policy engine.
    pub fn new(coordinator: Arc<ImportCoordinator>, lifecycle: Arc<LifecycleManager>) -> Self {
        Self {
            coordinator,
            lifecycle,
        }
    }

    /// Updates a directory from a new bundle according to its rule.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        directory_id: Uuid,
        source: Arc<dyn ContentSource>,
    ) -> AppResult<UpdateOutcome> {
        let tree = self.coordinator.tree();
        let dir = tree.directory(directory_id).await?;
        if !dir.is_current() {
            return Err(AppError::validation(format!(
                "Directory {directory_id} is not current and cannot be updated"
            )));
        }

        let variant = self.coordinator.registry().resolve(&dir.type_tag)?;
        if !variant.accepts_updates() {
            return Err(AppError::validation(format!(
                "{} directories cannot be updated; update their components instead",
                dir.type_tag
            )));
        }
        let input = ContentInput::Source(source);

        if let Some(snapshot_tag) = variant.snapshot_tag() {
            return self.replace_snapshot(ctx, &dir, snapshot_tag, &input).await;
        }

        match dir.archiving_rule {
            ArchivingRule::ReadOnly => Err(AppError::read_only(format!(
                "'{}' ({}) is read-only",
                dir.name, dir.type_tag
            ))),
            ArchivingRule::Group => {
                let parent_id = dir.parent_id.ok_or_else(|| {
                    AppError::internal(format!("GROUP directory {} has no container", dir.id))
                })?;
                let container = tree.directory(parent_id).await?;
                self.replace_snapshot(ctx, &container, variant.type_tag(), &input)
                    .await
            }
            ArchivingRule::None => self.replace_in_place(ctx, dir, &input).await,
            ArchivingRule::Individual => self.version_each(ctx, &dir, &input).await,
        }
    }

    /// GROUP: retire the current snapshot and create its successor.
    ///
    /// The old snapshot is soft-removed at the instant the new one is
    /// created, and everything the new one holds carries that same instant.
    /// If the new one cannot be imported the removal is undone.
    async fn replace_snapshot(
        &self,
        ctx: &RequestContext,
        container: &Directory,
        snapshot_tag: &str,
        input: &ContentInput,
    ) -> AppResult<UpdateOutcome> {
        let tree = self.coordinator.tree();
        let current = tree.current_child_of_type(container.id, snapshot_tag).await?;
        let at = self.coordinator.now_for(ctx);
        let pinned = ctx.clone().at_instant(at);

        let retired: Vec<NodeRef> = match &current {
            Some(snapshot) => {
                let refs: Vec<NodeRef> = tree
                    .subtree(snapshot.node_ref())
                    .await?
                    .iter()
                    .map(Node::node_ref)
                    .collect();
                tree.tree.soft_remove(&refs, at).await?;
                refs
            }
            None => Vec::new(),
        };

        let created = self
            .coordinator
            .create_directory(
                &pinned,
                snapshot_tag,
                Placement::Under(container),
                input,
                current.as_ref().map(|s| s.name.as_str()),
                None,
            )
            .await;

        match created {
            Ok(snapshot) => {
                info!(
                    container_id = %container.id,
                    previous = ?current.as_ref().map(|s| s.id),
                    snapshot_id = %snapshot.id,
                    "Snapshot replaced"
                );
                Ok(UpdateOutcome::Snapshot {
                    previous: current.map(|s| s.id),
                    snapshot,
                })
            }
            Err(e) => {
                if !retired.is_empty() {
                    if let Err(restore) = tree.tree.clear_removal(&retired, at).await {
                        error!(container_id = %container.id, error = %restore, "Failed to restore previous snapshot");
                    }
                }
                Err(e)
            }
        }
    }

    /// NONE: retire the current children and import again into the same
    /// directory.
    ///
    /// Retired children are soft-removed at the update instant, so exports
    /// of earlier instants still find them. If the import fails, whatever
    /// it created is destroyed and the retired children are restored.
    async fn replace_in_place(
        &self,
        ctx: &RequestContext,
        dir: Directory,
        input: &ContentInput,
    ) -> AppResult<UpdateOutcome> {
        let tree = self.coordinator.tree();
        let at = self.coordinator.now_for(ctx);
        let pinned = ctx.clone().at_instant(at);

        let before = tree.all_children(dir.id).await?;
        let known: HashSet<Uuid> = before
            .directories
            .iter()
            .map(|d| d.id)
            .chain(before.files.iter().map(|f| f.id))
            .collect();

        let current = tree.children(dir.id, None).await?;
        let removed = current.directories.len() + current.files.len();
        let mut retired = Vec::new();
        let tops = current
            .directories
            .iter()
            .map(|d| NodeRef::directory(d.id))
            .chain(current.files.iter().map(|f| NodeRef::file(f.id)));
        for top in tops {
            retired.extend(tree.subtree(top).await?.iter().map(Node::node_ref));
        }
        tree.tree.soft_remove(&retired, at).await?;

        let variant = self.coordinator.registry().resolve(&dir.type_tag)?;
        let imported = variant
            .import_content(&self.coordinator, &pinned, &Node::Directory(dir.clone()), input)
            .await;

        if let Err(e) = imported {
            warn!(directory_id = %dir.id, error = %e, "Replacement failed, restoring previous content");
            self.discard_new_children(dir.id, &known).await;
            if let Err(restore) = tree.tree.clear_removal(&retired, at).await {
                error!(directory_id = %dir.id, error = %restore, "Failed to restore previous content");
            }
            return Err(AppError::partial_import(e));
        }

        info!(directory_id = %dir.id, removed, "Directory content replaced");
        Ok(UpdateOutcome::Replaced {
            directory: dir,
            removed,
        })
    }

    /// Destroys children of `dir_id` that are not in `known`.
    async fn discard_new_children(&self, dir_id: Uuid, known: &HashSet<Uuid>) {
        let children = match self.coordinator.tree().all_children(dir_id).await {
            Ok(children) => children,
            Err(e) => {
                error!(directory_id = %dir_id, error = %e, "Rollback could not list children");
                return;
            }
        };
        let fresh = children
            .files
            .into_iter()
            .map(Node::File)
            .chain(children.directories.into_iter().map(Node::Directory))
            .filter(|n| !known.contains(&n.id()));
        for node in fresh {
            if let Err(e) = self.lifecycle.destroy(&node).await {
                error!(node = %node.node_ref(), error = %e, "Rollback failed to destroy new child");
            }
        }
    }

    /// INDIVIDUAL: new versions for known layers, new files for the rest.
    async fn version_each(
        &self,
        ctx: &RequestContext,
        dir: &Directory,
        input: &ContentInput,
    ) -> AppResult<UpdateOutcome> {
        let tree = self.coordinator.tree();
        let registry = self.coordinator.registry();
        let mut added = Vec::new();
        let mut created = Vec::new();
        let mut unchanged = 0;

        for layer in input.source()?.layers().await? {
            ctx.checkpoint()?;
            let tag = file_tag_for(layer.kind);
            let name = registry
                .resolve_kind(tag, NodeKind::File)?
                .default_name(Some(dir), &ContentInput::Layer(layer.clone()));

            match tree.files.find_current_by_name(dir.id, &name).await? {
                Some(file) => match self.append_to(ctx, &file, dir, &layer, None).await? {
                    AppendOutcome::Added(v) => added.push(v),
                    AppendOutcome::Unchanged(_) => unchanged += 1,
                },
                None => {
                    created.push(
                        self.coordinator
                            .create_file(ctx, tag, dir, &layer, None, None)
                            .await?,
                    );
                }
            }
        }

        info!(
            directory_id = %dir.id,
            added = added.len(),
            created = created.len(),
            unchanged,
            "Directory versioned"
        );
        Ok(UpdateOutcome::Versioned {
            added,
            unchanged,
            created,
        })
    }

    /// Adds a version to a file whose parent permits it.
    pub async fn append_version(
        &self,
        ctx: &RequestContext,
        file_id: Uuid,
        layer: &SourceLayer,
        comment: Option<&str>,
    ) -> AppResult<AppendOutcome> {
        let tree = self.coordinator.tree();
        let file = tree.file(file_id).await?;
        if !file.is_current() {
            return Err(AppError::validation(format!(
                "File {file_id} is not current and cannot gain versions"
            )));
        }
        let parent = tree.directory(file.directory_id).await?;
        self.append_to(ctx, &file, &parent, layer, comment).await
    }

    async fn append_to(
        &self,
        ctx: &RequestContext,
        file: &File,
        parent: &Directory,
        layer: &SourceLayer,
        comment: Option<&str>,
    ) -> AppResult<AppendOutcome> {
        if !parent.archiving_rule.allows_file_versions() {
            return Err(AppError::read_only(format!(
                "Files in '{}' ({}) cannot gain versions",
                parent.name, parent.archiving_rule
            )));
        }
        let variant = self.coordinator.registry().resolve(&file.type_tag)?;
        self.coordinator
            .versions()
            .append(
                ctx,
                file,
                parent,
                layer,
                &variant.storage_extension(file),
                self.coordinator.now_for(ctx),
                comment,
            )
            .await
    }
}
