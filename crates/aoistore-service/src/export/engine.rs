//! Snapshot export: reconstructs a subtree as it was at an instant.
//!
//! The engine only reads the tree. Directories are walked with an explicit
//! stack; at each level only the nodes visible at `as_of` are exported and,
//! among GROUP snapshots sharing a name, only the newest visible one.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use aoistore_core::error::AppError;
use aoistore_core::result::AppResult;
use aoistore_core::traits::{Clock, StorageProvider};
use aoistore_entity::directory::Directory;
use aoistore_entity::file::{File, FileData};
use aoistore_entity::node::{NodeLifecycle, NodeRef};

use crate::context::RequestContext;
use crate::registry::NodeRegistry;
use crate::tree::{Node, TreeStore};

/// The version of a file in effect at `as_of`: the newest one created at or
/// before it, later insertion winning a tie.
pub fn select_version(versions: &[FileData], as_of: DateTime<Utc>) -> Option<&FileData> {
    versions
        .iter()
        .filter(|v| v.created_at <= as_of)
        .max_by_key(|v| (v.created_at, v.seq))
}

/// Children to descend into: every non-GROUP directory, and for each name
/// the newest GROUP snapshot.
pub fn select_directories(mut candidates: Vec<Directory>) -> Vec<Directory> {
    let mut latest: HashMap<String, Directory> = HashMap::new();
    let mut selected = Vec::new();

    for dir in candidates.drain(..) {
        if !dir.archiving_rule.is_timestamped() {
            selected.push(dir);
            continue;
        }
        match latest.get(&dir.name) {
            Some(existing) if existing.created_at >= dir.created_at => {}
            _ => {
                latest.insert(dir.name.clone(), dir);
            }
        }
    }

    selected.extend(latest.into_values());
    selected.sort_by(|a, b| a.name.cmp(&b.name));
    selected
}

/// Summary of a finished export.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExportReport {
    /// Top-level path written.
    pub path: PathBuf,
    /// Instant reconstructed.
    pub as_of: DateTime<Utc>,
    /// Files copied.
    pub files: usize,
    /// Bytes copied.
    pub bytes: u64,
}

/// Copies selected versions out of the store.
#[derive(Debug, Clone)]
pub struct SnapshotExportEngine {
    /// Tree store.
    tree: Arc<TreeStore>,
    /// Variant lookup for export naming.
    registry: Arc<NodeRegistry>,
    /// Blob source.
    storage: Arc<dyn StorageProvider>,
    /// Present instant for future-query checks.
    clock: Arc<dyn Clock>,
}

impl SnapshotExportEngine {
    /// Creates a new export engine.
    pub fn new(
        tree: Arc<TreeStore>,
        registry: Arc<NodeRegistry>,
        storage: Arc<dyn StorageProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tree,
            registry,
            storage,
            clock,
        }
    }

    /// Exports `node` into `output_dir` as it was at `as_of` (default now).
    pub async fn export(
        &self,
        ctx: &RequestContext,
        node: NodeRef,
        output_dir: &Path,
        as_of: Option<DateTime<Utc>>,
    ) -> AppResult<ExportReport> {
        let now = self.clock.now();
        let as_of = as_of.unwrap_or(now);
        if as_of > now {
            return Err(AppError::temporal_query(format!(
                "Cannot export {node} as of {as_of}: that is in the future"
            )));
        }

        let report = match self.tree.load(node).await? {
            Node::File(file) => {
                if !file.visible_at(as_of) {
                    return Err(AppError::not_found(format!(
                        "File '{}' was not visible at {as_of}",
                        file.name
                    )));
                }
                self.export_file(ctx, &file, output_dir, as_of).await?
            }
            Node::Directory(dir) => {
                if as_of < dir.created_at {
                    return Err(AppError::temporal_query(format!(
                        "Directory '{}' did not exist at {as_of}",
                        dir.name
                    )));
                }
                if !dir.visible_at(as_of) {
                    return Err(AppError::not_found(format!(
                        "Directory '{}' was not visible at {as_of}",
                        dir.name
                    )));
                }
                self.export_directory(ctx, dir, output_dir, as_of).await?
            }
        };

        info!(
            user = %ctx.username,
            node = %node,
            as_of = %as_of,
            path = %report.path.display(),
            files = report.files,
            bytes = report.bytes,
            "Export completed"
        );
        Ok(report)
    }

    async fn export_file(
        &self,
        ctx: &RequestContext,
        file: &File,
        output_dir: &Path,
        as_of: DateTime<Utc>,
    ) -> AppResult<ExportReport> {
        let versions = self.tree.versions(file.id).await?;
        let version = select_version(&versions, as_of).ok_or_else(|| {
            AppError::not_found(format!("File '{}' has no version at {as_of}", file.name))
        })?;

        ctx.checkpoint()?;
        let variant = self.registry.resolve(&file.type_tag)?;
        let dest = output_dir.join(variant.export_file_name(file));
        let bytes = self.storage.copy_out(&version.storage_path, &dest).await?;
        Ok(ExportReport {
            path: dest,
            as_of,
            files: 1,
            bytes,
        })
    }

    async fn export_directory(
        &self,
        ctx: &RequestContext,
        dir: Directory,
        output_dir: &Path,
        as_of: DateTime<Utc>,
    ) -> AppResult<ExportReport> {
        let variant = self.registry.resolve(&dir.type_tag)?;
        let target = match variant.export_name(&self.tree, &dir).await? {
            Some(name) => output_dir.join(name),
            None => output_dir.to_path_buf(),
        };
        let owns_target = target != output_dir;
        if owns_target && tokio::fs::try_exists(&target).await.unwrap_or(false) {
            return Err(AppError::conflict(format!(
                "Export target {} already exists",
                target.display()
            )));
        }

        let mut report = ExportReport {
            path: target.clone(),
            as_of,
            files: 0,
            bytes: 0,
        };
        match self.walk(ctx, dir, target.clone(), as_of, &mut report).await {
            Ok(()) => Ok(report),
            Err(e) => {
                if owns_target {
                    if let Err(cleanup) = tokio::fs::remove_dir_all(&target).await {
                        if cleanup.kind() != std::io::ErrorKind::NotFound {
                            warn!(path = %target.display(), error = %cleanup, "Failed to remove partial export");
                        }
                    }
                }
                Err(e)
            }
        }
    }

    async fn walk(
        &self,
        ctx: &RequestContext,
        root: Directory,
        target: PathBuf,
        as_of: DateTime<Utc>,
        report: &mut ExportReport,
    ) -> AppResult<()> {
        let mut stack = vec![(root, target)];

        while let Some((dir, out)) = stack.pop() {
            tokio::fs::create_dir_all(&out)
                .await
                .map_err(|e| AppError::io(format!("Failed to create {}", out.display()), e))?;
            let children = self.tree.children(dir.id, Some(as_of)).await?;

            for file in &children.files {
                let versions = self.tree.versions(file.id).await?;
                let Some(version) = select_version(&versions, as_of) else {
                    debug!(file_id = %file.id, "No version at export instant, skipped");
                    continue;
                };
                ctx.checkpoint()?;
                let variant = self.registry.resolve(&file.type_tag)?;
                let dest = out.join(variant.export_file_name(file));
                report.bytes += self.storage.copy_out(&version.storage_path, &dest).await?;
                report.files += 1;
            }

            for child in select_directories(children.directories) {
                let variant = self.registry.resolve(&child.type_tag)?;
                let child_out = match variant.export_name(&self.tree, &child).await? {
                    Some(name) => out.join(name),
                    None => out.clone(),
                };
                stack.push((child, child_out));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Fixture, t};
    use aoistore_entity::directory::ArchivingRule;
    use uuid::Uuid;

    fn version(seq: i64, at: i64) -> FileData {
        FileData {
            id: Uuid::new_v4(),
            file_id: Uuid::nil(),
            seq,
            content_hash: String::new(),
            encoding: None,
            size_bytes: 0,
            storage_path: String::new(),
            comment: None,
            created_by: "tester".to_string(),
            created_at: t(at),
        }
    }

    #[test]
    fn test_select_version_picks_latest_before_instant() {
        let versions = vec![version(1, 10), version(2, 20), version(3, 30)];
        assert_eq!(select_version(&versions, t(15)).unwrap().seq, 1);
        assert_eq!(select_version(&versions, t(20)).unwrap().seq, 2);
        assert_eq!(select_version(&versions, t(99)).unwrap().seq, 3);
        assert!(select_version(&versions, t(5)).is_none());
    }

    #[test]
    fn test_select_version_tie_goes_to_later_insert() {
        let versions = vec![version(7, 10), version(4, 10)];
        assert_eq!(select_version(&versions, t(10)).unwrap().seq, 7);
    }

    #[tokio::test]
    async fn test_select_directories_keeps_newest_group_snapshot() {
        let fx = Fixture::new().await;
        let root = fx.root_directory("Basin1").await;
        let a = fx.group_directory(&root, "prism", t(10)).await;
        fx.tree.tree.soft_remove(&[a.node_ref()], t(20)).await.unwrap();
        let b = fx.group_directory(&root, "prism", t(20)).await;
        let plain = fx.plain_directory(&root, "maps", t(5)).await;

        let selected = select_directories(vec![a, b.clone(), plain.clone()]);
        let ids: Vec<Uuid> = selected.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![plain.id, b.id]);
        assert!(selected.iter().any(|d| d.archiving_rule == ArchivingRule::Group));
    }

    #[tokio::test]
    async fn test_future_and_premature_queries_are_temporal_errors() {
        let fx = Fixture::new().await;
        fx.clock.set_seconds(100);
        let root = fx.root_directory("Basin1").await;
        let layers = fx.plain_directory(&root, "layers", t(10)).await;
        let out = fx.output_dir();

        let future = fx
            .export
            .export(&fx.ctx(), layers.node_ref(), &out, Some(t(200)))
            .await
            .unwrap_err();
        assert_eq!(future.kind, aoistore_core::ErrorKind::TemporalQuery);

        let early = fx
            .export
            .export(&fx.ctx(), layers.node_ref(), &out, Some(t(5)))
            .await
            .unwrap_err();
        assert_eq!(early.kind, aoistore_core::ErrorKind::TemporalQuery);
    }

    #[tokio::test]
    async fn test_removed_root_is_only_exported_before_its_removal() {
        let fx = Fixture::new().await;
        fx.clock.set_seconds(100);
        let root = fx.root_directory("Basin1").await;
        let layers = fx.plain_directory(&root, "layers", t(10)).await;
        let notes = fx.plain_file(&root, "notes.txt", t(10)).await;
        fx.tree
            .tree
            .soft_remove(&[layers.node_ref(), notes.node_ref()], t(20))
            .await
            .unwrap();

        let gone = fx
            .export
            .export(&fx.ctx(), layers.node_ref(), &fx.output_dir(), Some(t(25)))
            .await
            .unwrap_err();
        assert_eq!(gone.kind, aoistore_core::ErrorKind::NotFound);

        let gone = fx
            .export
            .export(&fx.ctx(), notes.node_ref(), &fx.output_dir(), Some(t(25)))
            .await
            .unwrap_err();
        assert_eq!(gone.kind, aoistore_core::ErrorKind::NotFound);

        let report = fx
            .export
            .export(&fx.ctx(), layers.node_ref(), &fx.output_dir(), Some(t(15)))
            .await
            .unwrap();
        assert_eq!(report.files, 0);
    }
}
