//! Tree store: loading nodes and walking the directory/file graph.
//!
//! The graph is an adjacency list keyed by id. Every walk is iterative with
//! an explicit stack, so deep trees never grow the call stack.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use aoistore_core::error::AppError;
use aoistore_core::result::AppResult;
use aoistore_database::repositories::{
    AoiRepository, DirectoryRepository, FileRepository, TreeRepository,
};
use aoistore_entity::aoi::Aoi;
use aoistore_entity::directory::Directory;
use aoistore_entity::file::{File, FileData};
use aoistore_entity::node::{NodeKind, NodeLifecycle, NodeRef, NodeStatus};

/// A loaded tree member.
#[derive(Debug, Clone)]
pub enum Node {
    /// A directory record.
    Directory(Directory),
    /// A file record.
    File(File),
}

impl Node {
    /// Record id.
    pub fn id(&self) -> Uuid {
        match self {
            Self::Directory(d) => d.id,
            Self::File(f) => f.id,
        }
    }

    /// Logical name.
    pub fn name(&self) -> &str {
        match self {
            Self::Directory(d) => &d.name,
            Self::File(f) => &f.name,
        }
    }

    /// Variant discriminator.
    pub fn type_tag(&self) -> &str {
        match self {
            Self::Directory(d) => &d.type_tag,
            Self::File(f) => &f.type_tag,
        }
    }

    /// Owning AOI.
    pub fn aoi_id(&self) -> Uuid {
        match self {
            Self::Directory(d) => d.aoi_id,
            Self::File(f) => f.aoi_id,
        }
    }

    /// Parent directory, `None` for an AOI root.
    pub fn parent_id(&self) -> Option<Uuid> {
        match self {
            Self::Directory(d) => d.parent_id,
            Self::File(f) => Some(f.directory_id),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Directory(_) => NodeKind::Directory,
            Self::File(_) => NodeKind::File,
        }
    }

    pub fn node_ref(&self) -> NodeRef {
        NodeRef {
            kind: self.kind(),
            id: self.id(),
        }
    }

    pub fn as_directory(&self) -> Option<&Directory> {
        match self {
            Self::Directory(d) => Some(d),
            Self::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&File> {
        match self {
            Self::File(f) => Some(f),
            Self::Directory(_) => None,
        }
    }
}

impl NodeLifecycle for Node {
    fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::Directory(d) => d.created_at,
            Self::File(f) => f.created_at,
        }
    }

    fn removed_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Directory(d) => d.removed_at,
            Self::File(f) => f.removed_at,
        }
    }

    fn is_active(&self) -> bool {
        match self {
            Self::Directory(d) => d.active,
            Self::File(f) => f.active,
        }
    }

    fn status(&self) -> NodeStatus {
        match self {
            Self::Directory(d) => d.status,
            Self::File(f) => f.status,
        }
    }
}

impl From<Directory> for Node {
    fn from(d: Directory) -> Self {
        Self::Directory(d)
    }
}

impl From<File> for Node {
    fn from(f: File) -> Self {
        Self::File(f)
    }
}

/// Direct children of a directory.
#[derive(Debug, Clone, Default)]
pub struct Children {
    /// Child directories.
    pub directories: Vec<Directory>,
    /// Child files.
    pub files: Vec<File>,
}

impl Children {
    pub fn is_empty(&self) -> bool {
        self.directories.is_empty() && self.files.is_empty()
    }
}

fn is_listed<N: NodeLifecycle>(node: &N, as_of: Option<DateTime<Utc>>) -> bool {
    match as_of {
        Some(at) => node.visible_at(at),
        None => node.is_current(),
    }
}

/// Read access to the persistent tree plus the shared repositories.
#[derive(Debug, Clone)]
pub struct TreeStore {
    /// AOI repository.
    pub aois: Arc<AoiRepository>,
    /// Directory repository.
    pub directories: Arc<DirectoryRepository>,
    /// File and version repository.
    pub files: Arc<FileRepository>,
    /// Multi-row lifecycle updates.
    pub tree: Arc<TreeRepository>,
}

impl TreeStore {
    /// Creates a new tree store.
    pub fn new(
        aois: Arc<AoiRepository>,
        directories: Arc<DirectoryRepository>,
        files: Arc<FileRepository>,
        tree: Arc<TreeRepository>,
    ) -> Self {
        Self {
            aois,
            directories,
            files,
            tree,
        }
    }

    /// Builds every repository over one pool.
    pub fn from_pool(pool: sqlx::SqlitePool) -> Self {
        Self::new(
            Arc::new(AoiRepository::new(pool.clone())),
            Arc::new(DirectoryRepository::new(pool.clone())),
            Arc::new(FileRepository::new(pool.clone())),
            Arc::new(TreeRepository::new(pool)),
        )
    }

    /// Loads a node by reference.
    pub async fn load(&self, node: NodeRef) -> AppResult<Node> {
        match node.kind {
            NodeKind::Directory => self.directory(node.id).await.map(Node::Directory),
            NodeKind::File => self.file(node.id).await.map(Node::File),
        }
    }

    pub async fn directory(&self, id: Uuid) -> AppResult<Directory> {
        self.directories.get(id).await
    }

    pub async fn file(&self, id: Uuid) -> AppResult<File> {
        self.files.get(id).await
    }

    pub async fn aoi(&self, id: Uuid) -> AppResult<Aoi> {
        self.aois.get(id).await
    }

    /// Every child row of a directory regardless of state.
    pub async fn all_children(&self, directory_id: Uuid) -> AppResult<Children> {
        Ok(Children {
            directories: self.directories.find_children(directory_id).await?,
            files: self.files.find_in_directory(directory_id).await?,
        })
    }

    /// Children visible now (`as_of = None`) or at a past instant.
    pub async fn children(
        &self,
        directory_id: Uuid,
        as_of: Option<DateTime<Utc>>,
    ) -> AppResult<Children> {
        let all = self.all_children(directory_id).await?;
        Ok(Children {
            directories: all
                .directories
                .into_iter()
                .filter(|d| is_listed(d, as_of))
                .collect(),
            files: all
                .files
                .into_iter()
                .filter(|f| is_listed(f, as_of))
                .collect(),
        })
    }

    /// The newest current child directory carrying `type_tag`.
    pub async fn current_child_of_type(
        &self,
        directory_id: Uuid,
        type_tag: &str,
    ) -> AppResult<Option<Directory>> {
        let children = self.children(directory_id, None).await?;
        Ok(children
            .directories
            .into_iter()
            .filter(|d| d.type_tag == type_tag)
            .max_by_key(|d| d.created_at))
    }

    /// The current root directory of an AOI.
    pub async fn aoi_root(&self, aoi_id: Uuid) -> AppResult<Directory> {
        self.directories
            .find_roots(aoi_id)
            .await?
            .into_iter()
            .find(|d| d.is_current())
            .ok_or_else(|| AppError::not_found(format!("AOI {aoi_id} has no root directory")))
    }

    /// Versions of a file, oldest first.
    pub async fn versions(&self, file_id: Uuid) -> AppResult<Vec<FileData>> {
        self.files.find_versions(file_id).await
    }

    /// The node and all its descendants in every state, children before
    /// their parent.
    pub async fn subtree(&self, root: NodeRef) -> AppResult<Vec<Node>> {
        let root = self.load(root).await?;
        let mut ordered = Vec::new();
        let mut stack = vec![(root, false)];

        while let Some((node, expanded)) = stack.pop() {
            let Node::Directory(dir) = &node else {
                ordered.push(node);
                continue;
            };
            if expanded {
                ordered.push(node);
                continue;
            }

            let children = self.all_children(dir.id).await?;
            stack.push((node, true));
            stack.extend(children.files.into_iter().map(|f| (Node::File(f), false)));
            stack.extend(
                children
                    .directories
                    .into_iter()
                    .map(|d| (Node::Directory(d), false)),
            );
        }

        Ok(ordered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Fixture, t};

    #[tokio::test]
    async fn test_subtree_lists_children_before_parent() {
        let fx = Fixture::new().await;
        let root = fx.root_directory("Basin1").await;
        let layers = fx.plain_directory(&root, "layers", t(10)).await;
        let roads = fx.plain_file(&layers, "roads", t(10)).await;
        let streams = fx.plain_file(&layers, "streams", t(10)).await;

        let order: Vec<Uuid> = fx
            .tree
            .subtree(root.node_ref())
            .await
            .unwrap()
            .iter()
            .map(Node::id)
            .collect();

        assert_eq!(order.len(), 4);
        assert_eq!(order.last(), Some(&root.id));
        let pos = |id| order.iter().position(|x| *x == id).unwrap();
        assert!(pos(roads.id) < pos(layers.id));
        assert!(pos(streams.id) < pos(layers.id));
    }

    #[tokio::test]
    async fn test_children_filters_by_instant() {
        let fx = Fixture::new().await;
        let root = fx.root_directory("Basin1").await;
        let old = fx.plain_directory(&root, "zones", t(10)).await;
        fx.tree
            .tree
            .soft_remove(&[old.node_ref()], t(20))
            .await
            .unwrap();
        fx.plain_directory(&root, "zones", t(20)).await;

        assert_eq!(fx.tree.children(root.id, None).await.unwrap().directories.len(), 1);
        let at_15 = fx.tree.children(root.id, Some(t(15))).await.unwrap();
        assert_eq!(at_15.directories.len(), 1);
        assert_eq!(at_15.directories[0].id, old.id);
        assert!(fx.tree.children(root.id, Some(t(5))).await.unwrap().is_empty());
    }
}
