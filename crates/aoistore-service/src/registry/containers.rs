//! Containers that hold the GROUP-archived snapshots of one dataset.

use async_trait::async_trait;

use aoistore_core::error::AppError;
use aoistore_core::result::AppResult;
use aoistore_entity::directory::Directory;
use aoistore_entity::node::NodeKind;

use super::layout;
use super::{ContentInput, DefaultName, NodeVariant};
use crate::context::RequestContext;
use crate::import::coordinator::{ImportCoordinator, Placement};
use crate::tree::{Node, TreeStore};

/// A directory whose only content is a series of snapshot siblings.
///
/// Importing creates the first snapshot from the same input; updates are
/// routed to the snapshot variant.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotContainerVariant {
    tag: &'static str,
    plural: &'static str,
    name: DefaultName,
    snapshot: &'static str,
    own_export_dir: bool,
}

/// `PrismDir` and `HRUZones`.
pub fn well_known() -> [SnapshotContainerVariant; 2] {
    [
        SnapshotContainerVariant {
            tag: "PrismDir",
            plural: "prismdirs",
            name: DefaultName::Fixed(layout::PRISM_GDB),
            snapshot: "Prism",
            own_export_dir: false,
        },
        SnapshotContainerVariant {
            tag: "HRUZones",
            plural: "hruzones",
            name: DefaultName::Source,
            snapshot: "HRUZonesData",
            own_export_dir: true,
        },
    ]
}

#[async_trait]
impl NodeVariant for SnapshotContainerVariant {
    fn type_tag(&self) -> &'static str {
        self.tag
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Directory
    }

    fn plural_name(&self) -> &'static str {
        self.plural
    }

    fn default_name(&self, parent: Option<&Directory>, input: &ContentInput) -> String {
        self.name.resolve(parent, input)
    }

    async fn export_name(&self, _tree: &TreeStore, dir: &Directory) -> AppResult<Option<String>> {
        Ok(self.own_export_dir.then(|| dir.name.clone()))
    }

    fn snapshot_tag(&self) -> Option<&'static str> {
        Some(self.snapshot)
    }

    async fn import_content(
        &self,
        coordinator: &ImportCoordinator,
        ctx: &RequestContext,
        node: &Node,
        input: &ContentInput,
    ) -> AppResult<()> {
        let dir = node
            .as_directory()
            .ok_or_else(|| AppError::internal(format!("{} import needs a directory", self.tag)))?;
        coordinator
            .create_directory(ctx, self.snapshot, Placement::Under(dir), input, None, None)
            .await?;
        Ok(())
    }
}
