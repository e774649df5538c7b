//! Root directory of an AOI.

use async_trait::async_trait;

use aoistore_core::error::AppError;
use aoistore_core::result::AppResult;
use aoistore_entity::directory::Directory;
use aoistore_entity::node::NodeKind;

use super::layout;
use super::{ContentInput, NodeVariant};
use crate::context::RequestContext;
use crate::import::coordinator::{ImportCoordinator, Placement};
use crate::tree::{Node, TreeStore};

/// A top-level component of an AOI bundle.
#[derive(Debug, Clone, Copy)]
pub struct Component {
    /// Entry name inside the bundle.
    pub entry: &'static str,
    /// Variant it is imported as.
    pub type_tag: &'static str,
    /// Whether a bundle without it is rejected.
    pub required: bool,
}

/// Components in import order.
pub const COMPONENTS: &[Component] = &[
    Component { entry: "aoi.gdb", type_tag: "AOIdb", required: true },
    Component { entry: "surfaces.gdb", type_tag: "Surfaces", required: true },
    Component { entry: "layers.gdb", type_tag: "Layers", required: true },
    Component { entry: layout::ZONES_DIR, type_tag: "Zones", required: false },
    Component { entry: "analysis.gdb", type_tag: "Analysis", required: true },
    Component { entry: "prism.gdb", type_tag: "PrismDir", required: true },
    Component { entry: layout::MAPS_DIR, type_tag: "Maps", required: false },
];

/// The directory holding every component of one AOI.
///
/// On disk it is named after its own id; in exports after the AOI's
/// short name.
#[derive(Debug, Clone, Copy)]
pub struct AoiDirectoryVariant;

#[async_trait]
impl NodeVariant for AoiDirectoryVariant {
    fn type_tag(&self) -> &'static str {
        "AOIDirectory"
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Directory
    }

    fn plural_name(&self) -> &'static str {
        "aoidirectories"
    }

    fn default_name(&self, _parent: Option<&Directory>, input: &ContentInput) -> String {
        input.name().to_string()
    }

    fn filesystem_name(&self, dir: &Directory) -> String {
        dir.id.to_string()
    }

    async fn export_name(&self, tree: &TreeStore, dir: &Directory) -> AppResult<Option<String>> {
        let aoi = tree.aoi(dir.aoi_id).await?;
        Ok(Some(aoi.shortname))
    }

    fn accepts_updates(&self) -> bool {
        false
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
            .ok_or_else(|| AppError::internal("AOIDirectory import needs a directory"))?;
        let source = input.source()?;

        for component in COMPONENTS {
            let Some(entry) = source.child(component.entry).await? else {
                if component.required {
                    return Err(AppError::validation(format!(
                        "AOI source {} is missing {}",
                        source.location().display(),
                        component.entry
                    )));
                }
                continue;
            };
            coordinator
                .create_directory(
                    ctx,
                    component.type_tag,
                    Placement::Under(dir),
                    &ContentInput::Source(entry),
                    None,
                    None,
                )
                .await?;
        }
        Ok(())
    }
}
