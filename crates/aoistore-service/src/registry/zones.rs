//! HRU zone variants.

use async_trait::async_trait;

use aoistore_core::error::AppError;
use aoistore_core::result::AppResult;
use aoistore_entity::directory::{ArchivingRule, Directory};
use aoistore_entity::node::NodeKind;

use super::layout;
use super::{ContentInput, DefaultName, NodeVariant};
use crate::context::RequestContext;
use crate::import::coordinator::{ImportCoordinator, Placement};
use crate::import::source::ContentSource;
use crate::tree::{Node, TreeStore};

/// `zones`: one `HRUZones` container per subdirectory of the source.
#[derive(Debug, Clone, Copy)]
pub struct ZonesVariant;

#[async_trait]
impl NodeVariant for ZonesVariant {
    fn type_tag(&self) -> &'static str {
        "Zones"
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Directory
    }

    fn plural_name(&self) -> &'static str {
        "zones"
    }

    fn default_name(&self, _parent: Option<&Directory>, _input: &ContentInput) -> String {
        layout::ZONES_DIR.to_string()
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
            .ok_or_else(|| AppError::internal("Zones import needs a directory"))?;

        for zone in input.source()?.children().await? {
            coordinator
                .create_directory(
                    ctx,
                    "HRUZones",
                    Placement::Under(dir),
                    &ContentInput::Source(zone),
                    None,
                    None,
                )
                .await?;
        }
        Ok(())
    }
}

/// One timestamped snapshot of an HRU zone: its zone geodatabase, an
/// optional parameter geodatabase and the run log.
#[derive(Debug, Clone, Copy)]
pub struct HruZonesDataVariant;

impl HruZonesDataVariant {
    /// `_<name>.gdb` wins over `<name>.gdb`.
    async fn zone_gdb(
        source: &dyn ContentSource,
        name: &str,
    ) -> AppResult<Option<std::sync::Arc<dyn ContentSource>>> {
        if let Some(gdb) = source.child(&layout::gdb_name(&format!("_{name}"))).await? {
            return Ok(Some(gdb));
        }
        source.child(&layout::gdb_name(name)).await
    }
}

#[async_trait]
impl NodeVariant for HruZonesDataVariant {
    fn type_tag(&self) -> &'static str {
        "HRUZonesData"
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Directory
    }

    fn plural_name(&self) -> &'static str {
        "hruzonesdata"
    }

    fn archiving_rule(&self) -> ArchivingRule {
        ArchivingRule::Group
    }

    fn default_name(&self, parent: Option<&Directory>, input: &ContentInput) -> String {
        DefaultName::Parent.resolve(parent, input)
    }

    async fn export_name(&self, _tree: &TreeStore, _dir: &Directory) -> AppResult<Option<String>> {
        Ok(None)
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
            .ok_or_else(|| AppError::internal("HRUZonesData import needs a directory"))?;
        let source = input.source()?;

        let gdb = Self::zone_gdb(source.as_ref(), &dir.name).await?.ok_or_else(|| {
            AppError::validation(format!(
                "Zone '{}' has no {} geodatabase",
                dir.name,
                layout::gdb_name(&dir.name)
            ))
        })?;
        coordinator
            .create_directory(
                ctx,
                "HRUZonesGDB",
                Placement::Under(dir),
                &ContentInput::Source(gdb),
                None,
                None,
            )
            .await?;

        if let Some(param) = source.child(&layout::gdb_name(layout::PARAM_GDB)).await? {
            coordinator
                .create_directory(
                    ctx,
                    "ParamGDB",
                    Placement::Under(dir),
                    &ContentInput::Source(param),
                    None,
                    None,
                )
                .await?;
        }

        if let Some(log) = source.layer(layout::HRU_LOG_FILE).await? {
            coordinator
                .create_file(ctx, "Xml", dir, &log, None, None)
                .await?;
        }
        Ok(())
    }
}
