//! Map documents directory.

use async_trait::async_trait;

use aoistore_core::error::AppError;
use aoistore_core::result::AppResult;
use aoistore_entity::directory::Directory;
use aoistore_entity::node::NodeKind;

use super::file::file_tag_for;
use super::layout;
use super::{ContentInput, NodeVariant};
use crate::context::RequestContext;
use crate::import::coordinator::ImportCoordinator;
use crate::import::source::SourceLayer;
use crate::tree::Node;

#[derive(Debug, Clone, Copy)]
pub struct MapsVariant;

impl MapsVariant {
    fn is_map_file(layer: &SourceLayer) -> bool {
        layer.extension().as_deref() == Some(layout::MAP_DOCUMENT_EXTENSION)
            || layer.file_name.eq_ignore_ascii_case(layout::MAP_ANALYSIS_FILE)
            || layer.file_name.eq_ignore_ascii_case(layout::MAP_PARAMETERS_FILE)
    }
}

#[async_trait]
impl NodeVariant for MapsVariant {
    fn type_tag(&self) -> &'static str {
        "Maps"
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Directory
    }

    fn plural_name(&self) -> &'static str {
        "maps"
    }

    fn default_name(&self, _parent: Option<&Directory>, _input: &ContentInput) -> String {
        layout::MAPS_DIR.to_string()
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
            .ok_or_else(|| AppError::internal("Maps import needs a directory"))?;

        let layers = input.source()?.layers().await?;
        for layer in layers.iter().filter(|l| Self::is_map_file(l)) {
            coordinator
                .create_file(ctx, file_tag_for(layer.kind), dir, layer, None, None)
                .await?;
        }
        Ok(())
    }
}
