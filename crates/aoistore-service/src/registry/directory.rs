//! Generic directory mirroring an arbitrary source tree.

use async_trait::async_trait;

use aoistore_core::error::AppError;
use aoistore_core::result::AppResult;
use aoistore_entity::directory::Directory;
use aoistore_entity::node::NodeKind;

use super::{ContentInput, NodeVariant};
use crate::context::RequestContext;
use crate::import::coordinator::{ImportCoordinator, Placement};
use crate::tree::Node;

#[derive(Debug, Clone, Copy)]
pub struct PlainDirectoryVariant;

#[async_trait]
impl NodeVariant for PlainDirectoryVariant {
    fn type_tag(&self) -> &'static str {
        "Directory"
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Directory
    }

    fn plural_name(&self) -> &'static str {
        "directories"
    }

    fn default_name(&self, _parent: Option<&Directory>, input: &ContentInput) -> String {
        input.name().to_string()
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
            .ok_or_else(|| AppError::internal("Directory import needs a directory"))?;
        let source = input.source()?;

        for child in source.children().await? {
            coordinator
                .create_directory(
                    ctx,
                    self.type_tag(),
                    Placement::Under(dir),
                    &ContentInput::Source(child),
                    None,
                    None,
                )
                .await?;
        }
        for layer in source.layers().await? {
            coordinator
                .create_file(ctx, "File", dir, &layer, None, None)
                .await?;
        }
        Ok(())
    }
}
