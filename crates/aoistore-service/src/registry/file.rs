//! File variants.

use async_trait::async_trait;

use aoistore_core::error::AppError;
use aoistore_core::result::AppResult;
use aoistore_entity::directory::Directory;
use aoistore_entity::file::File;
use aoistore_entity::node::NodeKind;

use super::{ContentInput, NodeVariant};
use crate::context::RequestContext;
use crate::import::coordinator::ImportCoordinator;
use crate::import::source::LayerKind;
use crate::tree::Node;

/// A leaf whose content is a sequence of whole-file versions.
///
/// Typed variants store blobs with a fixed extension and are named after
/// the layer stem; the generic `File` keeps the full file name.
#[derive(Debug, Clone, Copy)]
pub struct FileVariant {
    tag: &'static str,
    plural: &'static str,
    extension: Option<&'static str>,
}

impl FileVariant {
    pub const fn new(tag: &'static str, plural: &'static str, extension: Option<&'static str>) -> Self {
        Self {
            tag,
            plural,
            extension,
        }
    }
}

/// Every well-known file variant.
pub fn well_known() -> [FileVariant; 6] {
    [
        FileVariant::new("File", "files", None),
        FileVariant::new("Vector", "vectors", Some("shp")),
        FileVariant::new("Raster", "rasters", Some("img")),
        FileVariant::new("Table", "tables", Some("dbf")),
        FileVariant::new("Xml", "xmls", Some("xml")),
        FileVariant::new("MapDocument", "mapdocuments", Some("mxd")),
    ]
}

/// The file variant a layer of the given kind is stored as.
pub fn file_tag_for(kind: LayerKind) -> &'static str {
    match kind {
        LayerKind::Vector => "Vector",
        LayerKind::Raster => "Raster",
        LayerKind::Table => "Table",
        LayerKind::Xml => "Xml",
        LayerKind::MapDocument => "MapDocument",
        LayerKind::Other => "File",
    }
}

#[async_trait]
impl NodeVariant for FileVariant {
    fn type_tag(&self) -> &'static str {
        self.tag
    }

    fn kind(&self) -> NodeKind {
        NodeKind::File
    }

    fn plural_name(&self) -> &'static str {
        self.plural
    }

    fn default_name(&self, _parent: Option<&Directory>, input: &ContentInput) -> String {
        match (input, self.extension) {
            (ContentInput::Layer(layer), Some(_)) => layer.name.clone(),
            _ => input.name().to_string(),
        }
    }

    fn storage_extension(&self, file: &File) -> String {
        match self.extension {
            Some(ext) => ext.to_string(),
            None => file.extension().unwrap_or_else(|| "bin".to_string()),
        }
    }

    fn export_file_name(&self, file: &File) -> String {
        match self.extension {
            Some(ext) if file.extension().as_deref() != Some(ext) => format!("{}.{ext}", file.name),
            _ => file.name.clone(),
        }
    }

    async fn import_content(
        &self,
        coordinator: &ImportCoordinator,
        ctx: &RequestContext,
        node: &Node,
        input: &ContentInput,
    ) -> AppResult<()> {
        let file = node
            .as_file()
            .ok_or_else(|| AppError::internal(format!("{} import needs a file node", self.tag)))?;
        let layer = input.layer()?;
        let parent = coordinator.tree().directory(file.directory_id).await?;

        coordinator
            .versions()
            .write(
                ctx,
                file,
                &parent,
                layer,
                &self.storage_extension(file),
                file.created_at,
                file.comment.as_deref(),
            )
            .await?;
        Ok(())
    }
}
