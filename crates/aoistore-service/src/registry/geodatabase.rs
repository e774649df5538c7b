//! Geodatabase directory variants.
//!
//! A geodatabase bundle holds vector, raster and table layers. Each variant
//! differs only in its archiving rule, default name and which layers it
//! keeps.

use std::collections::HashSet;

use async_trait::async_trait;

use aoistore_core::error::AppError;
use aoistore_core::result::AppResult;
use aoistore_entity::directory::{ArchivingRule, Directory};
use aoistore_entity::node::NodeKind;

use super::file::file_tag_for;
use super::layout;
use super::{ContentInput, DefaultName, NodeVariant};
use crate::context::RequestContext;
use crate::import::coordinator::ImportCoordinator;
use crate::import::source::{LayerKind, SourceLayer};
use crate::tree::{Node, TreeStore};

/// Which layers of a bundle a variant imports.
#[derive(Debug, Clone, Copy)]
pub enum LayerFilter {
    /// Every vector, raster and table.
    All,
    /// Only the named rasters and vectors.
    Named {
        rasters: &'static [&'static str],
        vectors: &'static [&'static str],
    },
    /// Only layers of one kind.
    Kind(LayerKind),
}

impl LayerFilter {
    fn accepts(&self, layer: &SourceLayer) -> bool {
        let named = |names: &[&str]| names.iter().any(|n| n.eq_ignore_ascii_case(&layer.name));
        match self {
            Self::All => matches!(
                layer.kind,
                LayerKind::Vector | LayerKind::Raster | LayerKind::Table
            ),
            Self::Named { rasters, vectors } => match layer.kind {
                LayerKind::Raster => named(*rasters),
                LayerKind::Vector => named(*vectors),
                _ => false,
            },
            Self::Kind(kind) => layer.kind == *kind,
        }
    }
}

/// Geodatabase layers to import, in source order.
///
/// A table sharing its stem with a vector is the vector's attribute file and
/// travels with it rather than becoming a layer of its own.
pub fn select_layers(layers: Vec<SourceLayer>, filter: LayerFilter) -> Vec<SourceLayer> {
    let vectors: HashSet<String> = layers
        .iter()
        .filter(|l| l.kind == LayerKind::Vector)
        .map(|l| l.name.to_ascii_lowercase())
        .collect();

    layers
        .into_iter()
        .filter(|l| filter.accepts(l))
        .filter(|l| {
            !(l.kind == LayerKind::Table
                && !matches!(filter, LayerFilter::Kind(LayerKind::Table))
                && vectors.contains(&l.name.to_ascii_lowercase()))
        })
        .collect()
}

/// A directory holding the layers of one geodatabase.
#[derive(Debug, Clone, Copy)]
pub struct GeodatabaseVariant {
    tag: &'static str,
    plural: &'static str,
    rule: ArchivingRule,
    name: DefaultName,
    filter: LayerFilter,
}

impl GeodatabaseVariant {
    pub const fn new(
        tag: &'static str,
        plural: &'static str,
        rule: ArchivingRule,
        name: DefaultName,
        filter: LayerFilter,
    ) -> Self {
        Self {
            tag,
            plural,
            rule,
            name,
            filter,
        }
    }
}

/// Every well-known geodatabase variant.
pub fn well_known() -> [GeodatabaseVariant; 7] {
    [
        GeodatabaseVariant::new(
            "Surfaces",
            "surfaces",
            ArchivingRule::ReadOnly,
            DefaultName::Fixed(layout::SURFACES_GDB),
            LayerFilter::All,
        ),
        GeodatabaseVariant::new(
            "Layers",
            "layers",
            ArchivingRule::Individual,
            DefaultName::Fixed(layout::LAYERS_GDB),
            LayerFilter::All,
        ),
        GeodatabaseVariant::new(
            "AOIdb",
            "aoidbs",
            ArchivingRule::ReadOnly,
            DefaultName::Fixed(layout::AOI_GDB),
            LayerFilter::All,
        ),
        GeodatabaseVariant::new(
            "Analysis",
            "analyses",
            ArchivingRule::Individual,
            DefaultName::Fixed(layout::ANALYSIS_GDB),
            LayerFilter::All,
        ),
        GeodatabaseVariant::new(
            "Prism",
            "prisms",
            ArchivingRule::Group,
            DefaultName::Fixed(layout::PRISM_GDB),
            LayerFilter::All,
        ),
        GeodatabaseVariant::new(
            "HRUZonesGDB",
            "hruzonesgdbs",
            ArchivingRule::ReadOnly,
            DefaultName::Parent,
            LayerFilter::Named {
                rasters: layout::HRU_RASTERS,
                vectors: layout::HRU_VECTORS,
            },
        ),
        GeodatabaseVariant::new(
            "ParamGDB",
            "paramgdbs",
            ArchivingRule::ReadOnly,
            DefaultName::Fixed(layout::PARAM_GDB),
            LayerFilter::Kind(LayerKind::Table),
        ),
    ]
}

#[async_trait]
impl NodeVariant for GeodatabaseVariant {
    fn type_tag(&self) -> &'static str {
        self.tag
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Directory
    }

    fn plural_name(&self) -> &'static str {
        self.plural
    }

    fn archiving_rule(&self) -> ArchivingRule {
        self.rule
    }

    fn default_name(&self, parent: Option<&Directory>, input: &ContentInput) -> String {
        self.name.resolve(parent, input)
    }

    async fn export_name(&self, _tree: &TreeStore, dir: &Directory) -> AppResult<Option<String>> {
        Ok(Some(layout::gdb_name(&dir.name)))
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
        let layers = select_layers(input.source()?.layers().await?, self.filter);

        for layer in &layers {
            coordinator
                .create_file(ctx, file_tag_for(layer.kind), dir, layer, None, None)
                .await?;
        }
        Ok(())
    }
}
