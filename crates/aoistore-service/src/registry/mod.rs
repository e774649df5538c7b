//! Node registry: maps a stored type tag to its variant behaviour.
//!
//! Loading a record resolves its variant strictly from `type_tag`. An
//! unknown tag is a configuration error; there is no fallback variant.

pub mod aoi_directory;
pub mod containers;
pub mod directory;
pub mod file;
pub mod geodatabase;
pub mod layout;
pub mod maps;
pub mod zones;

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use aoistore_core::error::AppError;
use aoistore_core::result::AppResult;
use aoistore_entity::directory::{ArchivingRule, Directory};
use aoistore_entity::file::File;
use aoistore_entity::node::{NodeKind, NodeLifecycle};

use crate::context::RequestContext;
use crate::import::coordinator::ImportCoordinator;
use crate::import::source::{ContentSource, DirectorySource, SourceLayer};
use crate::tree::{Node, TreeStore};

pub use aoi_directory::AoiDirectoryVariant;
pub use containers::SnapshotContainerVariant;
pub use directory::PlainDirectoryVariant;
pub use file::{FileVariant, file_tag_for};
pub use geodatabase::GeodatabaseVariant;
pub use maps::MapsVariant;
pub use zones::{HruZonesDataVariant, ZonesVariant};

/// Content handed to a variant's importer.
#[derive(Debug, Clone)]
pub enum ContentInput {
    /// A bundle, for directory variants.
    Source(Arc<dyn ContentSource>),
    /// A single layer, for file variants.
    Layer(SourceLayer),
}

impl ContentInput {
    /// Opens a path on local disk: a directory becomes a bundle, a regular
    /// file a single layer.
    pub async fn open(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        let meta = tokio::fs::metadata(&path).await.map_err(|e| {
            AppError::with_source(
                aoistore_core::ErrorKind::Validation,
                format!("Content source {} is not readable", path.display()),
                e,
            )
        })?;
        if meta.is_file() {
            Ok(Self::Layer(SourceLayer::from_path(path)?))
        } else {
            Ok(Self::Source(DirectorySource::shared(path).await?))
        }
    }

    /// The bundle, or a validation error for a layer input.
    pub fn source(&self) -> AppResult<&Arc<dyn ContentSource>> {
        match self {
            Self::Source(s) => Ok(s),
            Self::Layer(l) => Err(AppError::validation(format!(
                "Expected a directory source, got layer '{}'",
                l.file_name
            ))),
        }
    }

    /// The layer, or a validation error for a bundle input.
    pub fn layer(&self) -> AppResult<&SourceLayer> {
        match self {
            Self::Layer(l) => Ok(l),
            Self::Source(s) => Err(AppError::validation(format!(
                "Expected a single layer, got source '{}'",
                s.name()
            ))),
        }
    }

    /// Name of the input as found on disk.
    pub fn name(&self) -> &str {
        match self {
            Self::Source(s) => s.name(),
            Self::Layer(l) => &l.file_name,
        }
    }
}

/// How a variant names a new node when the caller gives no name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultName {
    /// A fixed name.
    Fixed(&'static str),
    /// The parent directory's name.
    Parent,
    /// The content source's name.
    Source,
}

impl DefaultName {
    pub fn resolve(&self, parent: Option<&Directory>, input: &ContentInput) -> String {
        match self {
            Self::Fixed(name) => (*name).to_string(),
            Self::Parent => parent
                .map(|p| p.name.clone())
                .unwrap_or_else(|| input.name().to_string()),
            Self::Source => input.name().to_string(),
        }
    }
}

/// Format of the suffix appended to GROUP-archived directory names.
pub const GROUP_SUFFIX_FORMAT: &str = "%Y%m%d%H%M%S";

/// Behaviour of one node variant.
///
/// Directory and file variants share the trait; methods that only make
/// sense for one kind have defaults for the other.
#[async_trait]
pub trait NodeVariant: Send + Sync + fmt::Debug {
    /// Stored discriminator.
    fn type_tag(&self) -> &'static str;

    /// Whether records of this variant live in `directories` or `files`.
    fn kind(&self) -> NodeKind;

    /// Collection name used in external URLs.
    fn plural_name(&self) -> &'static str;

    /// Archiving rule stamped on new directories of this variant.
    fn archiving_rule(&self) -> ArchivingRule {
        ArchivingRule::None
    }

    /// Name given to a new node when the caller does not choose one.
    fn default_name(&self, parent: Option<&Directory>, input: &ContentInput) -> String;

    /// Final path component of the directory on disk.
    fn filesystem_name(&self, dir: &Directory) -> String {
        if dir.archiving_rule.is_timestamped() {
            format!("{}_{}", dir.name, dir.created_at.format(GROUP_SUFFIX_FORMAT))
        } else {
            dir.name.clone()
        }
    }

    /// Name of the directory created for this node in an export, or `None`
    /// when its content is written straight into the parent's output.
    async fn export_name(&self, _tree: &TreeStore, dir: &Directory) -> AppResult<Option<String>> {
        Ok(Some(dir.name.clone()))
    }

    /// Extension of version blobs on disk.
    fn storage_extension(&self, file: &File) -> String {
        file.extension().unwrap_or_else(|| "bin".to_string())
    }

    /// File name used when a version is copied out.
    fn export_file_name(&self, file: &File) -> String {
        file.name.clone()
    }

    /// Populates a freshly created node from its input.
    async fn import_content(
        &self,
        coordinator: &ImportCoordinator,
        ctx: &RequestContext,
        node: &Node,
        input: &ContentInput,
    ) -> AppResult<()>;

    /// For containers: the tag of the GROUP snapshot they hold.
    fn snapshot_tag(&self) -> Option<&'static str> {
        None
    }

    /// Whether `update` may be called on directories of this variant.
    fn accepts_updates(&self) -> bool {
        true
    }

    /// Whether the node may be deactivated in its current state.
    fn can_deactivate(&self, node: &Node) -> bool {
        node.removed_at().is_some()
    }

    /// Runs before the node is marked inactive.
    async fn cleanup(&self, _node: &Node) -> AppResult<()> {
        Ok(())
    }
}

/// Lookup table from type tag to variant.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    variants: HashMap<String, Arc<dyn NodeVariant>>,
}

impl NodeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every well-known variant.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(AoiDirectoryVariant));
        for variant in geodatabase::well_known() {
            registry.register(Arc::new(variant));
        }
        for variant in containers::well_known() {
            registry.register(Arc::new(variant));
        }
        registry.register(Arc::new(ZonesVariant));
        registry.register(Arc::new(HruZonesDataVariant));
        registry.register(Arc::new(MapsVariant));
        registry.register(Arc::new(PlainDirectoryVariant));
        for variant in file::well_known() {
            registry.register(Arc::new(variant));
        }
        registry
    }

    /// Adds or replaces a variant.
    pub fn register(&mut self, variant: Arc<dyn NodeVariant>) -> &mut Self {
        self.variants.insert(variant.type_tag().to_string(), variant);
        self
    }

    /// Resolves a stored tag.
    pub fn resolve(&self, type_tag: &str) -> AppResult<Arc<dyn NodeVariant>> {
        self.variants.get(type_tag).cloned().ok_or_else(|| {
            AppError::configuration(format!("Unknown node variant '{type_tag}'"))
        })
    }

    /// Resolves a tag and checks it names a variant of the expected kind.
    pub fn resolve_kind(&self, type_tag: &str, kind: NodeKind) -> AppResult<Arc<dyn NodeVariant>> {
        let variant = self.resolve(type_tag)?;
        if variant.kind() != kind {
            return Err(AppError::validation(format!(
                "Variant '{type_tag}' is a {}, not a {kind}",
                variant.kind()
            )));
        }
        Ok(variant)
    }

    /// Registered tags, sorted.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.variants.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }
}
