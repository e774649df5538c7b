//! # aoistore-service
//!
//! The versioned content store for AOI datasets. Each service orchestrates
//! repositories and the storage provider to implement one part of the
//! store: variant lookup, path materialization, import with compensation,
//! archiving policy, lifecycle cascades and point-in-time export.
//!
//! Services follow constructor injection; all dependencies are provided
//! at construction time via `Arc` references. [`ContentStore`] wires them
//! together over one pool.

pub mod aoi;
pub mod archive;
pub mod context;
pub mod export;
pub mod import;
pub mod lifecycle;
pub mod materializer;
pub mod registry;
pub mod store;
pub mod tree;
pub mod url;
pub mod version;

#[cfg(test)]
mod test_support;

pub use aoi::{AoiService, CreateAoiRequest, GeometryMatcher, NearestPourPointMatcher};
pub use archive::{ArchivingPolicyEngine, UpdateOutcome};
pub use context::RequestContext;
pub use export::{ExportReport, SnapshotExportEngine};
pub use import::{ContentSource, DirectorySource, ImportCoordinator, Placement, SourceLayer};
pub use lifecycle::LifecycleManager;
pub use materializer::FilesystemMaterializer;
pub use registry::{ContentInput, NodeRegistry, NodeVariant};
pub use store::ContentStore;
pub use tree::{Children, Node, TreeStore};
pub use url::UrlResolver;
pub use version::{AppendOutcome, VersionWriter};
