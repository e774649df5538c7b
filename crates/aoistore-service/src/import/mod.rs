//! Content import: sources, bundle validation and the coordinator.

pub mod coordinator;
pub mod source;
pub mod validation;

pub use coordinator::{ImportCoordinator, Placement};
pub use source::{ContentSource, DirectorySource, LayerKind, SourceLayer};
pub use validation::validate_aoi_bundle;
