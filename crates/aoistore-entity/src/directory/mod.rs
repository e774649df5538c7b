//! Directory domain entities.

pub mod model;
pub mod rule;

pub use model::{CreateDirectory, Directory};
pub use rule::ArchivingRule;
