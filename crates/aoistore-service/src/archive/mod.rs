//! Archiving policy engine.

pub mod policy;

pub use policy::{ArchivingPolicyEngine, UpdateOutcome};
