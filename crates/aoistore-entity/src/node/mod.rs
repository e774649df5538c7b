//! Shared node vocabulary: references, lifecycle state and creation status.

pub mod reference;
pub mod state;

pub use reference::{NodeKind, NodeRef};
pub use state::{NodeLifecycle, NodeState, NodeStatus};
