//! Node lifecycle: removal, deactivation and destruction.

pub mod service;

pub use service::LifecycleManager;
