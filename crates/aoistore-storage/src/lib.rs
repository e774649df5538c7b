//! # aoistore-storage
//!
//! Storage provider implementations for the content store. Only the local
//! filesystem is supported; every path handed to a provider is relative to
//! its root.

pub mod checksum;
pub mod providers;

pub use checksum::{sha256_file, sha256_hex};
pub use providers::LocalStorageProvider;
