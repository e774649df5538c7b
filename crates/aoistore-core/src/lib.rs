//! # aoistore-core
//!
//! Core crate for the AOI content store. Contains configuration schemas,
//! the unified error system, and the seams (clock, storage provider) that
//! the service layer is written against.
//!
//! This crate has **no** internal dependencies on other workspace crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
