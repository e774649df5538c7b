//! Repository implementations for all content store entities.

pub mod aoi;
pub mod directory;
pub mod file;
pub mod job;
pub mod tree;

pub use aoi::AoiRepository;
pub use directory::DirectoryRepository;
pub use file::FileRepository;
pub use job::JobRepository;
pub use tree::TreeRepository;

use aoistore_core::error::{AppError, ErrorKind};

/// Map an insert failure, turning unique-index violations into conflicts.
pub(crate) fn insert_error(e: sqlx::Error, what: &str, conflict: impl FnOnce() -> String) -> AppError {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::conflict(conflict())
        }
        _ => AppError::with_source(ErrorKind::Database, format!("Failed to create {what}"), e),
    }
}
