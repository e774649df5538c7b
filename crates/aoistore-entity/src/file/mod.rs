//! File and version domain entities.

pub mod model;
pub mod version;

pub use model::{CreateFile, File};
pub use version::{CreateFileData, FileData};
