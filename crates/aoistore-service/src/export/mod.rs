//! Point-in-time snapshot export.

pub mod engine;

pub use engine::{ExportReport, SnapshotExportEngine, select_directories, select_version};
