//! Content storage layout configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where managed content, exports and scratch files live on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for all managed content.
    #[serde(default = "default_data_root")]
    pub data_root: String,
    /// Directory under `data_root` that holds one directory per AOI.
    #[serde(default = "default_aoi_dir")]
    pub aoi_dir: String,
    /// Directory that receives snapshot exports requested through jobs.
    #[serde(default = "default_export_root")]
    pub export_root: String,
    /// Scratch space for unpacking uploaded bundles.
    #[serde(default = "default_temp_root")]
    pub temp_root: String,
}

impl StorageConfig {
    /// Absolute (or cwd-relative) path of the data root.
    pub fn data_root_path(&self) -> PathBuf {
        PathBuf::from(&self.data_root)
    }

    /// Export directory, resolved against `data_root` when relative.
    pub fn export_root_path(&self) -> PathBuf {
        self.data_root_path().join(&self.export_root)
    }

    /// Temp directory, resolved against `data_root` when relative.
    pub fn temp_root_path(&self) -> PathBuf {
        self.data_root_path().join(&self.temp_root)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            aoi_dir: default_aoi_dir(),
            export_root: default_export_root(),
            temp_root: default_temp_root(),
        }
    }
}

fn default_data_root() -> String {
    "./data".to_string()
}

fn default_aoi_dir() -> String {
    "aois".to_string()
}

fn default_export_root() -> String {
    "exports".to_string()
}

fn default_temp_root() -> String {
    "tmp".to_string()
}
