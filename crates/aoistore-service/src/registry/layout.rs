//! Names and required layers of the AOI bundle layout.

/// Suffix of geodatabase bundles.
pub const GDB_SUFFIX: &str = ".gdb";

pub const AOI_GDB: &str = "aoi";
pub const SURFACES_GDB: &str = "surfaces";
pub const LAYERS_GDB: &str = "layers";
pub const ANALYSIS_GDB: &str = "analysis";
pub const PRISM_GDB: &str = "prism";
pub const PARAM_GDB: &str = "param";

pub const ZONES_DIR: &str = "zones";
pub const MAPS_DIR: &str = "maps";

/// Log written next to each HRU zone geodatabase.
pub const HRU_LOG_FILE: &str = "log.xml";
pub const MAP_ANALYSIS_FILE: &str = "analysis.xml";
pub const MAP_PARAMETERS_FILE: &str = "map_parameters.txt";
pub const MAP_DOCUMENT_EXTENSION: &str = "mxd";

pub const AOI_REQUIRED_VECTORS: &[&str] = &["aoi_v", "aoib_v", "p_aoi_v", "pourpoint"];
pub const AOI_REQUIRED_RASTERS: &[&str] = &["aoib", "p_aoi"];
/// At least one of these boundary rasters must be present.
pub const AOI_BOUNDARY_RASTERS: &[&str] = &["aoi", "aoibagis"];

pub const SURFACES_REQUIRED_RASTERS: &[&str] = &[
    "aspect",
    "dem_filled",
    "flow_accumulation",
    "flow_direction",
    "slope",
];

pub const PRISM_REQUIRED_RASTERS: &[&str] = &[
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec", "Q1",
    "Q2", "Q3", "Q4", "Annual",
];

pub const HRU_RASTERS: &[&str] = &["grid"];
pub const HRU_VECTORS: &[&str] = &["grid_v", "grid_zones_v"];

/// `<name>.gdb`
pub fn gdb_name(name: &str) -> String {
    format!("{name}{GDB_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prism_has_seventeen_layers() {
        assert_eq!(PRISM_REQUIRED_RASTERS.len(), 17);
        assert_eq!(gdb_name(PRISM_GDB), "prism.gdb");
    }
}
