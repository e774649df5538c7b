//! Structural validation of an AOI bundle before anything is created.

use std::collections::HashSet;

use aoistore_core::error::AppError;
use aoistore_core::result::AppResult;

use super::source::{ContentSource, LayerKind};
use crate::registry::aoi_directory::COMPONENTS;
use crate::registry::layout;

/// Names (lowercased) of the layers of one kind in a geodatabase.
async fn layer_names(gdb: &dyn ContentSource, kind: LayerKind) -> AppResult<HashSet<String>> {
    Ok(gdb
        .layers()
        .await?
        .into_iter()
        .filter(|l| l.kind == kind)
        .map(|l| l.name.to_ascii_lowercase())
        .collect())
}

fn missing<'a>(present: &HashSet<String>, required: &[&'a str]) -> Vec<&'a str> {
    required
        .iter()
        .copied()
        .filter(|name| !present.contains(&name.to_ascii_lowercase()))
        .collect()
}

/// Checks that every required component and layer is present.
///
/// All problems are collected and reported as one validation error.
pub async fn validate_aoi_bundle(source: &dyn ContentSource) -> AppResult<()> {
    let mut problems = Vec::new();

    for component in COMPONENTS.iter().filter(|c| c.required) {
        if source.child(component.entry).await?.is_none() {
            problems.push(format!("missing {}", component.entry));
        }
    }

    if let Some(aoi_gdb) = source.child(&layout::gdb_name(layout::AOI_GDB)).await? {
        let vectors = layer_names(aoi_gdb.as_ref(), LayerKind::Vector).await?;
        let rasters = layer_names(aoi_gdb.as_ref(), LayerKind::Raster).await?;
        for name in missing(&vectors, layout::AOI_REQUIRED_VECTORS) {
            problems.push(format!("aoi.gdb: missing vector '{name}'"));
        }
        for name in missing(&rasters, layout::AOI_REQUIRED_RASTERS) {
            problems.push(format!("aoi.gdb: missing raster '{name}'"));
        }
        if missing(&rasters, layout::AOI_BOUNDARY_RASTERS).len() == layout::AOI_BOUNDARY_RASTERS.len() {
            problems.push(format!(
                "aoi.gdb: needs one of the rasters {}",
                layout::AOI_BOUNDARY_RASTERS.join(", ")
            ));
        }
    }

    for (gdb, required) in [
        (layout::SURFACES_GDB, layout::SURFACES_REQUIRED_RASTERS),
        (layout::PRISM_GDB, layout::PRISM_REQUIRED_RASTERS),
    ] {
        let Some(bundle) = source.child(&layout::gdb_name(gdb)).await? else {
            continue;
        };
        let rasters = layer_names(bundle.as_ref(), LayerKind::Raster).await?;
        for name in missing(&rasters, required) {
            problems.push(format!("{}: missing raster '{name}'", layout::gdb_name(gdb)));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "AOI source {} is incomplete: {}",
            source.location().display(),
            problems.join("; ")
        )))
    }
}
