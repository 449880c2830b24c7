//! Hexagon tessellation of an arbitrary boundary.
//!
//! Each simple polygon of the boundary is tiled on its own with H3 cells, then
//! the per-polygon sets are merged and deduplicated. A polygon too small to
//! produce any cell still yields one: the cell under its centroid.

use crate::crs::Crs;
use crate::error::{Result, ZonalError};
use crate::geo_adapter;
use crate::h3_utils::{Containment, H3Utils};
use crate::region::{Boundary, HexCell};
use geo::{Centroid, Polygon};
use h3o::{CellIndex, Resolution};
use rayon::prelude::*;
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TessellationConfig {
    #[serde(default)]
    pub containment: Containment,
}

#[derive(Debug, Clone, Default)]
pub struct HexagonTessellator {
    config: TessellationConfig,
}

impl HexagonTessellator {
    pub fn new(config: TessellationConfig) -> Self {
        Self { config }
    }

    /// Cells covering `boundary` at `resolution`, sorted by index.
    ///
    /// Output geometry is in the boundary's CRS. Identical inputs always give
    /// identical cells.
    pub fn tessellate(&self, boundary: &Boundary, resolution: u8) -> Result<Vec<HexCell>> {
        let h3_resolution = H3Utils::resolution(resolution)?;

        let geographic = geo_adapter::reproject_geometry(&boundary.geometry, boundary.crs, Crs::Wgs84)?;
        let polygons = geo_adapter::split_polygons(&geographic);

        let per_polygon = polygons
            .par_iter()
            .enumerate()
            .map(|(part, polygon)| self.tile_polygon(part, polygon, h3_resolution))
            .collect::<Result<Vec<_>>>()?;

        let cells: BTreeSet<CellIndex> = per_polygon.into_iter().flatten().collect();

        let hex_cells = cells
            .into_iter()
            .map(|cell| {
                let geometry = geo_adapter::reproject_geometry(
                    &H3Utils::cell_geometry(cell),
                    Crs::Wgs84,
                    boundary.crs,
                )?;
                Ok(HexCell {
                    cell_index: cell.to_string(),
                    geometry,
                    resolution,
                    crs: boundary.crs,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            parts = polygons.len(),
            resolution,
            cells = hex_cells.len(),
            "tessellated boundary"
        );
        Ok(hex_cells)
    }

    fn tile_polygon(&self, part: usize, polygon: &Polygon<f64>, resolution: Resolution) -> Result<Vec<CellIndex>> {
        if polygon.exterior().0.is_empty() {
            debug!(part, "skipping empty polygon");
            return Ok(Vec::new());
        }

        let cells = H3Utils::tile(polygon, resolution, self.config.containment)?;
        if !cells.is_empty() {
            debug!(part, cells = cells.len(), "tiled polygon");
            return Ok(cells);
        }

        let centroid = polygon
            .centroid()
            .ok_or_else(|| ZonalError::InvalidGeometry(format!("polygon {} has no centroid", part)))?;
        debug!(
            part,
            lng = centroid.x(),
            lat = centroid.y(),
            "polygon smaller than a cell, using centroid cell"
        );
        Ok(vec![H3Utils::cell_at(centroid, resolution)?])
    }
}
