//! H3 helpers
//!
//! Everything that touches `h3o` coordinates goes through here. H3 reports
//! positions latitude-first; the rest of the crate (and `geo`) is
//! longitude-first, so the axis swap happens in this module and nowhere else.

use crate::constants::MAX_H3_RESOLUTION;
use crate::error::{Result, ZonalError};
use geo::{BooleanOps, Coord, Geometry, LineString, MultiPolygon, Point, Polygon, Rect, Translate};
use h3o::geom::{ContainmentMode, TilerBuilder};
use h3o::{CellIndex, LatLng, Resolution};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which cells a polygon tiling keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Containment {
    /// every cell that fully or partially intersects the polygon
    #[default]
    Intersects,
    /// only cells whose centre lies inside the polygon
    Centroid,
}

impl From<Containment> for ContainmentMode {
    fn from(containment: Containment) -> Self {
        match containment {
            Containment::Intersects => ContainmentMode::IntersectsBoundary,
            Containment::Centroid => ContainmentMode::ContainsCentroid,
        }
    }
}

pub struct H3Utils;

impl H3Utils {
    /// Validate a numeric resolution tier (0 = coarsest)
    pub fn resolution(level: u8) -> Result<Resolution> {
        if level > MAX_H3_RESOLUTION {
            return Err(ZonalError::InvalidResolution(level));
        }
        Resolution::try_from(level).map_err(|_| ZonalError::InvalidResolution(level))
    }

    /// Cell containing a WGS84 (lng, lat) point
    pub fn cell_at(point: Point<f64>, resolution: Resolution) -> Result<CellIndex> {
        let lat_lng = LatLng::new(point.y(), point.x()).map_err(|e| {
            ZonalError::InvalidGeometry(format!("({}, {}): {}", point.x(), point.y(), e))
        })?;
        Ok(lat_lng.to_cell(resolution))
    }

    /// Cell centre as a (lng, lat) point
    pub fn cell_center(cell: CellIndex) -> Point<f64> {
        let center = LatLng::from(cell);
        Point::new(center.lng(), center.lat())
    }

    /// Cell boundary in (lng, lat).
    ///
    /// A cell straddling the antimeridian comes back as a two-part
    /// `MultiPolygon` cut at ±180°, so neither part wraps around the globe.
    /// Cells containing a pole are not split.
    pub fn cell_geometry(cell: CellIndex) -> Geometry<f64> {
        let ring: Vec<Coord<f64>> = cell
            .boundary()
            .iter()
            .map(|vertex| Coord {
                x: vertex.lng(),
                y: vertex.lat(),
            })
            .collect();
        if !crosses_antimeridian(&ring) {
            return Geometry::Polygon(Polygon::new(LineString::from(ring), Vec::new()));
        }

        // continuous on 0..360, then cut at 180 and shift the east half back
        let unwrapped: Vec<Coord<f64>> = ring
            .iter()
            .map(|c| Coord {
                x: if c.x < 0.0 { c.x + 360.0 } else { c.x },
                y: c.y,
            })
            .collect();
        let shape = Polygon::new(LineString::from(unwrapped), Vec::new());
        let west = shape.intersection(&Rect::new(Coord { x: 0.0, y: -90.0 }, Coord { x: 180.0, y: 90.0 }).to_polygon());
        let east = shape
            .intersection(&Rect::new(Coord { x: 180.0, y: -90.0 }, Coord { x: 360.0, y: 90.0 }).to_polygon())
            .translate(-360.0, 0.0);
        Geometry::MultiPolygon(MultiPolygon::new(west.into_iter().chain(east).collect()))
    }

    /// Cells covering a single WGS84 polygon. May be empty when the polygon is
    /// smaller than a cell and `Containment::Centroid` is used.
    pub fn tile(
        polygon: &Polygon<f64>,
        resolution: Resolution,
        containment: Containment,
    ) -> Result<Vec<CellIndex>> {
        let mut tiler = TilerBuilder::new(resolution)
            .containment_mode(containment.into())
            .build();
        tiler
            .add(polygon.clone())
            .map_err(|e| ZonalError::InvalidGeometry(e.to_string()))?;
        Ok(tiler.into_coverage().collect())
    }

    pub fn parse_cell(index: &str) -> Result<CellIndex> {
        CellIndex::from_str(index)
            .map_err(|e| ZonalError::Parse(format!("H3 index {:?}: {}", index, e)))
    }
}

/// Some edge of the (unclosed) ring jumps more than half the globe in longitude
fn crosses_antimeridian(ring: &[Coord<f64>]) -> bool {
    ring.iter()
        .zip(ring.iter().cycle().skip(1))
        .any(|(a, b)| (a.x - b.x).abs() > 180.0)
}
