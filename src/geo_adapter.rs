//! Geometry plumbing between the aggregators and the `geo`/`crs` layers:
//! areal checks, multi-polygon splitting, reprojection and metric buffers.

use crate::crs::Crs;
use crate::error::{Result, ZonalError};
use geo::{Coord, Geometry, LineString, MapCoords, Point, Polygon};
use std::f64::consts::TAU;
use tracing::debug;

pub fn ensure_areal(geometry: &Geometry<f64>) -> Result<()> {
    match geometry {
        Geometry::Polygon(_) | Geometry::MultiPolygon(_) => Ok(()),
        other => Err(ZonalError::InvalidGeometry(format!(
            "expected Polygon or MultiPolygon, got {}",
            geometry_kind(other)
        ))),
    }
}

/// Break a multi-polygon into its parts so each is tiled on its own; tiling the
/// union would fill the gaps between disjoint parts.
pub fn split_polygons(geometry: &Geometry<f64>) -> Vec<Polygon<f64>> {
    match geometry {
        Geometry::Polygon(polygon) => vec![polygon.clone()],
        Geometry::MultiPolygon(parts) => parts.0.clone(),
        _ => Vec::new(),
    }
}

pub fn reproject_geometry(geometry: &Geometry<f64>, from: Crs, to: Crs) -> Result<Geometry<f64>> {
    if from == to {
        return Ok(geometry.clone());
    }
    geometry.try_map_coords(|coord| from.transform(coord, to))
}

/// Project a WGS84 point into `target`
pub fn project_point(point: Point<f64>, target: Crs) -> Result<Point<f64>> {
    Ok(Point::from(target.from_wgs84(point.0)?))
}

/// Circular buffer drawn in a metric CRS around a WGS84 centre.
///
/// Membership is decided on the exact circle (planar distance <= radius), not
/// on a segmented polygon, so points on the rim are included.
#[derive(Debug, Clone)]
pub struct MetricBuffer {
    crs: Crs,
    center: Coord<f64>,
    radius_m: f64,
}

impl MetricBuffer {
    /// `metric_crs` defaults to the UTM zone containing `center`
    pub fn new(center: Point<f64>, radius_m: f64, metric_crs: Option<Crs>) -> Result<Self> {
        if !radius_m.is_finite() || radius_m <= 0.0 {
            return Err(ZonalError::InvalidRadius(radius_m));
        }
        let crs = metric_crs.unwrap_or_else(|| Crs::utm_for(center.x(), center.y()));
        if !crs.is_metric() {
            return Err(ZonalError::CrsMismatch(format!(
                "{} does not measure ground distance in metres; use a UTM zone",
                crs
            )));
        }
        let center = crs.from_wgs84(center.0)?;
        debug!(%crs, x = center.x, y = center.y, radius_m, "buffer_created");
        Ok(Self { crs, center, radius_m })
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_m
    }

    /// Buffer centre in the metric CRS
    pub fn center(&self) -> Coord<f64> {
        self.center
    }

    /// Planar distance in metres from the centre to a WGS84 point
    pub fn distance_to(&self, point: Point<f64>) -> Result<f64> {
        let projected = self.crs.from_wgs84(point.0)?;
        Ok((projected.x - self.center.x).hypot(projected.y - self.center.y))
    }

    pub fn contains(&self, point: Point<f64>) -> Result<bool> {
        Ok(self.distance_to(point)? <= self.radius_m)
    }

    /// Segmented polygon of the buffer rim, in WGS84, for export and plotting
    pub fn to_wgs84_polygon(&self, segments: usize) -> Result<Polygon<f64>> {
        let segments = segments.max(8);
        let ring = (0..segments)
            .map(|i| {
                let angle = TAU * i as f64 / segments as f64;
                self.crs.to_wgs84(Coord {
                    x: self.center.x + self.radius_m * angle.cos(),
                    y: self.center.y + self.radius_m * angle.sin(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Polygon::new(LineString::from(ring), Vec::new()))
    }
}

fn geometry_kind(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::LineString(_) => "LineString",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        _ => "non-areal geometry",
    }
}
