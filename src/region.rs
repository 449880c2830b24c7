use crate::crs::Crs;
use crate::error::{Result, ZonalError};
use crate::geo_adapter;
use geo::{BoundingRect, Geometry, Intersects, Point, Polygon, Rect};

/// A polygon (or multi-part polygon) from a boundary file, e.g. a census block.
#[derive(Debug, Clone, PartialEq)]
pub struct AdministrativeRegion {
    pub region_id: String,
    /// `Polygon` or `MultiPolygon`
    pub geometry: Geometry<f64>,
    pub crs: Crs,
}

impl AdministrativeRegion {
    pub fn new(region_id: impl Into<String>, geometry: impl Into<Geometry<f64>>, crs: Crs) -> Result<Self> {
        let geometry = geometry.into();
        geo_adapter::ensure_areal(&geometry)?;
        Ok(Self {
            region_id: region_id.into(),
            geometry,
            crs,
        })
    }
}

/// One H3 cell produced by the tessellator.
#[derive(Debug, Clone, PartialEq)]
pub struct HexCell {
    /// H3 index string, e.g. `8928308280fffff`
    pub cell_index: String,
    /// `Polygon`, or a two-part `MultiPolygon` for a cell cut by the antimeridian
    pub geometry: Geometry<f64>,
    pub resolution: u8,
    pub crs: Crs,
}

/// Anything observations can be joined to
#[derive(Debug, Clone, PartialEq)]
pub enum Region {
    Administrative(AdministrativeRegion),
    Hex(HexCell),
}

impl Region {
    /// `region_id` or `cell_index`
    pub fn id(&self) -> &str {
        match self {
            Region::Administrative(region) => &region.region_id,
            Region::Hex(cell) => &cell.cell_index,
        }
    }

    pub fn crs(&self) -> Crs {
        match self {
            Region::Administrative(region) => region.crs,
            Region::Hex(cell) => cell.crs,
        }
    }

    pub fn geometry(&self) -> Geometry<f64> {
        match self {
            Region::Administrative(region) => region.geometry.clone(),
            Region::Hex(cell) => cell.geometry.clone(),
        }
    }

    pub fn resolution(&self) -> Option<u8> {
        match self {
            Region::Administrative(_) => None,
            Region::Hex(cell) => Some(cell.resolution),
        }
    }

    pub fn bounding_rect(&self) -> Option<Rect<f64>> {
        match self {
            Region::Administrative(region) => region.geometry.bounding_rect(),
            Region::Hex(cell) => cell.geometry.bounding_rect(),
        }
    }

    /// Point (in the region's CRS) lies inside or on the boundary
    pub fn covers(&self, point: &Point<f64>) -> bool {
        match self {
            Region::Administrative(region) => areal_covers(&region.geometry, point),
            Region::Hex(cell) => areal_covers(&cell.geometry, point),
        }
    }
}

fn areal_covers(geometry: &Geometry<f64>, point: &Point<f64>) -> bool {
    match geometry {
        Geometry::Polygon(polygon) => polygon.intersects(point),
        Geometry::MultiPolygon(parts) => parts.intersects(point),
        _ => false,
    }
}

impl From<AdministrativeRegion> for Region {
    fn from(region: AdministrativeRegion) -> Self {
        Region::Administrative(region)
    }
}

impl From<HexCell> for Region {
    fn from(cell: HexCell) -> Self {
        Region::Hex(cell)
    }
}

/// Area to tessellate: a polygon or a multi-polygon of disjoint parts.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    pub geometry: Geometry<f64>,
    pub crs: Crs,
}

impl Boundary {
    pub fn new(geometry: impl Into<Geometry<f64>>, crs: Crs) -> Result<Self> {
        let geometry = geometry.into();
        geo_adapter::ensure_areal(&geometry)?;
        Ok(Self { geometry, crs })
    }

    /// Simple polygons making up the boundary, in their original order
    pub fn polygons(&self) -> Vec<Polygon<f64>> {
        geo_adapter::split_polygons(&self.geometry)
    }
}

impl TryFrom<Region> for Boundary {
    type Error = ZonalError;

    fn try_from(region: Region) -> Result<Self> {
        let crs = region.crs();
        Boundary::new(region.geometry(), crs)
    }
}
