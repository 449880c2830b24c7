//! Coordinate reference systems understood by the engine.
//!
//! Only the projections the pipeline actually needs are supported: geographic
//! WGS84, spherical Web Mercator (map rendering) and UTM (metric buffers and
//! projected boundary files). Everything converts through WGS84.

pub mod transverse_mercator;

use crate::constants::{
    UTM_FALSE_EASTING_M, UTM_FALSE_NORTHING_SOUTH_M, UTM_SCALE_FACTOR, UTM_ZONE_WIDTH_DEG,
    WEB_MERCATOR_MAX_LAT, WEB_MERCATOR_RADIUS_M,
};
use crate::error::{Result, ZonalError};
use geo::Coord;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::f64::consts::FRAC_PI_4;
use std::fmt;
use std::str::FromStr;
use transverse_mercator::TransverseMercator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Crs {
    /// EPSG:4326, degrees in (lng, lat) order
    #[default]
    Wgs84,
    /// EPSG:3857
    WebMercator,
    /// EPSG:326zz (north) / EPSG:327zz (south). NAD83 zones (EPSG:269zz) map
    /// onto the WGS84 zone of the same number.
    Utm { zone: u8, north: bool },
}

impl Crs {
    /// UTM zone containing a WGS84 location. Zone exceptions around Norway and
    /// Svalbard are not applied.
    pub fn utm_for(lng: f64, lat: f64) -> Crs {
        let zone = ((lng + 180.0) / UTM_ZONE_WIDTH_DEG).floor() as i32 + 1;
        Crs::Utm {
            zone: zone.clamp(1, 60) as u8,
            north: lat >= 0.0,
        }
    }

    pub fn epsg(&self) -> u32 {
        match *self {
            Crs::Wgs84 => 4326,
            Crs::WebMercator => 3857,
            Crs::Utm { zone, north: true } => 32600 + zone as u32,
            Crs::Utm { zone, north: false } => 32700 + zone as u32,
        }
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::Wgs84)
    }

    /// True when planar distances are ground metres (to within the projection's
    /// scale error), so a buffer can be drawn directly in it.
    pub fn is_metric(&self) -> bool {
        matches!(self, Crs::Utm { .. })
    }

    /// Project a WGS84 (lng, lat) coordinate into this CRS
    pub fn from_wgs84(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        check_lng_lat(coord)?;
        match *self {
            Crs::Wgs84 => Ok(coord),
            Crs::WebMercator => {
                if coord.y.abs() > WEB_MERCATOR_MAX_LAT {
                    return Err(ZonalError::CrsMismatch(format!(
                        "latitude {} is outside the Web Mercator range",
                        coord.y
                    )));
                }
                Ok(Coord {
                    x: WEB_MERCATOR_RADIUS_M * coord.x.to_radians(),
                    y: WEB_MERCATOR_RADIUS_M * (FRAC_PI_4 + coord.y.to_radians() / 2.0).tan().ln(),
                })
            }
            Crs::Utm { zone, north } => {
                let (x, y) = utm_projection(zone, north).forward(coord.x, coord.y);
                Ok(Coord { x, y })
            }
        }
    }

    /// Convert a coordinate in this CRS back to WGS84 (lng, lat)
    pub fn to_wgs84(&self, coord: Coord<f64>) -> Result<Coord<f64>> {
        if !coord.x.is_finite() || !coord.y.is_finite() {
            return Err(ZonalError::InvalidGeometry(format!(
                "non-finite coordinate ({}, {})",
                coord.x, coord.y
            )));
        }
        let lng_lat = match *self {
            Crs::Wgs84 => coord,
            Crs::WebMercator => Coord {
                x: (coord.x / WEB_MERCATOR_RADIUS_M).to_degrees(),
                y: (2.0 * (coord.y / WEB_MERCATOR_RADIUS_M).exp().atan() - 2.0 * FRAC_PI_4)
                    .to_degrees(),
            },
            Crs::Utm { zone, north } => {
                let (x, y) = utm_projection(zone, north).inverse(coord.x, coord.y);
                Coord { x, y }
            }
        };
        check_lng_lat(lng_lat)?;
        Ok(lng_lat)
    }

    /// Transform a coordinate from this CRS into `target`
    pub fn transform(&self, coord: Coord<f64>, target: Crs) -> Result<Coord<f64>> {
        if *self == target {
            return Ok(coord);
        }
        target.from_wgs84(self.to_wgs84(coord)?)
    }
}

fn utm_projection(zone: u8, north: bool) -> TransverseMercator {
    let lon0 = (zone as f64 - 1.0) * UTM_ZONE_WIDTH_DEG - 180.0 + UTM_ZONE_WIDTH_DEG / 2.0;
    let false_northing = if north { 0.0 } else { UTM_FALSE_NORTHING_SOUTH_M };
    TransverseMercator::new(lon0, UTM_SCALE_FACTOR, UTM_FALSE_EASTING_M, false_northing)
}

fn check_lng_lat(coord: Coord<f64>) -> Result<()> {
    if !coord.x.is_finite() || !coord.y.is_finite() || coord.y.abs() > 90.0 || coord.x.abs() > 540.0 {
        return Err(ZonalError::InvalidGeometry(format!(
            "({}, {}) is not a valid WGS84 (lng, lat) coordinate",
            coord.x, coord.y
        )));
    }
    Ok(())
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

impl FromStr for Crs {
    type Err = ZonalError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let code = trimmed
            .strip_prefix("EPSG:")
            .or_else(|| trimmed.strip_prefix("epsg:"))
            .unwrap_or(trimmed);
        let unsupported = || ZonalError::CrsMismatch(format!("unsupported CRS {:?}", s));
        let code: u32 = code.parse().map_err(|_| unsupported())?;

        match code {
            4326 => Ok(Crs::Wgs84),
            3857 | 900913 => Ok(Crs::WebMercator),
            32601..=32660 => Ok(Crs::Utm { zone: (code - 32600) as u8, north: true }),
            32701..=32760 => Ok(Crs::Utm { zone: (code - 32700) as u8, north: false }),
            26901..=26923 => Ok(Crs::Utm { zone: (code - 26900) as u8, north: true }),
            _ => Err(unsupported()),
        }
    }
}

impl Serialize for Crs {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Crs {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
