//! Region and boundary loaders (GeoJSON and WKT).
//!
//! The CRS is never read from the file; the caller declares it.

use super::geojson::geometry_from_json;
use crate::crs::Crs;
use crate::error::{Result, ZonalError};
use crate::geo_adapter;
use crate::region::{AdministrativeRegion, Boundary};
use geo::{Geometry, MultiPolygon};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{info, warn};
use wkt::TryFromWkt;

/// `(feature id, geometry)` for every feature of a FeatureCollection, a single
/// Feature, or a bare geometry (which gets no id).
fn features(document: &Value, id_field: &str) -> Result<Vec<(Option<String>, Option<Geometry<f64>>)>> {
    match document.get("type").and_then(Value::as_str) {
        Some("FeatureCollection") => document
            .get("features")
            .and_then(Value::as_array)
            .ok_or_else(|| ZonalError::Parse("FeatureCollection without \"features\"".to_string()))?
            .iter()
            .map(|feature| feature_parts(feature, id_field))
            .collect(),
        Some("Feature") => Ok(vec![feature_parts(document, id_field)?]),
        Some(_) => Ok(vec![(None, Some(geometry_from_json(document)?))]),
        None => Err(ZonalError::Parse("GeoJSON document without \"type\"".to_string())),
    }
}

fn feature_parts(feature: &Value, id_field: &str) -> Result<(Option<String>, Option<Geometry<f64>>)> {
    let id = feature
        .get("properties")
        .and_then(|props| props.get(id_field))
        .and_then(id_text)
        .or_else(|| feature.get("id").and_then(id_text));
    let geometry = match feature.get("geometry") {
        None | Some(Value::Null) => None,
        Some(value) => Some(geometry_from_json(value)?),
    };
    Ok((id, geometry))
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Administrative regions from a GeoJSON document. Each feature needs an id,
/// taken from the `id_field` property or else the feature's own `id`.
pub fn read_regions(text: &str, id_field: &str, crs: Crs) -> Result<Vec<AdministrativeRegion>> {
    let document: Value = serde_json::from_str(text)?;
    let mut regions = Vec::new();
    for (i, (id, geometry)) in features(&document, id_field)?.into_iter().enumerate() {
        let Some(geometry) = geometry else {
            warn!(feature = i, "feature has no geometry, skipped");
            continue;
        };
        let id = id.ok_or_else(|| {
            ZonalError::Parse(format!("feature {} has no {:?} property or id", i, id_field))
        })?;
        regions.push(AdministrativeRegion::new(id, geometry, crs)?);
    }
    Ok(regions)
}

pub fn load_regions<P: AsRef<Path>>(path: P, id_field: &str, crs: Crs) -> Result<Vec<AdministrativeRegion>> {
    let path = path.as_ref();
    let regions = read_regions(&fs::read_to_string(path)?, id_field, crs)?;
    info!(path = %path.display(), count = regions.len(), %crs, "loaded regions");
    Ok(regions)
}

/// Tessellation boundary from a GeoJSON document: the polygons of every feature,
/// merged into one multipolygon.
pub fn boundary_from_geojson(text: &str, crs: Crs) -> Result<Boundary> {
    let document: Value = serde_json::from_str(text)?;
    let mut polygons: Vec<_> = features(&document, "")?
        .into_iter()
        .filter_map(|(_, geometry)| geometry)
        .flat_map(|geometry| geo_adapter::split_polygons(&geometry))
        .collect();
    match polygons.len() {
        0 => Err(ZonalError::InvalidGeometry("boundary document has no polygons".to_string())),
        1 => Boundary::new(polygons.remove(0), crs),
        _ => Boundary::new(MultiPolygon::new(polygons), crs),
    }
}

/// Tessellation boundary from WKT text (`POLYGON` or `MULTIPOLYGON`)
pub fn boundary_from_wkt(text: &str, crs: Crs) -> Result<Boundary> {
    let geometry = Geometry::<f64>::try_from_wkt_str(text.trim())
        .map_err(|e| ZonalError::Parse(format!("WKT boundary: {}", e)))?;
    Boundary::new(geometry, crs)
}

/// Load a boundary file; `.wkt` files are read as WKT, anything else as GeoJSON.
pub fn load_boundary<P: AsRef<Path>>(path: P, crs: Crs) -> Result<Boundary> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let is_wkt = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wkt"));
    let boundary = if is_wkt {
        boundary_from_wkt(&text, crs)?
    } else {
        boundary_from_geojson(&text, crs)?
    };
    info!(path = %path.display(), parts = boundary.polygons().len(), %crs, "loaded boundary");
    Ok(boundary)
}
