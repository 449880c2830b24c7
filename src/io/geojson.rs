//! Conversion between `geo` geometries and GeoJSON geometry objects.
//!
//! Only the areal types the engine works with (and points, for completeness)
//! are handled; positions are `[x, y]` in whatever CRS the caller is in.

use crate::error::{Result, ZonalError};
use geo::{Coord, Geometry, LineString, MultiPolygon, Point, Polygon};
use serde_json::{Value, json};

fn position(coord: &Coord<f64>) -> Value {
    json!([coord.x, coord.y])
}

fn ring(line: &LineString<f64>) -> Value {
    Value::Array(line.coords().map(position).collect())
}

fn polygon_rings(polygon: &Polygon<f64>) -> Value {
    let mut rings = vec![ring(polygon.exterior())];
    rings.extend(polygon.interiors().iter().map(ring));
    Value::Array(rings)
}

pub fn geometry_to_json(geometry: &Geometry<f64>) -> Result<Value> {
    match geometry {
        Geometry::Point(point) => Ok(json!({"type": "Point", "coordinates": position(&point.0)})),
        Geometry::Polygon(polygon) => Ok(json!({"type": "Polygon", "coordinates": polygon_rings(polygon)})),
        Geometry::MultiPolygon(multi) => Ok(json!({
            "type": "MultiPolygon",
            "coordinates": multi.0.iter().map(polygon_rings).collect::<Vec<_>>(),
        })),
        _ => Err(ZonalError::InvalidGeometry(
            "only Point, Polygon and MultiPolygon geometries can be written as GeoJSON".to_string(),
        )),
    }
}

fn parse_position(value: &Value) -> Result<Coord<f64>> {
    let items = value
        .as_array()
        .filter(|items| items.len() >= 2)
        .ok_or_else(|| ZonalError::Parse(format!("GeoJSON position expected, got {}", value)))?;
    match (items[0].as_f64(), items[1].as_f64()) {
        (Some(x), Some(y)) => Ok(Coord { x, y }),
        _ => Err(ZonalError::Parse(format!("non-numeric GeoJSON position {}", value))),
    }
}

fn parse_ring(value: &Value) -> Result<LineString<f64>> {
    let positions = value
        .as_array()
        .ok_or_else(|| ZonalError::Parse("GeoJSON ring must be an array".to_string()))?;
    Ok(LineString::new(
        positions.iter().map(parse_position).collect::<Result<Vec<_>>>()?,
    ))
}

fn parse_polygon(value: &Value) -> Result<Polygon<f64>> {
    let rings = value
        .as_array()
        .ok_or_else(|| ZonalError::Parse("GeoJSON polygon must be an array of rings".to_string()))?;
    let mut rings = rings.iter().map(parse_ring).collect::<Result<Vec<_>>>()?.into_iter();
    let exterior = rings
        .next()
        .ok_or_else(|| ZonalError::InvalidGeometry("polygon without exterior ring".to_string()))?;
    Ok(Polygon::new(exterior, rings.collect()))
}

/// Parse a GeoJSON geometry object
pub fn geometry_from_json(value: &Value) -> Result<Geometry<f64>> {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ZonalError::Parse("GeoJSON geometry without \"type\"".to_string()))?;
    let coordinates = value
        .get("coordinates")
        .ok_or_else(|| ZonalError::Parse(format!("{} without \"coordinates\"", kind)))?;

    match kind {
        "Point" => Ok(Geometry::Point(Point(parse_position(coordinates)?))),
        "Polygon" => Ok(Geometry::Polygon(parse_polygon(coordinates)?)),
        "MultiPolygon" => {
            let polygons = coordinates
                .as_array()
                .ok_or_else(|| ZonalError::Parse("MultiPolygon coordinates must be an array".to_string()))?
                .iter()
                .map(parse_polygon)
                .collect::<Result<Vec<_>>>()?;
            Ok(Geometry::MultiPolygon(MultiPolygon::new(polygons)))
        }
        other => Err(ZonalError::InvalidGeometry(format!(
            "unsupported GeoJSON geometry type {}",
            other
        ))),
    }
}
