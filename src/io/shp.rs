//! ESRI shapefile output: one polygon shape per record and a dBase table with
//! the same columns as the CSV. dBase names are capped at ten characters, so
//! the count and resolution columns are shortened.

use super::export::IdColumn;
use crate::aggregate::{AggregateRecord, RecordKey};
use crate::error::{Result, ZonalError};
use chrono::NaiveDate;
use geo::{Coord, Geometry, LineString, MultiPolygon, Polygon};
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, PolygonRing};
use std::path::Path;
use tracing::info;

const MEAN_FIELD: &str = "mean_value";
const COUNT_FIELD: &str = "sample_cnt";
const RESOLUTION_FIELD: &str = "h3_res";

fn field_name(name: &str) -> Result<FieldName> {
    FieldName::try_from(name).map_err(|e| ZonalError::Parse(format!("dBase field {:?}: {:?}", name, e)))
}

fn ring_points(line: &LineString<f64>) -> Vec<Point> {
    line.coords().map(|c| Point::new(c.x, c.y)).collect()
}

fn to_shape(geometry: &Geometry<f64>) -> Result<shapefile::Polygon> {
    let polygons: Vec<&Polygon<f64>> = match geometry {
        Geometry::Polygon(polygon) => vec![polygon],
        Geometry::MultiPolygon(parts) => parts.0.iter().collect(),
        _ => {
            return Err(ZonalError::InvalidGeometry(
                "only polygons can be written to an aggregate shapefile".to_string(),
            ));
        }
    };
    let mut rings = Vec::new();
    for polygon in polygons {
        rings.push(PolygonRing::Outer(ring_points(polygon.exterior())));
        rings.extend(polygon.interiors().iter().map(|ring| PolygonRing::Inner(ring_points(ring))));
    }
    Ok(shapefile::Polygon::with_rings(rings))
}

/// Outer rings open a new polygon; inner rings attach to the last one.
fn from_shape(shape: &shapefile::Polygon) -> Result<Geometry<f64>> {
    let mut polygons: Vec<Polygon<f64>> = Vec::new();
    for ring in shape.rings() {
        let (points, outer) = match ring {
            PolygonRing::Outer(points) => (points, true),
            PolygonRing::Inner(points) => (points, false),
        };
        let line = LineString::from(points.iter().map(|p| Coord { x: p.x, y: p.y }).collect::<Vec<_>>());
        if outer {
            polygons.push(Polygon::new(line, Vec::new()));
        } else {
            polygons
                .last_mut()
                .ok_or_else(|| ZonalError::InvalidGeometry("shape starts with an inner ring".to_string()))?
                .interiors_push(line);
        }
    }
    match polygons.len() {
        0 => Err(ZonalError::InvalidGeometry("shape has no rings".to_string())),
        1 => Ok(Geometry::Polygon(polygons.remove(0))),
        _ => Ok(Geometry::MultiPolygon(MultiPolygon::new(polygons))),
    }
}

/// Write `records` as `path` (`.shp`) plus its `.shx` and `.dbf` siblings.
/// Every record needs a polygon geometry; empty means are written as nulls.
pub fn write_aggregate_shapefile<P: AsRef<Path>>(path: P, records: &[AggregateRecord]) -> Result<()> {
    let path = path.as_ref();
    let id_column = IdColumn::for_records(records);
    let shapes = records
        .iter()
        .map(|record| match &record.geometry {
            Some(geometry) => to_shape(geometry),
            None => Err(ZonalError::InvalidGeometry(format!("record {} has no geometry", record.key))),
        })
        .collect::<Result<Vec<_>>>()?;

    let mut table = TableWriterBuilder::new()
        .add_character_field(field_name(id_column.name())?, 80)
        .add_numeric_field(field_name(MEAN_FIELD)?, 19, 6)
        .add_numeric_field(field_name(COUNT_FIELD)?, 10, 0);
    if id_column == IdColumn::H3Index {
        table = table.add_numeric_field(field_name(RESOLUTION_FIELD)?, 2, 0);
    }

    let mut writer = shapefile::Writer::from_path(path, table)?;
    for (record, shape) in records.iter().zip(&shapes) {
        let mut row = Record::default();
        row.insert(
            id_column.name().to_string(),
            FieldValue::Character(Some(record.key.to_string())),
        );
        row.insert(MEAN_FIELD.to_string(), FieldValue::Numeric(record.mean_value));
        row.insert(
            COUNT_FIELD.to_string(),
            FieldValue::Numeric(Some(record.sample_count as f64)),
        );
        if id_column == IdColumn::H3Index {
            row.insert(
                RESOLUTION_FIELD.to_string(),
                FieldValue::Numeric(record.resolution.map(f64::from)),
            );
        }
        writer.write_shape_and_record(shape, &row)?;
    }
    // headers are finalized when the writer drops
    drop(writer);

    info!(path = %path.display(), records = records.len(), "wrote shapefile");
    Ok(())
}

fn numeric(row: &Record, name: &str) -> Option<f64> {
    match row.get(name) {
        Some(FieldValue::Numeric(value)) => *value,
        _ => None,
    }
}

/// Read a shapefile written by `write_aggregate_shapefile`
pub fn read_aggregate_shapefile<P: AsRef<Path>>(path: P) -> Result<Vec<AggregateRecord>> {
    let path = path.as_ref();
    let rows = shapefile::read_as::<_, shapefile::Polygon, Record>(path)?;

    let records = rows
        .into_iter()
        .enumerate()
        .map(|(i, (shape, row))| {
            let (id_column, id) = [IdColumn::RegionId, IdColumn::H3Index, IdColumn::Date]
                .into_iter()
                .find_map(|column| match row.get(column.name()) {
                    Some(FieldValue::Character(Some(text))) => Some((column, text.trim().to_string())),
                    _ => None,
                })
                .ok_or_else(|| ZonalError::Parse(format!("shape {} has no region_id, h3_index or date", i)))?;
            let key = match id_column {
                IdColumn::Date => RecordKey::Date(
                    NaiveDate::parse_from_str(&id, "%Y-%m-%d")
                        .map_err(|_| ZonalError::Parse(format!("shape {}: bad date {:?}", i, id)))?,
                ),
                _ => RecordKey::Region(id),
            };
            let mean_value = numeric(&row, MEAN_FIELD);
            Ok(AggregateRecord {
                key,
                geometry: Some(from_shape(&shape)?),
                mean_value,
                sample_count: numeric(&row, COUNT_FIELD)
                    .map(|count| count as usize)
                    .unwrap_or(usize::from(mean_value.is_some())),
                resolution: numeric(&row, RESOLUTION_FIELD).map(|r| r as u8),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    info!(path = %path.display(), count = records.len(), "loaded shapefile");
    Ok(records)
}
