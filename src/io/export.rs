//! Aggregate and hotspot writers, plus the reader the `hotspots` step uses to
//! pick a previous run's output back up.
//!
//! One run is written twice, as CSV (geometry as a WKT column) and as a GeoJSON
//! FeatureCollection. Both carry the same records in the same order.

use super::geojson::geometry_to_json;
use super::shp::{read_aggregate_shapefile, write_aggregate_shapefile};
use crate::aggregate::{AggregateRecord, PeakResult, RecordKey};
use crate::constants::FILE_TIME_FORMAT;
use crate::error::{Result, ZonalError};
use crate::observation::TimeWindow;
use chrono::NaiveDate;
use geo::Geometry;
use serde_json::{Map, Value, json};
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use wkt::{ToWkt, TryFromWkt};

/// Which identifier column a set of records is written with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdColumn {
    RegionId,
    H3Index,
    Date,
}

impl IdColumn {
    pub fn name(&self) -> &'static str {
        match self {
            IdColumn::RegionId => "region_id",
            IdColumn::H3Index => "h3_index",
            IdColumn::Date => "date",
        }
    }

    /// Decided by the first record; an empty set is written as regions.
    pub fn for_records(records: &[AggregateRecord]) -> Self {
        match records.first() {
            Some(AggregateRecord { key: RecordKey::Date(_), .. }) => IdColumn::Date,
            Some(AggregateRecord { resolution: Some(_), .. }) => IdColumn::H3Index,
            _ => IdColumn::RegionId,
        }
    }

    fn from_header(header: &csv::StringRecord) -> Result<(Self, usize)> {
        [IdColumn::RegionId, IdColumn::H3Index, IdColumn::Date]
            .into_iter()
            .find_map(|column| {
                header
                    .iter()
                    .position(|name| name == column.name())
                    .map(|index| (column, index))
            })
            .ok_or_else(|| ZonalError::Parse("aggregate CSV has no region_id, h3_index or date column".to_string()))
    }
}

// ---- file names ----

fn window_suffix(window: &TimeWindow) -> String {
    format!(
        "{}_{}",
        window.begin().format(FILE_TIME_FORMAT),
        window.end().format(FILE_TIME_FORMAT)
    )
}

/// `spatial_aggregate_{label}_{pollutant}_{begin}_{end}`
pub fn spatial_stem(label: &str, pollutant: &str, window: &TimeWindow) -> String {
    format!("spatial_aggregate_{}_{}_{}", label, pollutant, window_suffix(window))
}

/// `spatial_aggregate_{label}_hexagon_{pollutant}_{begin}_{end}`
pub fn hexagon_stem(label: &str, pollutant: &str, window: &TimeWindow) -> String {
    format!("spatial_aggregate_{}_hexagon_{}_{}", label, pollutant, window_suffix(window))
}

/// `temporal_aggregate_{label}_{pollutant}`
pub fn temporal_stem(label: &str, pollutant: &str) -> String {
    format!("temporal_aggregate_{}_{}", label, pollutant)
}

// ---- CSV ----

fn mean_text(mean: Option<f64>) -> String {
    mean.map(|v| v.to_string()).unwrap_or_default()
}

pub fn write_aggregate_csv<W: Write>(writer: W, records: &[AggregateRecord]) -> Result<()> {
    let id_column = IdColumn::for_records(records);
    let with_geometry = records.iter().any(|r| r.geometry.is_some());

    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut header = vec![id_column.name(), "mean_value", "sample_count"];
    if id_column == IdColumn::H3Index {
        header.push("h3_resolution");
    }
    if with_geometry {
        header.push("geometry");
    }
    csv_writer.write_record(&header)?;

    for record in records {
        let mut row = vec![
            record.key.to_string(),
            mean_text(record.mean_value),
            record.sample_count.to_string(),
        ];
        if id_column == IdColumn::H3Index {
            row.push(record.resolution.map(|r| r.to_string()).unwrap_or_default());
        }
        if with_geometry {
            row.push(record.geometry.as_ref().map(|g| g.wkt_string()).unwrap_or_default());
        }
        csv_writer.write_record(&row)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Read an aggregate CSV written by `write_aggregate_csv`. `avg_value` is
/// accepted in place of `mean_value`.
pub fn read_aggregate_csv<R: Read>(reader: R) -> Result<Vec<AggregateRecord>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let header = csv_reader.headers()?.clone();
    let (id_column, id_index) = IdColumn::from_header(&header)?;
    let column = |name: &str| header.iter().position(|h| h == name);
    let mean_index = column("mean_value")
        .or_else(|| column("avg_value"))
        .ok_or_else(|| ZonalError::Parse("aggregate CSV has no mean_value column".to_string()))?;
    let count_index = column("sample_count");
    let resolution_index = column("h3_resolution");
    let geometry_index = column("geometry");

    let mut records = Vec::new();
    for (row_number, row) in csv_reader.records().enumerate() {
        let row = row?;
        let line = row_number + 2;
        let bad = |what: &str, text: &str| ZonalError::Parse(format!("aggregate line {}: bad {} {:?}", line, what, text));
        let field = |index: Option<usize>| index.and_then(|i| row.get(i)).map(str::trim).filter(|s| !s.is_empty());

        let id = row.get(id_index).unwrap_or_default().trim();
        let key = match id_column {
            IdColumn::Date => RecordKey::Date(
                NaiveDate::parse_from_str(id, "%Y-%m-%d").map_err(|_| bad("date", id))?,
            ),
            _ => RecordKey::Region(id.to_string()),
        };
        let mean_value = field(Some(mean_index))
            .map(|text| text.parse::<f64>().map_err(|_| bad("mean_value", text)))
            .transpose()?;
        let sample_count = match field(count_index) {
            Some(text) => text.parse::<usize>().map_err(|_| bad("sample_count", text))?,
            None => usize::from(mean_value.is_some()),
        };
        let resolution = field(resolution_index)
            .map(|text| text.parse::<u8>().map_err(|_| bad("h3_resolution", text)))
            .transpose()?;
        let geometry = field(geometry_index)
            .map(|text| Geometry::<f64>::try_from_wkt_str(text).map_err(|_| bad("geometry", text)))
            .transpose()?;

        records.push(AggregateRecord {
            key,
            geometry,
            mean_value,
            sample_count,
            resolution,
        });
    }
    Ok(records)
}

pub fn load_aggregate_csv<P: AsRef<Path>>(path: P) -> Result<Vec<AggregateRecord>> {
    let path = path.as_ref();
    let records = read_aggregate_csv(File::open(path)?)?;
    info!(path = %path.display(), count = records.len(), "loaded aggregate records");
    Ok(records)
}

// ---- GeoJSON ----

pub fn aggregate_geojson(records: &[AggregateRecord]) -> Result<Value> {
    let id_column = IdColumn::for_records(records);
    let features = records
        .iter()
        .map(|record| {
            let mut properties = Map::new();
            properties.insert(id_column.name().to_string(), json!(record.key.to_string()));
            properties.insert("mean_value".to_string(), json!(record.mean_value));
            properties.insert("sample_count".to_string(), json!(record.sample_count));
            if let Some(resolution) = record.resolution {
                properties.insert("h3_resolution".to_string(), json!(resolution));
            }
            let geometry = match &record.geometry {
                Some(geometry) => geometry_to_json(geometry)?,
                None => Value::Null,
            };
            Ok(json!({
                "type": "Feature",
                "properties": properties,
                "geometry": geometry,
            }))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(json!({"type": "FeatureCollection", "features": features}))
}

pub fn write_aggregate_geojson<W: Write>(writer: W, records: &[AggregateRecord]) -> Result<()> {
    serde_json::to_writer(writer, &aggregate_geojson(records)?)?;
    Ok(())
}

// ---- hotspot reports ----

/// `rank,key,value`, rank starting at 1
pub fn write_ranked_csv<W: Write>(writer: W, ranked: &[&AggregateRecord]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["rank", "key", "value"])?;
    for (i, record) in ranked.iter().enumerate() {
        csv_writer.write_record([
            (i + 1).to_string(),
            record.key.to_string(),
            mean_text(record.mean_value),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// `index,key,value`; `series` supplies the key at each peak index
pub fn write_peaks_csv<W: Write>(writer: W, peaks: &[PeakResult], series: &[AggregateRecord]) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(["index", "key", "value"])?;
    for peak in peaks {
        let key = series.get(peak.index).map(|r| r.key.to_string()).unwrap_or_default();
        csv_writer.write_record([peak.index.to_string(), key, peak.value.to_string()])?;
    }
    csv_writer.flush()?;
    Ok(())
}

// ---- files ----

/// Paths written for one aggregate run
#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub csv: PathBuf,
    pub geojson: PathBuf,
    /// Only written when every record carries a geometry
    pub shapefile: Option<PathBuf>,
}

/// Write `{stem}.csv`, `{stem}.geojson` and, for polygon records, `{stem}.shp`
/// into `dir`, creating it if needed
pub fn export_aggregate(dir: &Path, stem: &str, records: &[AggregateRecord]) -> Result<ExportPaths> {
    fs::create_dir_all(dir)?;
    let with_polygons = !records.is_empty() && records.iter().all(|r| r.geometry.is_some());
    let paths = ExportPaths {
        csv: dir.join(format!("{}.csv", stem)),
        geojson: dir.join(format!("{}.geojson", stem)),
        shapefile: with_polygons.then(|| dir.join(format!("{}.shp", stem))),
    };
    write_aggregate_csv(BufWriter::new(File::create(&paths.csv)?), records)?;
    let mut geojson = BufWriter::new(File::create(&paths.geojson)?);
    write_aggregate_geojson(&mut geojson, records)?;
    geojson.flush()?;
    if let Some(shapefile) = &paths.shapefile {
        write_aggregate_shapefile(shapefile, records)?;
    }

    info!(
        csv = %paths.csv.display(),
        geojson = %paths.geojson.display(),
        shapefile = paths.shapefile.is_some(),
        records = records.len(),
        "exported aggregate"
    );
    Ok(paths)
}

/// Aggregate records from a `.shp` written by `export_aggregate`, or else from
/// its CSV
pub fn load_aggregate<P: AsRef<Path>>(path: P) -> Result<Vec<AggregateRecord>> {
    let path = path.as_ref();
    let is_shapefile = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("shp"));
    if is_shapefile {
        read_aggregate_shapefile(path)
    } else {
        load_aggregate_csv(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use geo::polygon;

    fn region_record(id: &str, mean: Option<f64>, count: usize) -> AggregateRecord {
        AggregateRecord {
            key: RecordKey::Region(id.to_string()),
            geometry: Some(Geometry::Polygon(polygon![
                (x: -77.0, y: 38.9),
                (x: -76.9, y: 38.9),
                (x: -76.9, y: 39.0),
            ])),
            mean_value: mean,
            sample_count: count,
            resolution: None,
        }
    }

    #[test]
    fn test_file_stems() {
        let window = TimeWindow::new(
            Utc.with_ymd_and_hms(2024, 8, 13, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 8, 14, 0, 0, 0).unwrap(),
        )
        .unwrap();
        assert_eq!(
            spatial_stem("example", "CarbonDioxide", &window),
            "spatial_aggregate_example_CarbonDioxide_2024_08_13_00_00_00_2024_08_14_00_00_00"
        );
        assert_eq!(
            hexagon_stem("example", "CarbonDioxide", &window),
            "spatial_aggregate_example_hexagon_CarbonDioxide_2024_08_13_00_00_00_2024_08_14_00_00_00"
        );
        assert_eq!(
            temporal_stem("example", "CarbonDioxide"),
            "temporal_aggregate_example_CarbonDioxide"
        );
    }

    #[test]
    fn test_csv_leaves_missing_mean_empty() {
        let records = vec![region_record("a", Some(450.0), 3), region_record("b", None, 0)];
        let mut out = Vec::new();
        write_aggregate_csv(&mut out, &records).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "region_id,mean_value,sample_count,geometry");
        assert!(lines[1].starts_with("a,450,3,"));
        assert!(lines[2].starts_with("b,,0,"));
        assert!(lines[1].contains("POLYGON"));
    }

    #[test]
    fn test_csv_reads_back() {
        let records = vec![region_record("a", Some(450.5), 3), region_record("b", None, 0)];
        let mut out = Vec::new();
        write_aggregate_csv(&mut out, &records).unwrap();
        let back = read_aggregate_csv(out.as_slice()).unwrap();
        assert_eq!(back, records);
    }

    #[test]
    fn test_date_records_have_no_geometry_column() {
        let records = vec![AggregateRecord {
            key: RecordKey::Date(NaiveDate::from_ymd_opt(2024, 8, 13).unwrap()),
            geometry: None,
            mean_value: Some(410.0),
            sample_count: 2,
            resolution: None,
        }];
        let mut out = Vec::new();
        write_aggregate_csv(&mut out, &records).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "date,mean_value,sample_count\n2024-08-13,410,2\n");
        assert_eq!(read_aggregate_csv(text.as_bytes()).unwrap(), records);
    }

    #[test]
    fn test_reads_legacy_avg_value_column() {
        let text = "region_id,avg_value\n110010001001000,421.5\n110010001001001,\n";
        let records = read_aggregate_csv(text.as_bytes()).unwrap();
        assert_eq!(records[0].mean_value, Some(421.5));
        assert_eq!(records[0].sample_count, 1);
        assert_eq!(records[1].mean_value, None);
        assert_eq!(records[1].sample_count, 0);
    }

    #[test]
    fn test_reader_rejects_unknown_layout() {
        let text = "name,mean_value\na,1\n";
        assert!(matches!(read_aggregate_csv(text.as_bytes()), Err(ZonalError::Parse(_))));
    }

    #[test]
    fn test_geojson_properties() {
        let mut hex = region_record("8928308280fffff", Some(500.0), 1);
        hex.resolution = Some(9);
        let value = aggregate_geojson(&[hex, region_record("8928308280bffff", None, 0)]).unwrap();
        let features = value["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0]["properties"]["h3_index"], "8928308280fffff");
        assert_eq!(features[0]["properties"]["h3_resolution"], 9);
        assert_eq!(features[0]["geometry"]["type"], "Polygon");
        assert!(features[1]["properties"]["mean_value"].is_null());
    }

    #[test]
    fn test_hotspot_reports() {
        let records = vec![region_record("a", Some(10.0), 1), region_record("b", Some(20.0), 1)];
        let ranked: Vec<&AggregateRecord> = vec![&records[1], &records[0]];
        let mut out = Vec::new();
        write_ranked_csv(&mut out, &ranked).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "rank,key,value\n1,b,20\n2,a,10\n");

        let peaks = vec![PeakResult { index: 1, value: 20.0 }];
        let mut out = Vec::new();
        write_peaks_csv(&mut out, &peaks, &records).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "index,key,value\n1,b,20\n");
    }
}
