// Integration tests for aggregate export: the CSV, GeoJSON and shapefile written
// for one run must describe the same records, and the CSV must load back unchanged

use aq_zonal_rust::io::{self, geojson};
use aq_zonal_rust::{
    AdministrativeRegion, AggregateRecord, Boundary, Crs, HexagonTessellator, Observation, Region, TimeWindow,
    ZonalAggregator,
};
use approx::assert_abs_diff_eq;
use chrono::{TimeZone, Utc};
use geo::{Area, Point, polygon};
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

fn window() -> TimeWindow {
    TimeWindow::parse("2024/08/13 00:00:00", "2024/8/14 00:00:00").unwrap()
}

fn zonal_records() -> Vec<AggregateRecord> {
    let regions: Vec<Region> = [
        ("110010001", -77.10, -77.00),
        ("110010002", -77.00, -76.90),
        ("110010003", -76.90, -76.80),
    ]
    .into_iter()
    .map(|(id, west, east)| {
        AdministrativeRegion::new(
            id,
            polygon![(x: west, y: 38.80), (x: east, y: 38.80), (x: east, y: 38.90), (x: west, y: 38.90)],
            Crs::Wgs84,
        )
        .unwrap()
        .into()
    })
    .collect();

    let t = Utc.with_ymd_and_hms(2024, 8, 13, 9, 30, 0).unwrap();
    let observations = vec![
        Observation::new("a", t, 38.85, -77.05, 412.5),
        Observation::new("b", t, 38.86, -77.04, 431.25),
        Observation::new("c", t, 38.85, -76.95, 600.0),
    ];
    ZonalAggregator::default()
        .aggregate(&regions, &observations, &window())
        .unwrap()
}

fn summary(records: &[AggregateRecord]) -> Vec<(String, Option<f64>, usize, Option<u8>)> {
    records
        .iter()
        .map(|r| (r.key.to_string(), r.mean_value, r.sample_count, r.resolution))
        .collect()
}

fn geojson_summary(collection: &Value, id_column: &str) -> Vec<(String, Option<f64>, usize, Option<u8>)> {
    collection["features"]
        .as_array()
        .unwrap()
        .iter()
        .map(|feature| {
            let properties = &feature["properties"];
            (
                properties[id_column].as_str().unwrap().to_string(),
                properties["mean_value"].as_f64(),
                properties["sample_count"].as_u64().unwrap() as usize,
                properties.get("h3_resolution").and_then(Value::as_u64).map(|r| r as u8),
            )
        })
        .collect()
}

#[test]
fn test_zonal_export_csv_geojson_and_shapefile_agree() {
    println!("🧪 Zonal export: CSV, GeoJSON and shapefile carry the same records");

    let records = zonal_records();
    let dir = TempDir::new().unwrap();
    let stem = io::spatial_stem("dc", "co2", &window());
    let paths = io::export_aggregate(dir.path(), &stem, &records).unwrap();
    assert!(paths.csv.ends_with(format!("{}.csv", stem)));
    assert!(paths.geojson.ends_with(format!("{}.geojson", stem)));

    let from_csv = io::load_aggregate_csv(&paths.csv).unwrap();
    assert_eq!(summary(&from_csv), summary(&records));
    // WKT keeps the geometry exactly
    for (read, written) in from_csv.iter().zip(&records) {
        assert_eq!(read.geometry, written.geometry);
    }

    let collection: Value = serde_json::from_str(&fs::read_to_string(&paths.geojson).unwrap()).unwrap();
    assert_eq!(collection["type"], "FeatureCollection");
    assert_eq!(geojson_summary(&collection, "region_id"), summary(&records));
    for (feature, written) in collection["features"].as_array().unwrap().iter().zip(&records) {
        let geometry = geojson::geometry_from_json(&feature["geometry"]).unwrap();
        assert_eq!(Some(geometry), written.geometry);
    }

    // the empty region survives as a null mean in both files
    let empty = &collection["features"][2]["properties"];
    assert!(empty["mean_value"].is_null());
    assert_eq!(empty["sample_count"], 0);
    assert_eq!(from_csv[2].mean_value, None);

    let shapefile = paths.shapefile.as_ref().unwrap();
    assert!(shapefile.ends_with(format!("{}.shp", stem)));
    let from_shp = io::read_aggregate_shapefile(shapefile).unwrap();
    assert_eq!(summary(&from_shp), summary(&records));
    for (read, written) in from_shp.iter().zip(&records) {
        // ring orientation may be rewritten, the area may not
        let read_area = read.geometry.as_ref().unwrap().unsigned_area();
        let written_area = written.geometry.as_ref().unwrap().unsigned_area();
        assert_abs_diff_eq!(read_area, written_area, epsilon = 1e-12);
    }
    assert_eq!(io::load_aggregate(shapefile).unwrap().len(), records.len());
    println!("   ✅ {} records round-tripped", records.len());
}

#[test]
fn test_hexagon_export_keeps_resolution() {
    let boundary = Boundary::new(
        polygon![(x: -77.05, y: 38.88), (x: -77.03, y: 38.88), (x: -77.03, y: 38.90), (x: -77.05, y: 38.90)],
        Crs::Wgs84,
    )
    .unwrap();
    let regions: Vec<Region> = HexagonTessellator::default()
        .tessellate(&boundary, 9)
        .unwrap()
        .into_iter()
        .map(Region::from)
        .collect();
    let t = Utc.with_ymd_and_hms(2024, 8, 13, 12, 0, 0).unwrap();
    let observations = vec![Observation::new("a", t, 38.89, -77.04, 455.0)];
    let records = ZonalAggregator::default()
        .aggregate(&regions, &observations, &window())
        .unwrap();

    let dir = TempDir::new().unwrap();
    let stem = io::hexagon_stem("dc", "co2", &window());
    assert!(stem.starts_with("spatial_aggregate_dc_hexagon_co2_"));
    let paths = io::export_aggregate(dir.path(), &stem, &records).unwrap();

    let header = fs::read_to_string(&paths.csv).unwrap().lines().next().unwrap().to_string();
    assert_eq!(header, "h3_index,mean_value,sample_count,h3_resolution,geometry");

    let from_csv = io::load_aggregate_csv(&paths.csv).unwrap();
    assert_eq!(summary(&from_csv), summary(&records));
    assert!(from_csv.iter().all(|r| r.resolution == Some(9)));

    let collection: Value = serde_json::from_str(&fs::read_to_string(&paths.geojson).unwrap()).unwrap();
    assert_eq!(geojson_summary(&collection, "h3_index"), summary(&records));

    let from_shp = io::read_aggregate_shapefile(paths.shapefile.as_ref().unwrap()).unwrap();
    assert_eq!(summary(&from_shp), summary(&records));
}

#[test]
fn test_temporal_export_has_no_geometry() {
    let t = |day| Utc.with_ymd_and_hms(2024, 8, day, 15, 0, 0).unwrap();
    let observations = vec![
        Observation::new("a", t(12), 38.8649, -76.9847, 400.0),
        Observation::new("a", t(13), 38.8649, -76.9847, 480.0),
        Observation::new("a", t(13), 38.8650, -76.9846, 500.0),
    ];
    let records = aq_zonal_rust::TemporalAggregator::new()
        .aggregate(Point::new(-76.98468923536171, 38.86494420455321), 250.0, &observations)
        .unwrap();

    let dir = TempDir::new().unwrap();
    let paths = io::export_aggregate(&dir.path().join("nested"), &io::temporal_stem("dc", "co2"), &records).unwrap();
    let text = fs::read_to_string(&paths.csv).unwrap();
    assert_eq!(text, "date,mean_value,sample_count\n2024-08-12,400,1\n2024-08-13,490,2\n");
    // a daily series has no polygons to draw
    assert!(paths.shapefile.is_none());

    let from_csv = io::load_aggregate_csv(&paths.csv).unwrap();
    assert_eq!(from_csv, records);

    let collection: Value = serde_json::from_str(&fs::read_to_string(&paths.geojson).unwrap()).unwrap();
    assert_eq!(geojson_summary(&collection, "date"), summary(&records));
    assert!(collection["features"][0]["geometry"].is_null());
}
