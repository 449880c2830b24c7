// Integration tests for zonal and temporal aggregation, run end to end from
// observations through tessellation to aggregate records

use aq_zonal_rust::geo_adapter::MetricBuffer;
use aq_zonal_rust::{
    AdministrativeRegion, Boundary, Crs, EmptyRegionPolicy, H3Utils, HexagonTessellator, Observation, RecordKey,
    Region, TemporalAggregator, TimeWindow, ZonalAggregator, ZonalError, assert_deviation,
};
use approx::assert_abs_diff_eq;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use geo::{Coord, Point, polygon};
use more_asserts::assert_le;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

// Anacostia Elementary Campus
const CENTER_LNG: f64 = -76.98468923536171;
const CENTER_LAT: f64 = 38.86494420455321;

fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 8, day, hour, 0, 0).unwrap()
}

/// WGS84 point `east_m` / `north_m` metres from the centre, measured in `crs`
fn offset_point(crs: Crs, east_m: f64, north_m: f64) -> Point<f64> {
    let center = crs.from_wgs84(Coord { x: CENTER_LNG, y: CENTER_LAT }).unwrap();
    let moved = crs
        .to_wgs84(Coord {
            x: center.x + east_m,
            y: center.y + north_m,
        })
        .unwrap();
    Point::from(moved)
}

#[test]
fn test_buffer_edge_one_metre_either_side() {
    println!("🧪 Buffer includes radius-1 m and excludes radius+1 m");

    let center = Point::new(CENTER_LNG, CENTER_LAT);
    let radius = 250.0;
    let crs = Crs::Utm { zone: 18, north: true };

    let mut observations = Vec::new();
    for (i, (east, north)) in [(1.0, 0.0), (0.0, 1.0), (-1.0, 0.0), (0.0, -1.0)].into_iter().enumerate() {
        let inside = offset_point(crs, east * (radius - 1.0), north * (radius - 1.0));
        let outside = offset_point(crs, east * (radius + 1.0), north * (radius + 1.0));
        observations.push(Observation::new(format!("in{}", i), at(13, 1), inside.y(), inside.x(), 400.0));
        observations.push(Observation::new(format!("out{}", i), at(13, 1), outside.y(), outside.x(), 9999.0));
    }

    let records = TemporalAggregator::with_metric_crs(crs)
        .aggregate(center, radius, &observations)
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].sample_count, 4);
    assert_eq!(records[0].mean_value, Some(400.0));

    // the buffer's own distance agrees with the construction
    let buffer = MetricBuffer::new(center, radius, Some(crs)).unwrap();
    let rim_point = offset_point(crs, radius - 1.0, 0.0);
    assert_abs_diff_eq!(buffer.distance_to(rim_point).unwrap(), radius - 1.0, epsilon = 1e-6);
    println!("   ✅ 4 inside, 4 outside");
}

#[test]
fn test_default_metric_crs_is_local_utm_zone() {
    let center = Point::new(CENTER_LNG, CENTER_LAT);
    let buffer = MetricBuffer::new(center, 250.0, None).unwrap();
    assert_eq!(buffer.crs(), Crs::Utm { zone: 18, north: true });
    assert_eq!(buffer.crs().to_string(), "EPSG:32618");
}

#[test]
fn test_temporal_series_by_day() {
    let center = Point::new(CENTER_LNG, CENTER_LAT);
    let near = offset_point(Crs::Utm { zone: 18, north: true }, 50.0, -30.0);
    let mut observations = Vec::new();
    for (day, values) in [(12, vec![400.0, 420.0]), (13, vec![500.0]), (15, vec![430.0, 440.0, 450.0])] {
        for (i, value) in values.into_iter().enumerate() {
            observations.push(Observation::new("dev", at(day, i as u32), near.y(), near.x(), value));
        }
    }

    let records = TemporalAggregator::new().aggregate(center, 250.0, &observations).unwrap();
    let summary: Vec<(String, Option<f64>, usize)> = records
        .iter()
        .map(|r| (r.key.to_string(), r.mean_value, r.sample_count))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("2024-08-12".to_string(), Some(410.0), 2),
            ("2024-08-13".to_string(), Some(500.0), 1),
            ("2024-08-15".to_string(), Some(440.0), 3),
        ]
    );
    // no record for the unobserved 14th
    assert!(!records.iter().any(|r| r.key == RecordKey::Date(NaiveDate::from_ymd_opt(2024, 8, 14).unwrap())));
}

#[test]
fn test_window_is_inclusive_at_both_ends() {
    let region: Region = AdministrativeRegion::new(
        "block",
        polygon![(x: -77.1, y: 38.8), (x: -76.9, y: 38.8), (x: -76.9, y: 39.0), (x: -77.1, y: 39.0)],
        Crs::Wgs84,
    )
    .unwrap()
    .into();
    let window = TimeWindow::parse("2024/08/13 00:00:00", "2024/8/14 00:00:00").unwrap();
    let observations = vec![
        Observation::new("a", window.begin() - Duration::seconds(1), 38.9, -77.0, 1000.0),
        Observation::new("a", window.begin(), 38.9, -77.0, 400.0),
        Observation::new("a", at(13, 12), 38.9, -77.0, 450.0),
        Observation::new("a", window.end(), 38.9, -77.0, 500.0),
        Observation::new("a", window.end() + Duration::seconds(1), 38.9, -77.0, 1000.0),
    ];

    let records = ZonalAggregator::default()
        .aggregate(&[region], &observations, &window)
        .unwrap();
    assert_eq!(records[0].sample_count, 3);
    assert_eq!(records[0].mean_value, Some(450.0));
}

#[test]
fn test_zonal_mean_over_random_observations() {
    println!("🧪 Zonal means match a direct computation over seeded random data");

    let left: Region = AdministrativeRegion::new(
        "left",
        polygon![(x: -77.10, y: 38.80), (x: -77.00, y: 38.80), (x: -77.00, y: 38.90), (x: -77.10, y: 38.90)],
        Crs::Wgs84,
    )
    .unwrap()
    .into();
    let right: Region = AdministrativeRegion::new(
        "right",
        polygon![(x: -77.00, y: 38.80), (x: -76.90, y: 38.80), (x: -76.90, y: 38.90), (x: -77.00, y: 38.90)],
        Crs::Wgs84,
    )
    .unwrap()
    .into();

    let mut rng = StdRng::seed_from_u64(2024);
    let observations: Vec<Observation> = (0..1000)
        .map(|i| {
            Observation::new(
                format!("dev{}", i % 17),
                at(13, rng.random_range(0..24)),
                rng.random_range(38.801..38.899),
                rng.random_range(-77.099..-76.901),
                rng.random_range(350.0..800.0),
            )
        })
        .collect();

    let mut expected: HashMap<&str, (f64, usize)> = HashMap::new();
    for obs in &observations {
        let id = if obs.longitude < -77.0 { "left" } else { "right" };
        let entry = expected.entry(id).or_default();
        entry.0 += obs.value;
        entry.1 += 1;
    }

    let window = TimeWindow::new(at(13, 0), at(13, 23)).unwrap();
    let records = ZonalAggregator::default()
        .aggregate(&[left, right], &observations, &window)
        .unwrap();

    assert_eq!(records.len(), 2);
    for record in &records {
        let (sum, count) = expected[record.key.to_string().as_str()];
        assert_eq!(record.sample_count, count);
        let mean = record.mean_value.unwrap();
        assert_abs_diff_eq!(mean, sum / count as f64, epsilon = 1e-9);
        assert_deviation!(mean, 575.0, 5.0, "mean of uniform 350..800 for {}", record.key);
        println!("   {}: mean {:.2} over {}", record.key, mean, count);
    }
}

#[test]
fn test_hexgrid_pipeline_drops_empty_cells() {
    println!("🧪 Boundary → hex cells → zonal means");

    let boundary = Boundary::new(
        polygon![(x: -77.05, y: 38.88), (x: -77.00, y: 38.88), (x: -77.00, y: 38.92), (x: -77.05, y: 38.92)],
        Crs::Wgs84,
    )
    .unwrap();
    let cells = HexagonTessellator::default().tessellate(&boundary, 8).unwrap();
    let regions: Vec<Region> = cells.iter().cloned().map(Region::from).collect();

    // two readings at the centre of each of the first three cells
    let mut observations = Vec::new();
    for (i, cell) in cells.iter().take(3).enumerate() {
        let center = H3Utils::cell_center(H3Utils::parse_cell(&cell.cell_index).unwrap());
        for value in [400.0 + i as f64 * 10.0, 420.0 + i as f64 * 10.0] {
            observations.push(Observation::new("dev", at(13, 6), center.y(), center.x(), value));
        }
    }
    let window = TimeWindow::new(at(13, 0), at(14, 0)).unwrap();

    let kept = ZonalAggregator::new(EmptyRegionPolicy::KeepNull)
        .aggregate(&regions, &observations, &window)
        .unwrap();
    assert_eq!(kept.len(), cells.len());

    let dropped = ZonalAggregator::new(EmptyRegionPolicy::Drop)
        .aggregate(&regions, &observations, &window)
        .unwrap();
    assert_eq!(dropped.len(), 3);
    for (i, record) in dropped.iter().enumerate() {
        assert_eq!(record.key.to_string(), cells[i].cell_index);
        assert_eq!(record.sample_count, 2);
        assert_eq!(record.mean_value, Some(410.0 + i as f64 * 10.0));
        assert_eq!(record.resolution, Some(8));
    }
    assert_le!(dropped.len(), kept.len());
    println!("   ✅ {} of {} cells carry data", dropped.len(), kept.len());
}

#[test]
fn test_regions_in_projected_crs() {
    let utm = Crs::Utm { zone: 18, north: true };
    let c = utm.from_wgs84(Coord { x: CENTER_LNG, y: CENTER_LAT }).unwrap();
    let region: Region = AdministrativeRegion::new(
        "utm-block",
        polygon![
            (x: c.x - 100.0, y: c.y - 100.0),
            (x: c.x + 100.0, y: c.y - 100.0),
            (x: c.x + 100.0, y: c.y + 100.0),
            (x: c.x - 100.0, y: c.y + 100.0),
        ],
        utm,
    )
    .unwrap()
    .into();

    let inside = offset_point(utm, 50.0, 50.0);
    let outside = offset_point(utm, 150.0, 0.0);
    let observations = vec![
        Observation::new("a", at(13, 1), inside.y(), inside.x(), 420.0),
        Observation::new("b", at(13, 1), outside.y(), outside.x(), 999.0),
    ];
    let window = TimeWindow::new(at(13, 0), at(13, 23)).unwrap();
    let records = ZonalAggregator::default()
        .aggregate(&[region], &observations, &window)
        .unwrap();
    assert_eq!(records[0].sample_count, 1);
    assert_eq!(records[0].mean_value, Some(420.0));
}

#[test]
fn test_reversed_window_rejected() {
    let err = TimeWindow::parse("2024/08/14 00:00:00", "2024/08/13 00:00:00").unwrap_err();
    assert!(matches!(err, ZonalError::InvalidWindow { .. }));
}

#[test]
fn test_antimeridian_cell_only_counts_nearby_observations() {
    println!("🧪 A hex cut by 180° must not swallow readings from the far side of the globe");

    let boundary = Boundary::new(
        polygon![(x: 179.9, y: 51.0), (x: 179.999, y: 51.0), (x: 179.999, y: 51.099), (x: 179.9, y: 51.099)],
        Crs::Wgs84,
    )
    .unwrap();
    let cells = HexagonTessellator::default().tessellate(&boundary, 3).unwrap();
    let regions: Vec<Region> = cells.iter().cloned().map(Region::from).collect();

    let observations = vec![
        Observation::new("greenwich", at(13, 6), 51.2, 0.0, 999.0),
        Observation::new("aleutians", at(13, 6), 51.05, 179.95, 420.0),
    ];
    let window = TimeWindow::new(at(13, 0), at(14, 0)).unwrap();
    let records = ZonalAggregator::new(EmptyRegionPolicy::Drop)
        .aggregate(&regions, &observations, &window)
        .unwrap();

    let counted: usize = records.iter().map(|r| r.sample_count).sum();
    assert_eq!(counted, 1, "{:?}", records.iter().map(|r| (r.key.to_string(), r.sample_count)).collect::<Vec<_>>());
    assert!(records.iter().all(|r| r.mean_value == Some(420.0)));
    println!("   ✅ only the Aleutian reading was counted");
}
