//! Observation CSV loader
//!
//! Expected columns: `device_id`, `timestamp_utc`, `lat`, `lon`, `avg_value`.
//! Extra columns are ignored. Rows come back ordered by `(timestamp, device_id)`.

use crate::error::{Result, ZonalError};
use crate::observation::Observation;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
struct ObservationRow {
    device_id: String,
    timestamp_utc: String,
    lat: f64,
    lon: f64,
    avg_value: f64,
}

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parse an observation timestamp. Offsets are honoured; naive timestamps are UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.with_timezone(&Utc));
    }
    // "2024-08-13 00:00:05+00:00"
    if let Ok(instant) = DateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(instant.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}

pub fn read_observations<R: Read>(reader: R) -> Result<Vec<Observation>> {
    let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let mut record = csv::StringRecord::new();
    let mut observations = Vec::new();

    while csv_reader.read_record(&mut record)? {
        let line = record.position().map(|pos| pos.line()).unwrap_or_default();
        let row: ObservationRow = record
            .deserialize(Some(&headers))
            .map_err(|e| ZonalError::Parse(format!("observation line {}: {}", line, e)))?;
        let timestamp = parse_timestamp(&row.timestamp_utc).ok_or_else(|| {
            ZonalError::Parse(format!(
                "observation line {}: unreadable timestamp {:?}",
                line, row.timestamp_utc
            ))
        })?;
        observations.push(Observation::new(row.device_id, timestamp, row.lat, row.lon, row.avg_value));
    }

    observations.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.device_id.cmp(&b.device_id))
    });
    Ok(observations)
}

pub fn load_observations<P: AsRef<Path>>(path: P) -> Result<Vec<Observation>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let observations = read_observations(file)?;
    info!(path = %path.display(), count = observations.len(), "loaded observations");
    Ok(observations)
}
