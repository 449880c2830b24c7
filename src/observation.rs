use crate::constants::WINDOW_TIME_FORMAT;
use crate::error::{Result, ZonalError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use geo::Point;
use serde::{Deserialize, Serialize};

/// One sensor reading. `value` is already averaged at the sensor.
///
/// Identity is `(device_id, timestamp)`; duplicates are kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    /// WGS84 degrees
    pub latitude: f64,
    /// WGS84 degrees
    pub longitude: f64,
    pub value: f64,
}

impl Observation {
    pub fn new(
        device_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        latitude: f64,
        longitude: f64,
        value: f64,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            timestamp,
            latitude,
            longitude,
            value,
        }
    }

    /// WGS84 point in (lng, lat) order
    pub fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }

    /// UTC calendar date of the reading
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

/// Closed time interval `[begin, end]`; both bounds are part of the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    begin: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(begin: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if begin > end {
            return Err(ZonalError::InvalidWindow { begin, end });
        }
        Ok(Self { begin, end })
    }

    /// Parse a window from two `YYYY/mm/dd HH:MM:SS` strings taken as UTC.
    /// RFC 3339 instants are accepted too.
    pub fn parse(begin: &str, end: &str) -> Result<Self> {
        Self::new(parse_window_instant(begin)?, parse_window_instant(end)?)
    }

    pub fn begin(&self) -> DateTime<Utc> {
        self.begin
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.begin <= instant && instant <= self.end
    }
}

fn parse_window_instant(text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, WINDOW_TIME_FORMAT) {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(text)
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|e| ZonalError::Parse(format!("window bound {:?}: {}", text, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 13, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_window_rejects_reversed_bounds() {
        let err = TimeWindow::new(at(12), at(6)).unwrap_err();
        assert!(matches!(err, ZonalError::InvalidWindow { .. }));
    }

    #[test]
    fn test_window_allows_zero_length() {
        let window = TimeWindow::new(at(6), at(6)).unwrap();
        assert!(window.contains(at(6)));
        assert!(!window.contains(at(7)));
    }

    #[test]
    fn test_window_bounds_are_inclusive() {
        let window = TimeWindow::new(at(0), at(23)).unwrap();
        assert!(window.contains(at(0)));
        assert!(window.contains(at(23)));
        assert!(!window.contains(at(0) - chrono::Duration::seconds(1)));
        assert!(!window.contains(at(23) + chrono::Duration::seconds(1)));
    }

    #[test]
    fn test_window_parse_unpadded_month() {
        let window = TimeWindow::parse("2024/08/13 00:00:00", "2024/8/14 00:00:00").unwrap();
        assert_eq!(window.begin(), at(0));
        assert_eq!(window.end(), Utc.with_ymd_and_hms(2024, 8, 14, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_window_parse_rfc3339_and_garbage() {
        let window = TimeWindow::parse("2024-08-13T00:00:00Z", "2024-08-13T06:00:00+00:00").unwrap();
        assert_eq!(window.end(), at(6));
        assert!(matches!(
            TimeWindow::parse("yesterday", "today"),
            Err(ZonalError::Parse(_))
        ));
    }

    #[test]
    fn test_observation_point_is_lng_lat() {
        let obs = Observation::new("dev-1", at(3), 38.9, -77.0, 420.0);
        assert_eq!(obs.point().x(), -77.0);
        assert_eq!(obs.point().y(), 38.9);
        assert_eq!(obs.date(), NaiveDate::from_ymd_opt(2024, 8, 13).unwrap());
    }
}
