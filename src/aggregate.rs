use crate::math_utils::MeanAccumulator;
use crate::region::Region;
use chrono::NaiveDate;
use geo::Geometry;
use serde::Serialize;
use std::fmt;

/// What an aggregate record is keyed by
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum RecordKey {
    /// `region_id` of an administrative region or `cell_index` of a hex cell
    Region(String),
    /// UTC calendar date of a temporal bucket
    Date(NaiveDate),
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Region(id) => write!(f, "{}", id),
            RecordKey::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

/// Mean of the observations assigned to one region or date.
///
/// `mean_value` is `None` exactly when `sample_count == 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRecord {
    pub key: RecordKey,
    /// Source region geometry; absent for date-keyed records
    pub geometry: Option<Geometry<f64>>,
    pub mean_value: Option<f64>,
    pub sample_count: usize,
    /// H3 resolution, hex cells only
    pub resolution: Option<u8>,
}

impl AggregateRecord {
    pub fn for_region(region: &Region, acc: MeanAccumulator) -> Self {
        Self {
            key: RecordKey::Region(region.id().to_string()),
            geometry: Some(region.geometry()),
            mean_value: acc.mean(),
            sample_count: acc.count(),
            resolution: region.resolution(),
        }
    }

    pub fn for_date(date: NaiveDate, acc: MeanAccumulator) -> Self {
        Self {
            key: RecordKey::Date(date),
            geometry: None,
            mean_value: acc.mean(),
            sample_count: acc.count(),
            resolution: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }
}

/// A strict local maximum at `index` of an ordered series
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeakResult {
    pub index: usize,
    pub value: f64,
}
