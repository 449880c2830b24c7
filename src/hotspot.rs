//! Hotspot detection over aggregated series: ranking by mean and strict
//! local-maxima search.

use crate::aggregate::{AggregateRecord, PeakResult};
use crate::error::{Result, ZonalError};
use std::cmp::Ordering;

pub struct HotspotDetector;

impl HotspotDetector {
    /// Records with a mean, highest first. Stable: equal means keep input order.
    /// Null-mean records are left out.
    pub fn rank(records: &[AggregateRecord]) -> Vec<&AggregateRecord> {
        Self::rank_by(records, |record| record.mean_value)
    }

    /// `rank` cut to the first `n` entries
    pub fn top_n(records: &[AggregateRecord], n: usize) -> Vec<&AggregateRecord> {
        let mut ranked = Self::rank(records);
        ranked.truncate(n);
        ranked
    }

    /// Stable descending sort of any keyed sequence. Items whose value is
    /// `None` or NaN are excluded.
    pub fn rank_by<T, F>(items: &[T], value: F) -> Vec<&T>
    where
        F: Fn(&T) -> Option<f64>,
    {
        let mut scored: Vec<(&T, f64)> = items
            .iter()
            .filter_map(|item| value(item).filter(|v| !v.is_nan()).map(|v| (item, v)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.into_iter().map(|(item, _)| item).collect()
    }

    /// Indices `i` in `1..n-1` with `values[i-1] < values[i] > values[i+1]`.
    ///
    /// Endpoints are never peaks and a plateau is not a peak, so fewer than
    /// three values never produce one.
    pub fn find_peaks(values: &[f64]) -> Vec<PeakResult> {
        if values.len() < 3 {
            return Vec::new();
        }
        values
            .windows(3)
            .enumerate()
            .filter(|(_, w)| w[0] < w[1] && w[1] > w[2])
            .map(|(i, w)| PeakResult {
                index: i + 1,
                value: w[1],
            })
            .collect()
    }

    /// Peaks of an ordered record series (e.g. the daily output of the temporal
    /// aggregator). Every record must have a mean.
    pub fn find_record_peaks(records: &[AggregateRecord]) -> Result<Vec<PeakResult>> {
        let values = records
            .iter()
            .enumerate()
            .map(|(i, record)| record.mean_value.ok_or(ZonalError::NullInSeries(i)))
            .collect::<Result<Vec<f64>>>()?;
        Ok(Self::find_peaks(&values))
    }
}
