//! Daily means of the observations inside a metric buffer around a location.

use crate::aggregate::AggregateRecord;
use crate::crs::Crs;
use crate::error::Result;
use crate::geo_adapter::MetricBuffer;
use crate::math_utils::MeanAccumulator;
use crate::observation::Observation;
use chrono::NaiveDate;
use geo::Point;
use std::collections::BTreeMap;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct TemporalAggregator {
    /// Metric CRS for the buffer; the UTM zone of the centre when unset
    metric_crs: Option<Crs>,
}

impl TemporalAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metric_crs(crs: Crs) -> Self {
        Self {
            metric_crs: Some(crs),
        }
    }

    /// Per-date mean of observations within `radius_meters` of `center` (WGS84
    /// lng/lat), ascending by date. Every observation is eligible regardless of
    /// time; dates with no observation inside the buffer are absent.
    pub fn aggregate(
        &self,
        center: Point<f64>,
        radius_meters: f64,
        observations: &[Observation],
    ) -> Result<Vec<AggregateRecord>> {
        let buffer = MetricBuffer::new(center, radius_meters, self.metric_crs)?;

        let mut by_date: BTreeMap<NaiveDate, MeanAccumulator> = BTreeMap::new();
        let mut inside = 0usize;
        let mut skipped = 0usize;
        for obs in observations {
            match buffer.contains(obs.point()) {
                Ok(true) => {
                    by_date.entry(obs.date()).or_default().add(obs.value);
                    inside += 1;
                }
                Ok(false) => {}
                Err(_) => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(skipped, crs = %buffer.crs(), "observations could not be projected and were ignored");
        }

        let records: Vec<AggregateRecord> = by_date
            .into_iter()
            .map(|(date, acc)| AggregateRecord::for_date(date, acc))
            .collect();

        info!(
            lng = center.x(),
            lat = center.y(),
            radius_meters,
            inside,
            dates = records.len(),
            "temporal aggregation complete"
        );
        Ok(records)
    }
}
