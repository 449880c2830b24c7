//! Zonal statistics: mean observation value per region over a time window.

use crate::aggregate::AggregateRecord;
use crate::crs::Crs;
use crate::error::{Result, ZonalError};
use crate::math_utils::MeanAccumulator;
use crate::observation::{Observation, TimeWindow};
use crate::region::Region;
use geo::Point;
use rayon::prelude::*;
use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// What to emit for a region no observation falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyRegionPolicy {
    /// one record per input region, null mean and zero count when empty
    #[default]
    KeepNull,
    /// omit regions with no observations
    Drop,
}

type IndexedPoint = GeomWithData<[f64; 2], usize>;

#[derive(Debug, Clone, Default)]
pub struct ZonalAggregator {
    policy: EmptyRegionPolicy,
}

impl ZonalAggregator {
    pub fn new(policy: EmptyRegionPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> EmptyRegionPolicy {
        self.policy
    }

    /// One record per region (subject to the empty-region policy), in region order.
    ///
    /// An observation on an edge shared by two regions counts toward both.
    pub fn aggregate(
        &self,
        regions: &[Region],
        observations: &[Observation],
        window: &TimeWindow,
    ) -> Result<Vec<AggregateRecord>> {
        if window.begin() > window.end() {
            return Err(ZonalError::InvalidWindow {
                begin: window.begin(),
                end: window.end(),
            });
        }
        if regions.is_empty() {
            return Ok(Vec::new());
        }

        let in_window: Vec<&Observation> = observations
            .iter()
            .filter(|obs| window.contains(obs.timestamp))
            .collect();
        debug!(
            total = observations.len(),
            in_window = in_window.len(),
            "filtered observations to window"
        );

        let mut indexes: HashMap<Crs, RTree<IndexedPoint>> = HashMap::new();
        for region in regions {
            let crs = region.crs();
            if !indexes.contains_key(&crs) {
                indexes.insert(crs, index_observations(&in_window, crs));
            }
        }

        let records: Vec<AggregateRecord> = regions
            .par_iter()
            .map(|region| {
                let acc = match (indexes.get(&region.crs()), region.bounding_rect()) {
                    (Some(index), Some(rect)) => {
                        let envelope = AABB::from_corners(
                            [rect.min().x, rect.min().y],
                            [rect.max().x, rect.max().y],
                        );
                        let mut acc = MeanAccumulator::default();
                        for candidate in index.locate_in_envelope_intersecting(&envelope) {
                            let [x, y] = *candidate.geom();
                            if region.covers(&Point::new(x, y)) {
                                acc.add(in_window[candidate.data].value);
                            }
                        }
                        acc
                    }
                    _ => MeanAccumulator::default(),
                };
                AggregateRecord::for_region(region, acc)
            })
            .collect();

        let kept: Vec<AggregateRecord> = match self.policy {
            EmptyRegionPolicy::KeepNull => records,
            EmptyRegionPolicy::Drop => records.into_iter().filter(|r| !r.is_empty()).collect(),
        };

        info!(
            regions = regions.len(),
            records = kept.len(),
            observations = in_window.len(),
            policy = ?self.policy,
            "zonal aggregation complete"
        );
        Ok(kept)
    }
}

/// R-tree of observation positions projected into `crs`; payload is the index
/// into `observations`. Points that cannot be projected are left out.
fn index_observations(observations: &[&Observation], crs: Crs) -> RTree<IndexedPoint> {
    let mut skipped = 0usize;
    let points: Vec<IndexedPoint> = observations
        .iter()
        .enumerate()
        .filter_map(|(i, obs)| match crs.from_wgs84(obs.point().0) {
            Ok(coord) => Some(GeomWithData::new([coord.x, coord.y], i)),
            Err(_) => {
                skipped += 1;
                None
            }
        })
        .collect();
    if skipped > 0 {
        warn!(%crs, skipped, "observations could not be projected and were ignored");
    }
    RTree::bulk_load(points)
}
