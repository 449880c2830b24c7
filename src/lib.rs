pub mod aggregate;
pub mod config;
pub mod constants;
pub mod crs;
pub mod error;
pub mod geo_adapter;
pub mod h3_utils;
pub mod hotspot;
pub mod io;
pub mod math_utils;
pub mod observation;
pub mod region;
pub mod temporal;
pub mod tessellate;
pub mod zonal;

pub use aggregate::{AggregateRecord, PeakResult, RecordKey};
pub use config::RunConfig;
pub use crs::Crs;
pub use error::{Result, ZonalError};
pub use h3_utils::{Containment, H3Utils};
pub use hotspot::HotspotDetector;
pub use observation::{Observation, TimeWindow};
pub use region::{AdministrativeRegion, Boundary, HexCell, Region};
pub use temporal::TemporalAggregator;
pub use tessellate::{HexagonTessellator, TessellationConfig};
pub use zonal::{EmptyRegionPolicy, ZonalAggregator};
