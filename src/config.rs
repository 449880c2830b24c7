//! Run configuration loaded from a TOML file
//!
//! Every run of the `aq-zonal` binary is described by one file:
//!
//! ```toml
//! pollutant = "co2"
//! label = "dc"
//!
//! [input]
//! observations = "data/observations.csv"
//! regions = "data/tracts.geojson"
//! boundary = "data/dc_boundary.geojson"
//!
//! [window]
//! begin = "2024/08/13 00:00:00"
//! end = "2024/08/14 00:00:00"
//!
//! [temporal]
//! latitude = 38.86494420455321
//! longitude = -76.98468923536171
//! ```
//!
//! Everything else has a default.

use crate::constants::{
    DEFAULT_BUFFER_RADIUS_M, DEFAULT_HEX_RESOLUTION, DEFAULT_MAP_VMAX, DEFAULT_MAP_VMIN, DEFAULT_MAP_WIDTH_PX,
    DEFAULT_REGION_ID_FIELD,
};
use crate::crs::Crs;
use crate::error::{Result, ZonalError};
use crate::h3_utils::Containment;
use crate::observation::TimeWindow;
use crate::tessellate::TessellationConfig;
use crate::zonal::EmptyRegionPolicy;
use geo::Point;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// observation CSV
    pub observations: PathBuf,
    /// administrative regions (GeoJSON), used by `zonal`
    #[serde(default)]
    pub regions: Option<PathBuf>,
    /// tessellation boundary (GeoJSON or WKT), used by `hexgrid`
    #[serde(default)]
    pub boundary: Option<PathBuf>,
    #[serde(default = "default_id_field")]
    pub id_field: String,
    /// CRS the region and boundary files are declared in
    #[serde(default)]
    pub crs: Crs,
}

fn default_id_field() -> String {
    DEFAULT_REGION_ID_FIELD.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    pub begin: String,
    pub end: String,
    #[serde(default)]
    pub empty_regions: EmptyRegionPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HexGridConfig {
    #[serde(default = "default_resolution")]
    pub resolution: u8,
    #[serde(default)]
    pub containment: Containment,
    /// cells without observations are dropped unless set to `keep_null`
    #[serde(default = "default_empty_cells")]
    pub empty_cells: EmptyRegionPolicy,
}

fn default_resolution() -> u8 {
    DEFAULT_HEX_RESOLUTION
}

fn default_empty_cells() -> EmptyRegionPolicy {
    EmptyRegionPolicy::Drop
}

impl Default for HexGridConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_HEX_RESOLUTION,
            containment: Containment::default(),
            empty_cells: default_empty_cells(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemporalConfig {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default = "default_radius")]
    pub radius_meters: f64,
    /// metric CRS for the buffer; the UTM zone of the location when absent
    #[serde(default)]
    pub metric_crs: Option<Crs>,
}

fn default_radius() -> f64 {
    DEFAULT_BUFFER_RADIUS_M
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    /// number of hotspots in the ranked report
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_top_n() -> usize {
    10
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            top_n: default_top_n(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_vmin")]
    pub vmin: f64,
    #[serde(default = "default_vmax")]
    pub vmax: f64,
    #[serde(default = "default_width")]
    pub width: u32,
}

fn default_true() -> bool {
    true
}

fn default_vmin() -> f64 {
    DEFAULT_MAP_VMIN
}

fn default_vmax() -> f64 {
    DEFAULT_MAP_VMAX
}

fn default_width() -> u32 {
    DEFAULT_MAP_WIDTH_PX
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            vmin: DEFAULT_MAP_VMIN,
            vmax: DEFAULT_MAP_VMAX,
            width: DEFAULT_MAP_WIDTH_PX,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    pub pollutant: String,
    pub label: String,
    pub input: InputConfig,
    #[serde(default)]
    pub window: Option<WindowConfig>,
    #[serde(default)]
    pub hexgrid: HexGridConfig,
    #[serde(default)]
    pub temporal: Option<TemporalConfig>,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub map: MapConfig,
}

impl RunConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: RunConfig = toml::from_str(content)?;
        if config.map.vmin >= config.map.vmax {
            return Err(ZonalError::Parse(format!(
                "[map] vmin {} must be below vmax {}",
                config.map.vmin, config.map.vmax
            )));
        }
        Ok(config)
    }

    /// The `[window]` section as a validated `TimeWindow`
    pub fn time_window(&self) -> Result<TimeWindow> {
        let window = self
            .window
            .as_ref()
            .ok_or_else(|| ZonalError::Parse("missing [window] section".to_string()))?;
        TimeWindow::parse(&window.begin, &window.end)
    }

    pub fn empty_region_policy(&self) -> EmptyRegionPolicy {
        self.window.as_ref().map(|w| w.empty_regions).unwrap_or_default()
    }

    pub fn tessellation(&self) -> TessellationConfig {
        TessellationConfig {
            containment: self.hexgrid.containment,
        }
    }

    /// `[temporal]` location as a WGS84 (lng, lat) point
    pub fn temporal_center(&self) -> Result<(Point<f64>, &TemporalConfig)> {
        let temporal = self
            .temporal
            .as_ref()
            .ok_or_else(|| ZonalError::Parse("missing [temporal] section".to_string()))?;
        Ok((Point::new(temporal.longitude, temporal.latitude), temporal))
    }
}
