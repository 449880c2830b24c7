use chrono::{DateTime, Utc};

/// Errors raised by the aggregation engine and its file collaborators.
///
/// The first group are precondition violations of the core operations and are
/// reported synchronously; nothing is retried. Empty inputs are never errors.
/// The second group only come out of the `io` and `config` modules. The binary
/// converts to `anyhow::Error` at its boundary.
#[derive(Debug, thiserror::Error)]
pub enum ZonalError {
    #[error("invalid time window: begin {begin} is after end {end}")]
    InvalidWindow {
        begin: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("invalid buffer radius {0} m: must be a positive, finite distance")]
    InvalidRadius(f64),

    #[error("invalid H3 resolution {0}: supported range is 0..=15")]
    InvalidResolution(u8),

    /// Coordinates supplied in a CRS that cannot be projected into the one required.
    #[error("CRS mismatch: {0}")]
    CrsMismatch(String),

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Peak detection over records needs a mean at every position of the series.
    #[error("series has no mean_value at index {0}")]
    NullInSeries(usize),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),
}

pub type Result<T> = std::result::Result<T, ZonalError>;
