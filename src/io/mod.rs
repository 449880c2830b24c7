//! File collaborators around the engine: observation and boundary loaders,
//! CSV/GeoJSON/shapefile exporters and PNG plots. The aggregators never call into here.

pub mod boundary;
pub mod export;
pub mod geojson;
pub mod observations;
pub mod plot;
pub mod shp;

pub use boundary::{boundary_from_geojson, boundary_from_wkt, load_boundary, load_regions, read_regions};
pub use export::{
    ExportPaths, IdColumn, export_aggregate, hexagon_stem, load_aggregate, load_aggregate_csv, read_aggregate_csv,
    spatial_stem, temporal_stem, write_peaks_csv, write_ranked_csv,
};
pub use observations::{load_observations, read_observations};
pub use plot::{MapPlotter, TimeSeriesPlotter};
pub use shp::{read_aggregate_shapefile, write_aggregate_shapefile};
