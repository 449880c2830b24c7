// WGS84 ellipsoid
pub const WGS84_SEMI_MAJOR_AXIS_M: f64 = 6_378_137.0;
pub const WGS84_FLATTENING: f64 = 1.0 / 298.257_223_563;

// Spherical (Web) Mercator, EPSG:3857
pub const WEB_MERCATOR_RADIUS_M: f64 = WGS84_SEMI_MAJOR_AXIS_M;
pub const WEB_MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

// Universal Transverse Mercator
pub const UTM_SCALE_FACTOR: f64 = 0.9996;
pub const UTM_FALSE_EASTING_M: f64 = 500_000.0;
pub const UTM_FALSE_NORTHING_SOUTH_M: f64 = 10_000_000.0;
pub const UTM_ZONE_WIDTH_DEG: f64 = 6.0;

// H3 resolution tiers, 0 (coarsest) to 15 (finest)
pub const MAX_H3_RESOLUTION: u8 = 15;
pub const DEFAULT_HEX_RESOLUTION: u8 = 9;

// run defaults
pub const DEFAULT_BUFFER_RADIUS_M: f64 = 250.0;
pub const DEFAULT_REGION_ID_FIELD: &str = "GEOID";
pub const WINDOW_TIME_FORMAT: &str = "%Y/%m/%d %H:%M:%S";
pub const FILE_TIME_FORMAT: &str = "%Y_%m_%d_%H_%M_%S";

// map rendering
pub const DEFAULT_MAP_VMIN: f64 = 350.0; // ppm, CO2 background
pub const DEFAULT_MAP_VMAX: f64 = 800.0;
pub const DEFAULT_MAP_WIDTH_PX: u32 = 1200;
pub const MAP_FILL_ALPHA: f64 = 0.5;
pub const MISSING_DATA_RGB: [u8; 3] = [211, 211, 211]; // lightgrey
pub const BACKGROUND_RGB: [u8; 3] = [255, 255, 255];
