//! PNG rendering of aggregate results
//!
//! `MapPlotter` draws aggregate polygons in Web Mercator, filled on a fixed
//! value scale with a reversed viridis ramp (low = yellow, high = purple) at
//! half opacity over a white background. Regions with no mean are light grey.
//! A colour bar for the scale runs down the right edge.
//!
//! `TimeSeriesPlotter` draws a date-keyed series as a line chart.

use crate::aggregate::AggregateRecord;
use crate::constants::{
    BACKGROUND_RGB, DEFAULT_MAP_VMAX, DEFAULT_MAP_VMIN, DEFAULT_MAP_WIDTH_PX, MAP_FILL_ALPHA, MISSING_DATA_RGB,
};
use crate::crs::Crs;
use crate::error::{Result, ZonalError};
use crate::geo_adapter;
use crate::math_utils::{clamp, inverse_lerp, lerp};
use geo::{BoundingRect, Coord, Geometry, LineString, Rect};
use image::{Rgb, RgbImage};
use std::path::Path;
use tracing::{debug, info};

/// Anchor colours of viridis at t = 0, 0.25, 0.5, 0.75, 1
const VIRIDIS: [[f64; 3]; 5] = [
    [68.0, 1.0, 84.0],
    [59.0, 82.0, 139.0],
    [33.0, 145.0, 140.0],
    [94.0, 201.0, 98.0],
    [253.0, 231.0, 37.0],
];

const COLOR_BAR_WIDTH_PX: u32 = 24;
const MARGIN_FRACTION: f64 = 0.05;

/// Viridis at `t` in `[0, 1]`
pub fn viridis(t: f64) -> Rgb<u8> {
    let t = clamp(t, 0.0, 1.0);
    let scaled = t * (VIRIDIS.len() - 1) as f64;
    let lower = (scaled.floor() as usize).min(VIRIDIS.len() - 2);
    let ratio = scaled - lower as f64;
    let (a, b) = (VIRIDIS[lower], VIRIDIS[lower + 1]);
    Rgb([
        lerp(a[0], b[0], ratio).round() as u8,
        lerp(a[1], b[1], ratio).round() as u8,
        lerp(a[2], b[2], ratio).round() as u8,
    ])
}

/// Reversed viridis
pub fn viridis_r(t: f64) -> Rgb<u8> {
    viridis(1.0 - t)
}

/// `color` painted over `under` at `alpha` opacity
pub fn blend(color: Rgb<u8>, under: Rgb<u8>, alpha: f64) -> Rgb<u8> {
    let mix = |c: u8, u: u8| lerp(u as f64, c as f64, alpha).round() as u8;
    Rgb([
        mix(color[0], under[0]),
        mix(color[1], under[1]),
        mix(color[2], under[2]),
    ])
}

/// Even-odd scanline fill of a set of rings given in pixel space. Interior
/// rings in the set cut holes.
fn fill_rings(image: &mut RgbImage, rings: &[Vec<(f64, f64)>], color: Rgb<u8>, alpha: f64) {
    let (width, height) = image.dimensions();
    let min_y = rings
        .iter()
        .flatten()
        .map(|p| p.1)
        .fold(f64::INFINITY, f64::min)
        .floor()
        .max(0.0) as u32;
    let max_y = rings
        .iter()
        .flatten()
        .map(|p| p.1)
        .fold(f64::NEG_INFINITY, f64::max)
        .ceil()
        .min(height as f64 - 1.0);
    if max_y < 0.0 {
        return;
    }

    for y in min_y..=(max_y as u32) {
        // sample at the pixel centre
        let scan_y = y as f64 + 0.5;
        let mut crossings = Vec::new();
        for ring in rings {
            for i in 0..ring.len() {
                let p1 = ring[i];
                let p2 = ring[(i + 1) % ring.len()];
                if (p1.1 <= scan_y && p2.1 > scan_y) || (p2.1 <= scan_y && p1.1 > scan_y) {
                    crossings.push(p1.0 + (scan_y - p1.1) * (p2.0 - p1.0) / (p2.1 - p1.1));
                }
            }
        }
        crossings.sort_by(f64::total_cmp);

        for pair in crossings.chunks(2) {
            if let [x1, x2] = pair {
                let start = (x1 - 0.5).ceil().max(0.0) as u32;
                let end = (x2 - 0.5).floor().min(width as f64 - 1.0);
                if end < 0.0 {
                    continue;
                }
                for x in start..=(end as u32) {
                    let under = *image.get_pixel(x, y);
                    image.put_pixel(x, y, blend(color, under, alpha));
                }
            }
        }
    }
}

/// Affine map from Web Mercator metres to image pixels (y down)
#[derive(Debug, Clone, Copy)]
pub struct MapFrame {
    extent: Rect<f64>,
    width: u32,
    height: u32,
}

impl MapFrame {
    /// Fit `extent` (with a small margin) into an image `width` pixels wide,
    /// keeping the aspect ratio.
    pub fn fit(extent: Rect<f64>, width: u32) -> Self {
        let pad_x = extent.width().max(1.0) * MARGIN_FRACTION;
        let pad_y = extent.height().max(1.0) * MARGIN_FRACTION;
        let extent = Rect::new(
            Coord { x: extent.min().x - pad_x, y: extent.min().y - pad_y },
            Coord { x: extent.max().x + pad_x, y: extent.max().y + pad_y },
        );
        let aspect = extent.height() / extent.width();
        let height = (width as f64 * aspect).round().clamp(1.0, 4.0 * width as f64) as u32;
        Self { extent, width, height }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn to_pixel(&self, coord: Coord<f64>) -> (f64, f64) {
        let x = inverse_lerp(self.extent.min().x, self.extent.max().x, coord.x) * self.width as f64;
        let y = (1.0 - inverse_lerp(self.extent.min().y, self.extent.max().y, coord.y)) * self.height as f64;
        (x, y)
    }

    fn ring_pixels(&self, ring: &LineString<f64>) -> Vec<(f64, f64)> {
        ring.coords().map(|c| self.to_pixel(*c)).collect()
    }
}

#[derive(Debug, Clone)]
pub struct MapPlotter {
    vmin: f64,
    vmax: f64,
    width: u32,
}

impl Default for MapPlotter {
    fn default() -> Self {
        Self {
            vmin: DEFAULT_MAP_VMIN,
            vmax: DEFAULT_MAP_VMAX,
            width: DEFAULT_MAP_WIDTH_PX,
        }
    }
}

impl MapPlotter {
    pub fn new(vmin: f64, vmax: f64, width: u32) -> Result<Self> {
        if !vmin.is_finite() || !vmax.is_finite() || vmin >= vmax {
            return Err(ZonalError::Parse(format!("map range {}..{} is empty", vmin, vmax)));
        }
        Ok(Self {
            vmin,
            vmax,
            width: width.max(COLOR_BAR_WIDTH_PX * 4),
        })
    }

    /// Fill colour for a mean; `None` is missing data
    pub fn color_for(&self, mean: Option<f64>) -> Rgb<u8> {
        match mean {
            Some(value) => viridis_r(inverse_lerp(self.vmin, self.vmax, value)),
            None => Rgb(MISSING_DATA_RGB),
        }
    }

    /// Frame fitted to the records' geometry, or `None` if none has any
    pub fn frame(&self, mercator: &[(Geometry<f64>, Option<f64>)]) -> Option<MapFrame> {
        let extent = mercator
            .iter()
            .filter_map(|(geometry, _)| geometry.bounding_rect())
            .reduce(|a, b| {
                Rect::new(
                    Coord { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                    Coord { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
                )
            })?;
        Some(MapFrame::fit(extent, self.width - COLOR_BAR_WIDTH_PX))
    }

    /// Records' geometry (in `crs`) reprojected to Web Mercator, paired with their means
    pub fn to_mercator(records: &[AggregateRecord], crs: Crs) -> Result<Vec<(Geometry<f64>, Option<f64>)>> {
        records
            .iter()
            .filter_map(|record| record.geometry.as_ref().map(|g| (g, record.mean_value)))
            .map(|(geometry, mean)| {
                Ok((geo_adapter::reproject_geometry(geometry, crs, Crs::WebMercator)?, mean))
            })
            .collect()
    }

    pub fn render(&self, records: &[AggregateRecord], crs: Crs) -> Result<RgbImage> {
        let mercator = Self::to_mercator(records, crs)?;
        let frame = self
            .frame(&mercator)
            .ok_or_else(|| ZonalError::InvalidGeometry("no record has a geometry to map".to_string()))?;

        let mut image = RgbImage::from_pixel(self.width, frame.height(), Rgb(BACKGROUND_RGB));
        for (geometry, mean) in &mercator {
            let color = self.color_for(*mean);
            for polygon in geo_adapter::split_polygons(geometry) {
                let mut rings = vec![frame.ring_pixels(polygon.exterior())];
                rings.extend(polygon.interiors().iter().map(|ring| frame.ring_pixels(ring)));
                fill_rings(&mut image, &rings, color, MAP_FILL_ALPHA);
            }
        }
        self.draw_color_bar(&mut image, frame.width());

        debug!(polygons = mercator.len(), width = self.width, height = frame.height(), "rendered map");
        Ok(image)
    }

    /// vmax at the top, vmin at the bottom
    fn draw_color_bar(&self, image: &mut RgbImage, left: u32) {
        let height = image.height();
        let inset = COLOR_BAR_WIDTH_PX / 4;
        for y in 0..height {
            let t = 1.0 - y as f64 / (height.max(2) - 1) as f64;
            let color = viridis_r(t);
            for x in (left + inset)..(left + COLOR_BAR_WIDTH_PX - inset) {
                image.put_pixel(x, y, color);
            }
        }
    }

    pub fn save<P: AsRef<Path>>(&self, records: &[AggregateRecord], crs: Crs, path: P) -> Result<()> {
        let image = self.render(records, crs)?;
        image.save(path.as_ref())?;
        info!(path = %path.as_ref().display(), records = records.len(), "saved map");
        Ok(())
    }
}

/// Line chart of an ordered series, e.g. daily means from the temporal aggregator
#[derive(Debug, Clone)]
pub struct TimeSeriesPlotter {
    width: u32,
    height: u32,
}

impl Default for TimeSeriesPlotter {
    fn default() -> Self {
        // 12 x 9 figure proportions
        Self { width: 960, height: 720 }
    }
}

const SERIES_RGB: [u8; 3] = [31, 119, 180];
const AXIS_RGB: [u8; 3] = [0, 0, 0];

impl TimeSeriesPlotter {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(64),
            height: height.max(48),
        }
    }

    /// Pixel position of each point with a mean, in series order
    pub fn points(&self, records: &[AggregateRecord]) -> Vec<(f64, f64)> {
        let values: Vec<(usize, f64)> = records
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.mean_value.map(|v| (i, v)))
            .collect();
        let (low, high) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, v)| (lo.min(*v), hi.max(*v)));

        let margin_x = self.width as f64 * 0.08;
        let margin_y = self.height as f64 * 0.08;
        let span = (records.len().max(2) - 1) as f64;
        values
            .into_iter()
            .map(|(i, v)| {
                let x = lerp(margin_x, self.width as f64 - margin_x, i as f64 / span);
                let t = if high > low { inverse_lerp(low, high, v) } else { 0.5 };
                let y = lerp(self.height as f64 - margin_y, margin_y, t);
                (x, y)
            })
            .collect()
    }

    pub fn render(&self, records: &[AggregateRecord]) -> RgbImage {
        let mut image = RgbImage::from_pixel(self.width, self.height, Rgb(BACKGROUND_RGB));

        let margin_x = self.width as f64 * 0.08;
        let margin_y = self.height as f64 * 0.08;
        let bottom = self.height as f64 - margin_y;
        draw_line(&mut image, (margin_x, bottom), (self.width as f64 - margin_x, bottom), Rgb(AXIS_RGB));
        draw_line(&mut image, (margin_x, margin_y), (margin_x, bottom), Rgb(AXIS_RGB));

        let points = self.points(records);
        for pair in points.windows(2) {
            draw_line(&mut image, pair[0], pair[1], Rgb(SERIES_RGB));
        }
        for &(x, y) in &points {
            for dy in -2..=2 {
                for dx in -2..=2 {
                    put_clipped(&mut image, x.round() as i64 + dx, y.round() as i64 + dy, Rgb(SERIES_RGB));
                }
            }
        }
        image
    }

    pub fn save<P: AsRef<Path>>(&self, records: &[AggregateRecord], path: P) -> Result<()> {
        self.render(records).save(path.as_ref())?;
        info!(path = %path.as_ref().display(), points = records.len(), "saved time series plot");
        Ok(())
    }
}

fn put_clipped(image: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
        image.put_pixel(x as u32, y as u32, color);
    }
}

/// DDA line between two pixel positions
fn draw_line(image: &mut RgbImage, from: (f64, f64), to: (f64, f64), color: Rgb<u8>) {
    let steps = (to.0 - from.0).abs().max((to.1 - from.1).abs()).ceil().max(1.0) as usize;
    for step in 0..=steps {
        let t = step as f64 / steps as f64;
        put_clipped(
            image,
            lerp(from.0, to.0, t).round() as i64,
            lerp(from.1, to.1, t).round() as i64,
            color,
        );
    }
}
