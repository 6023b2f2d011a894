//! Spherical Mercator projection for 256x256 web-map tiles.
//!
//! At zoom `z` the world is `256 * 2^z` pixels on a side and the pixel at
//! the center of the world (lat 0, lon 0) is `128 * 2^z` on both axes.
//!
//! - Longitude maps linearly: `x = round(center + lon * pixels_per_degree[z])`
//!   with `pixels_per_degree[z] = 256 * 2^z / 360`.
//! - Latitude goes through the Mercator function:
//!   `y = round(center - pixels_per_unit[z] * 0.5 * ln((1 + sin lat) / (1 - sin lat)))`
//!   with `pixels_per_unit[z] = 256 * 2^z / (2 * PI)`.
//!
//! `sin lat` is clamped to `[-0.9999, 0.9999]` so the logarithm stays finite
//! at the poles; those rows do not round-trip.

use heatmap_common::{BoundingBox, HeatmapError, HeatmapResult, TileCoord, MAX_ZOOM, TILE_SIZE};
use once_cell::sync::Lazy;
use std::f64::consts::PI;

/// Largest |sin(lat)| fed into the Mercator logarithm.
pub const MAX_SIN_LAT: f64 = 0.9999;

const LEVELS: usize = MAX_ZOOM as usize + 1;

/// Per-zoom projection constants.
struct ZoomTables {
    center: [i64; LEVELS],
    pixels_per_degree: [f64; LEVELS],
    pixels_per_unit: [f64; LEVELS],
}

impl ZoomTables {
    fn compute() -> Self {
        let mut center = [0i64; LEVELS];
        let mut pixels_per_degree = [0.0f64; LEVELS];
        let mut pixels_per_unit = [0.0f64; LEVELS];

        for z in 0..LEVELS {
            let span = world_pixels(z as u8) as f64;
            center[z] = (TILE_SIZE as i64 / 2) << z;
            pixels_per_degree[z] = span / 360.0;
            pixels_per_unit[z] = span / (2.0 * PI);
        }

        Self {
            center,
            pixels_per_degree,
            pixels_per_unit,
        }
    }
}

static TABLES: Lazy<ZoomTables> = Lazy::new(ZoomTables::compute);

/// Mercator projection bound to one zoom level.
///
/// Cheap to copy; build one per request and reuse it for every event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mercator {
    zoom: u8,
    center: i64,
    pixels_per_degree: f64,
    pixels_per_unit: f64,
}

impl Mercator {
    /// Projection constants for `zoom`; fails with `InvalidZoom` above 30.
    pub fn at_zoom(zoom: u8) -> HeatmapResult<Self> {
        if zoom > MAX_ZOOM {
            return Err(HeatmapError::InvalidZoom(zoom as i64));
        }
        Ok(Self::clamped(zoom))
    }

    /// Projection constants for `zoom`, capped at the deepest zoom level.
    pub fn clamped(zoom: u8) -> Self {
        let zoom = zoom.min(MAX_ZOOM);
        let z = zoom as usize;
        let tables = &*TABLES;

        Self {
            zoom,
            center: tables.center[z],
            pixels_per_degree: tables.pixels_per_degree[z],
            pixels_per_unit: tables.pixels_per_unit[z],
        }
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Pixel coordinate of the world center.
    pub fn center(&self) -> i64 {
        self.center
    }

    /// Convert geographic coordinates (degrees) to pixel coordinates.
    ///
    /// Returns `(x, y)` with `y` growing southwards.
    pub fn geo_to_pixel(&self, lat: f64, lon: f64) -> (i64, i64) {
        self.project_units(lon, mercator_units(lat))
    }

    /// Project a longitude and a precomputed [`mercator_units`] value.
    ///
    /// Lets callers that project the same point at many zoom levels pay the
    /// trigonometry only once.
    #[inline]
    pub fn project_units(&self, lon: f64, units: f64) -> (i64, i64) {
        let center = self.center as f64;
        let x = (center + lon * self.pixels_per_degree).round() as i64;
        let y = (center - units * self.pixels_per_unit).round() as i64;
        (x, y)
    }

    /// Convert pixel coordinates back to `(lat, lon)` in degrees.
    pub fn pixel_to_geo(&self, x: i64, y: i64) -> (f64, f64) {
        let lon = (x - self.center) as f64 / self.pixels_per_degree;
        let units = (y - self.center) as f64 / -self.pixels_per_unit;
        let lat = (2.0 * units.exp().atan() - PI / 2.0).to_degrees();
        (lat, lon)
    }
}

/// Mercator ordinate of a latitude: `0.5 * ln((1 + sin lat) / (1 - sin lat))`
/// with `sin lat` clamped to `[-MAX_SIN_LAT, MAX_SIN_LAT]`.
#[inline]
pub fn mercator_units(lat: f64) -> f64 {
    let sin_lat = lat.to_radians().sin().clamp(-MAX_SIN_LAT, MAX_SIN_LAT);
    0.5 * ((1.0 + sin_lat) / (1.0 - sin_lat)).ln()
}

/// Convert `(lat, lon)` in degrees to pixel coordinates at `zoom`.
pub fn lat_lon_to_pixel(lat: f64, lon: f64, zoom: u8) -> HeatmapResult<(i64, i64)> {
    Ok(Mercator::at_zoom(zoom)?.geo_to_pixel(lat, lon))
}

/// Convert pixel coordinates at `zoom` to `(lat, lon)` in degrees.
pub fn pixel_to_lat_lon(x: i64, y: i64, zoom: u8) -> HeatmapResult<(f64, f64)> {
    Ok(Mercator::at_zoom(zoom)?.pixel_to_geo(x, y))
}

/// World size in pixels along one axis at `zoom`.
pub fn world_pixels(zoom: u8) -> i64 {
    (TILE_SIZE as i64) << zoom
}

/// Move a pixel coordinate from zoom `from` to zoom `to`.
///
/// Zooming in multiplies by `2^(to - from)`; zooming out floors.
pub fn rescale_pixel(pixel: i64, from: u8, to: u8) -> i64 {
    if to >= from {
        pixel << (to - from)
    } else {
        pixel >> (from - to)
    }
}

/// Tile containing `(lat, lon)` at `zoom`.
pub fn lat_lon_to_tile(lat: f64, lon: f64, zoom: u8) -> HeatmapResult<TileCoord> {
    let (x, y) = lat_lon_to_pixel(lat, lon, zoom)?;
    let last = (1i64 << zoom) - 1;
    let size = TILE_SIZE as i64;

    Ok(TileCoord::new(
        zoom,
        (x / size).clamp(0, last) as u32,
        (y / size).clamp(0, last) as u32,
    ))
}

/// Geographic bounding box of a tile, from its inverse-projected corners.
pub fn tile_geo_bbox(tile: &TileCoord) -> HeatmapResult<BoundingBox> {
    let mercator = Mercator::at_zoom(tile.z)?;
    let pixels = tile.pixel_bbox();

    let (max_lat, min_lon) = mercator.pixel_to_geo(pixels.min_x, pixels.min_y);
    let (min_lat, max_lon) = mercator.pixel_to_geo(pixels.max_x, pixels.max_y);

    Ok(BoundingBox::new(min_lon, min_lat, max_lon, max_lat))
}
