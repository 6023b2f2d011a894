//! Coordinate conversions between geographic and tile-pixel space.
//!
//! Implements the spherical Mercator projection used by web-map tile grids
//! from scratch, with per-zoom constants precomputed once.

pub mod mercator;

pub use mercator::{
    lat_lon_to_pixel, lat_lon_to_tile, mercator_units, pixel_to_lat_lon, rescale_pixel,
    tile_geo_bbox, world_pixels, Mercator, MAX_SIN_LAT,
};
