//! Common types and utilities shared across the heatmap tile engine crates.

pub mod bbox;
pub mod color;
pub mod error;
pub mod event;
pub mod tile;
pub mod time;

pub use bbox::{BoundingBox, PixelBBox};
pub use color::Color;
pub use error::{HeatmapError, HeatmapResult};
pub use event::GeoEvent;
pub use tile::{TileCoord, MAX_ZOOM, TILE_PIXELS, TILE_SIZE};
pub use time::{format_millis, now_millis, TimeWindow, DAY_MS, HOUR_MS};
