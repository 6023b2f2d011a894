//! Heatmap tile rendering.
//!
//! Turns the events of a [`point_store::PointStore`] into 256x256 RGBA
//! tiles:
//! - [`radiator`]: decay kernels spreading each event over nearby pixels
//! - [`palette`]: 256-entry color ramps
//! - [`builder`]: the per-tile pipeline (query, accumulate, normalize, colorize)
//! - [`style`]: custom palettes and radiators from configuration

pub mod buffer_pool;
pub mod builder;
pub mod palette;
pub mod radiator;
pub mod raster;
pub mod request;
pub mod style;

pub use builder::TileBuilder;
pub use palette::{Palette, PaletteRegistry, DEFAULT_PALETTE, PALETTE_SIZE};
pub use radiator::{
    KernelRadiator, KernelShape, Radiator, RadiatorRegistry, DEFAULT_HORIZON_MS, DEFAULT_RADIATOR,
    MAX_SUPPORT_RADIUS,
};
pub use raster::{RenderedTile, TileRaster};
pub use request::{TileRequest, TileRequestBuilder, DEFAULT_MAX_BUCKET_COUNT};
pub use style::{PaletteDefinition, RadiatorDefinition, StyleConfig};
