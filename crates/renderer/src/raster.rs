//! Render output.

use heatmap_common::{Color, TILE_PIXELS, TILE_SIZE};

/// A 256x256 RGBA8 raster, row-major, plus render diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRaster {
    pixels: Vec<u8>,
    peak: f64,
    events: usize,
}

impl TileRaster {
    pub(crate) fn new(pixels: Vec<u8>, peak: f64, events: usize) -> Self {
        debug_assert_eq!(pixels.len(), TILE_PIXELS * 4);
        Self {
            pixels,
            peak,
            events,
        }
    }

    pub fn width(&self) -> u32 {
        TILE_SIZE
    }

    pub fn height(&self) -> u32 {
        TILE_SIZE
    }

    /// RGBA bytes, 4 per pixel.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels
    }

    /// Largest accumulated intensity before normalization.
    pub fn peak(&self) -> f64 {
        self.peak
    }

    /// Number of events that reached the accumulation step.
    pub fn events(&self) -> usize {
        self.events
    }

    /// Color at `(x, y)`; `None` outside the tile.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= TILE_SIZE || y >= TILE_SIZE {
            return None;
        }
        let offset = (y as usize * TILE_SIZE as usize + x as usize) * 4;
        let px = &self.pixels[offset..offset + 4];
        Some(Color::new(px[0], px[1], px[2], px[3]))
    }

    /// True when every pixel has alpha 0.
    pub fn is_transparent(&self) -> bool {
        self.pixels.chunks_exact(4).all(|px| px[3] == 0)
    }
}

/// Result of a tile render. `NoData` means nothing contributed to the tile,
/// which is different from a raster that happens to be transparent.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderedTile {
    Raster(TileRaster),
    NoData,
}

impl RenderedTile {
    pub fn is_no_data(&self) -> bool {
        matches!(self, RenderedTile::NoData)
    }

    pub fn raster(&self) -> Option<&TileRaster> {
        match self {
            RenderedTile::Raster(raster) => Some(raster),
            RenderedTile::NoData => None,
        }
    }

    pub fn into_raster(self) -> Option<TileRaster> {
        match self {
            RenderedTile::Raster(raster) => Some(raster),
            RenderedTile::NoData => None,
        }
    }

    /// Short label for logs and metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            RenderedTile::Raster(_) => "raster",
            RenderedTile::NoData => "no_data",
        }
    }
}
