//! Web-map tile addressing (z/x/y quad-tree scheme).

use crate::{HeatmapError, HeatmapResult, PixelBBox};
use serde::{Deserialize, Serialize};

/// Tile edge length in pixels.
pub const TILE_SIZE: u32 = 256;

/// Number of pixels in one tile.
pub const TILE_PIXELS: usize = (TILE_SIZE * TILE_SIZE) as usize;

/// Deepest supported zoom level.
pub const MAX_ZOOM: u8 = 30;

/// A tile coordinate (z/x/y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    /// Zoom level
    pub z: u8,
    /// Column (x)
    pub x: u32,
    /// Row (y)
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Build a tile coordinate from untrusted integers.
    ///
    /// Fails with `InvalidZoom` when `z` is outside `0..=30` and with
    /// `InvalidTile` when `x` or `y` is outside `[0, 2^z)`.
    pub fn checked(z: i64, x: i64, y: i64) -> HeatmapResult<Self> {
        if !(0..=MAX_ZOOM as i64).contains(&z) {
            return Err(HeatmapError::InvalidZoom(z));
        }
        let z = z as u8;
        let side = tiles_per_side(z) as i64;
        if !(0..side).contains(&x) || !(0..side).contains(&y) {
            return Err(HeatmapError::InvalidTile { x, y, z });
        }
        Ok(Self {
            z,
            x: x as u32,
            y: y as u32,
        })
    }

    /// Generate a cache key string.
    pub fn cache_key(&self) -> String {
        format!("{}/{}/{}", self.z, self.x, self.y)
    }

    /// Pixel bounding box of the tile at its own zoom level.
    pub fn pixel_bbox(&self) -> PixelBBox {
        let size = TILE_SIZE as i64;
        let min_x = self.x as i64 * size;
        let min_y = self.y as i64 * size;
        PixelBBox::new(min_x, min_y, min_x + size, min_y + size)
    }
}

/// Number of tiles along one side of the world at `zoom`.
pub fn tiles_per_side(zoom: u8) -> u64 {
    1u64 << zoom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_rejects_bad_zoom() {
        assert!(matches!(
            TileCoord::checked(31, 0, 0),
            Err(HeatmapError::InvalidZoom(31))
        ));
        assert!(matches!(
            TileCoord::checked(-1, 0, 0),
            Err(HeatmapError::InvalidZoom(-1))
        ));
    }

    #[test]
    fn test_checked_rejects_out_of_grid() {
        assert!(TileCoord::checked(0, 0, 0).is_ok());
        assert!(matches!(
            TileCoord::checked(0, 1, 0),
            Err(HeatmapError::InvalidTile { .. })
        ));
        assert!(TileCoord::checked(3, 7, 7).is_ok());
        assert!(TileCoord::checked(3, 8, 0).is_err());
        assert!(TileCoord::checked(30, (1 << 30) - 1, 0).is_ok());
    }

    #[test]
    fn test_pixel_bbox() {
        let bbox = TileCoord::new(2, 1, 3).pixel_bbox();
        assert_eq!(bbox, PixelBBox::new(256, 768, 512, 1024));
    }
}
