//! Geocell grid used to index events spatially.
//!
//! A geocell is one 256x256 block of Mercator pixels at the store's index
//! zoom, i.e. the footprint of one tile at that zoom. Events are bucketed by
//! the cell their index-zoom pixel falls into; queries at any zoom are
//! translated into an inclusive range of cells.

use heatmap_common::{PixelBBox, MAX_ZOOM};
use projection::rescale_pixel;

/// Index zoom used when none is configured (cells of roughly 10 km at the
/// equator).
pub const DEFAULT_INDEX_ZOOM: u8 = 12;

/// log2 of the cell edge in pixels.
const CELL_SHIFT: u32 = 8;

/// Identifier of one geocell. Orders row-major (north to south, then west to
/// east) so query results come out in a stable order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub cy: u32,
    pub cx: u32,
}

impl CellKey {
    /// Cell containing pixel `(x, y)` at `index_zoom`, clamped to the world.
    pub fn from_pixel(x: i64, y: i64, index_zoom: u8) -> Self {
        let last = cells_per_side(index_zoom) as i64 - 1;
        Self {
            cx: (x >> CELL_SHIFT).clamp(0, last) as u32,
            cy: (y >> CELL_SHIFT).clamp(0, last) as u32,
        }
    }
}

/// Number of cells along one side of the world at `index_zoom`.
pub fn cells_per_side(index_zoom: u8) -> u64 {
    1u64 << index_zoom.min(MAX_ZOOM)
}

/// Inclusive rectangle of geocells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub min_cx: u32,
    pub min_cy: u32,
    pub max_cx: u32,
    pub max_cy: u32,
}

impl CellRange {
    /// Cells that can hold an event whose pixel at `zoom` lies in `bbox`.
    ///
    /// Events are projected independently at each zoom, so rounding can move
    /// a point by up to half a pixel of the coarser grid. The range is padded
    /// to cover that; callers still filter on the exact pixel position.
    pub fn covering(bbox: &PixelBBox, zoom: u8, index_zoom: u8) -> Option<Self> {
        if bbox.is_empty() {
            return None;
        }

        let pad = if zoom < index_zoom {
            (1i64 << (index_zoom - zoom)) + 1
        } else {
            2
        };

        let min_x = rescale_pixel(bbox.min_x, zoom, index_zoom) - pad;
        let min_y = rescale_pixel(bbox.min_y, zoom, index_zoom) - pad;
        let max_x = rescale_pixel(bbox.max_x, zoom, index_zoom) + pad;
        let max_y = rescale_pixel(bbox.max_y, zoom, index_zoom) + pad;

        let low = CellKey::from_pixel(min_x, min_y, index_zoom);
        let high = CellKey::from_pixel(max_x, max_y, index_zoom);

        Some(Self {
            min_cx: low.cx,
            min_cy: low.cy,
            max_cx: high.cx,
            max_cy: high.cy,
        })
    }

    /// Number of cells in the range.
    pub fn cell_count(&self) -> u64 {
        (self.max_cx - self.min_cx + 1) as u64 * (self.max_cy - self.min_cy + 1) as u64
    }

    pub fn contains(&self, key: &CellKey) -> bool {
        (self.min_cx..=self.max_cx).contains(&key.cx)
            && (self.min_cy..=self.max_cy).contains(&key.cy)
    }

    /// Row-major iteration over every key in the range.
    pub fn keys(&self) -> impl Iterator<Item = CellKey> + '_ {
        (self.min_cy..=self.max_cy)
            .flat_map(move |cy| (self.min_cx..=self.max_cx).map(move |cx| CellKey { cy, cx }))
    }
}
