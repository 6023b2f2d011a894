//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

/// A geographic bounding box in degrees (x = longitude, y = latitude).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }
}

/// An integer pixel bounding box at some zoom level.
///
/// The box is half-open: it covers `[min_x, max_x) x [min_y, max_y)`.
/// Coordinates are `i64` because the world is `256 * 2^30` pixels wide at
/// the deepest zoom level, and an expanded box may reach past the world edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelBBox {
    pub min_x: i64,
    pub min_y: i64,
    pub max_x: i64,
    pub max_y: i64,
}

impl PixelBBox {
    pub fn new(min_x: i64, min_y: i64, max_x: i64, max_y: i64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// True when the box covers no pixel.
    pub fn is_empty(&self) -> bool {
        self.max_x <= self.min_x || self.max_y <= self.min_y
    }

    /// Grow the box by `radius` pixels on every side.
    pub fn expand(&self, radius: i64) -> PixelBBox {
        let radius = radius.max(0);
        PixelBBox {
            min_x: self.min_x.saturating_sub(radius),
            min_y: self.min_y.saturating_sub(radius),
            max_x: self.max_x.saturating_add(radius),
            max_y: self.max_y.saturating_add(radius),
        }
    }

    /// Check if a pixel lies inside the (half-open) box.
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.min_x && x < self.max_x && y >= self.min_y && y < self.max_y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_bbox_is_half_open() {
        let bbox = PixelBBox::new(0, 0, 256, 256);
        assert!(bbox.contains(0, 0));
        assert!(bbox.contains(255, 255));
        assert!(!bbox.contains(256, 0));
        assert!(!bbox.contains(0, 256));
    }
}
