//! Validated tile render requests.
//!
//! Untrusted parameters go through [`TileRequestBuilder`]: structurally
//! invalid values (zoom, tile address, bucket layout) are errors, cosmetic
//! ones (scale, opacity, time decay) fall back to defaults.

use crate::palette::Palette;
use crate::radiator::{effective_scale, DEFAULT_RADIATOR};
use heatmap_common::{now_millis, HeatmapError, HeatmapResult, TileCoord, TimeWindow};
use std::sync::Arc;
use tracing::debug;

/// Upper bound on `bucket_count` when none is configured.
pub const DEFAULT_MAX_BUCKET_COUNT: u32 = 1024;

/// One render request, after validation.
#[derive(Debug, Clone)]
pub struct TileRequest {
    tile: TileCoord,
    timestamp: i64,
    bucket_span: i64,
    bucket_count: u32,
    time_decay: f64,
    scale: f64,
    radiator: String,
    palette: Arc<Palette>,
    opacity: f64,
}

impl TileRequest {
    /// Start a request for tile `z/x/y`.
    pub fn builder(z: i64, x: i64, y: i64) -> TileRequestBuilder {
        TileRequestBuilder::new(z, x, y)
    }

    pub fn tile(&self) -> TileCoord {
        self.tile
    }

    /// Reference instant (epoch ms); event ages are measured from here.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn bucket_span(&self) -> i64 {
        self.bucket_span
    }

    pub fn bucket_count(&self) -> u32 {
        self.bucket_count
    }

    pub fn time_decay(&self) -> f64 {
        self.time_decay
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn radiator(&self) -> &str {
        &self.radiator
    }

    pub fn palette(&self) -> &Arc<Palette> {
        &self.palette
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    /// Time windows to aggregate, newest first.
    ///
    /// Bucket `b` covers `[timestamp - (b+1)*span, timestamp - b*span)`. A
    /// span of 0 means a single closed window reaching back `horizon_ms`.
    pub fn windows(&self, horizon_ms: i64) -> Vec<TimeWindow> {
        if self.bucket_span == 0 {
            return vec![TimeWindow::through(
                self.timestamp.saturating_sub(horizon_ms.max(0)),
                self.timestamp,
            )];
        }

        (0..self.bucket_count as i64)
            .map(|b| {
                let end = self
                    .timestamp
                    .saturating_sub(b.saturating_mul(self.bucket_span));
                let start = end.saturating_sub(self.bucket_span);
                TimeWindow::new(start, end)
            })
            .collect()
    }
}

/// Builder that applies defaults and validation for [`TileRequest`].
#[derive(Debug, Clone)]
pub struct TileRequestBuilder {
    z: i64,
    x: i64,
    y: i64,
    timestamp: i64,
    bucket_span: i64,
    bucket_count: i64,
    time_decay: Option<f64>,
    scale: Option<f64>,
    radiator: Option<String>,
    palette: Option<Arc<Palette>>,
    opacity: Option<f64>,
    max_bucket_count: u32,
    now: Option<i64>,
}

impl TileRequestBuilder {
    pub fn new(z: i64, x: i64, y: i64) -> Self {
        Self {
            z,
            x,
            y,
            timestamp: 0,
            bucket_span: 0,
            bucket_count: 1,
            time_decay: None,
            scale: None,
            radiator: None,
            palette: None,
            opacity: None,
            max_bucket_count: DEFAULT_MAX_BUCKET_COUNT,
            now: None,
        }
    }

    /// Reference instant in epoch ms; 0 means "now".
    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn bucket_span(mut self, span_ms: i64) -> Self {
        self.bucket_span = span_ms;
        self
    }

    pub fn bucket_count(mut self, count: i64) -> Self {
        self.bucket_count = count;
        self
    }

    pub fn time_decay(mut self, decay: f64) -> Self {
        self.time_decay = Some(decay);
        self
    }

    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn radiator(mut self, name: impl Into<String>) -> Self {
        self.radiator = Some(name.into());
        self
    }

    pub fn palette(mut self, palette: Arc<Palette>) -> Self {
        self.palette = Some(palette);
        self
    }

    pub fn opacity(mut self, opacity: f64) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn max_bucket_count(mut self, max: u32) -> Self {
        self.max_bucket_count = max.max(1);
        self
    }

    /// Clock used when the timestamp is 0. Defaults to the wall clock.
    pub fn now(mut self, now: i64) -> Self {
        self.now = Some(now);
        self
    }

    pub fn build(self) -> HeatmapResult<TileRequest> {
        let tile = TileCoord::checked(self.z, self.x, self.y)?;

        if self.bucket_span < 0 {
            return Err(HeatmapError::invalid_parameter(
                "bucketspan",
                format!("{} must not be negative", self.bucket_span),
            ));
        }
        if self.bucket_count < 1 {
            return Err(HeatmapError::invalid_parameter(
                "bucketcount",
                format!("{} must be at least 1", self.bucket_count),
            ));
        }
        if self.bucket_count > self.max_bucket_count as i64 {
            return Err(HeatmapError::invalid_parameter(
                "bucketcount",
                format!("{} exceeds the maximum of {}", self.bucket_count, self.max_bucket_count),
            ));
        }

        let mut bucket_count = self.bucket_count as u32;
        if self.bucket_span == 0 && bucket_count > 1 {
            debug!(bucket_count, "Zero bucket span renders a single window");
            bucket_count = 1;
        }

        let timestamp = if self.timestamp == 0 {
            self.now.unwrap_or_else(now_millis)
        } else {
            self.timestamp
        };

        let scale = effective_scale(self.scale.unwrap_or(1.0));

        let opacity = match self.opacity {
            Some(o) if (0.0..=1.0).contains(&o) => o,
            _ => 1.0,
        };

        let time_decay = match self.time_decay {
            Some(d) if d.is_finite() => d.clamp(0.0, 1.0),
            _ => 1.0,
        };

        let radiator = self
            .radiator
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_RADIATOR.to_string());

        let palette = self.palette.unwrap_or_else(Palette::fire);

        Ok(TileRequest {
            tile,
            timestamp,
            bucket_span: self.bucket_span,
            bucket_count,
            time_decay,
            scale,
            radiator,
            palette,
            opacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heatmap_common::HOUR_MS;

    #[test]
    fn test_defaults() {
        let request = TileRequest::builder(3, 1, 2).now(5_000).build().unwrap();
        assert_eq!(request.tile(), TileCoord::new(3, 1, 2));
        assert_eq!(request.timestamp(), 5_000);
        assert_eq!(request.bucket_count(), 1);
        assert_eq!(request.scale(), 1.0);
        assert_eq!(request.opacity(), 1.0);
        assert_eq!(request.time_decay(), 1.0);
        assert_eq!(request.radiator(), DEFAULT_RADIATOR);
        assert_eq!(request.palette().name(), "FIRE");
    }

    #[test]
    fn test_soft_invalid_values_fall_back() {
        let request = TileRequest::builder(0, 0, 0)
            .scale(-2.0)
            .opacity(1.5)
            .time_decay(f64::NAN)
            .radiator("  ")
            .build()
            .unwrap();
        assert_eq!(request.scale(), 1.0);
        assert_eq!(request.opacity(), 1.0);
        assert_eq!(request.time_decay(), 1.0);
        assert_eq!(request.radiator(), DEFAULT_RADIATOR);

        let request = TileRequest::builder(0, 0, 0).opacity(0.0).build().unwrap();
        assert_eq!(request.opacity(), 0.0);
    }

    #[test]
    fn test_hard_invalid_values_fail() {
        assert!(matches!(
            TileRequest::builder(31, 0, 0).build(),
            Err(HeatmapError::InvalidZoom(31))
        ));
        assert!(matches!(
            TileRequest::builder(1, 2, 0).build(),
            Err(HeatmapError::InvalidTile { .. })
        ));
        assert!(matches!(
            TileRequest::builder(0, 0, 0).bucket_count(0).build(),
            Err(HeatmapError::InvalidParameter { .. })
        ));
        assert!(TileRequest::builder(0, 0, 0).bucket_span(-1).build().is_err());
        assert!(TileRequest::builder(0, 0, 0)
            .bucket_span(HOUR_MS)
            .bucket_count(11)
            .max_bucket_count(10)
            .build()
            .is_err());
    }

    #[test]
    fn test_bucket_windows() {
        let request = TileRequest::builder(0, 0, 0)
            .timestamp(10 * HOUR_MS)
            .bucket_span(HOUR_MS)
            .bucket_count(3)
            .build()
            .unwrap();
        let windows = request.windows(HOUR_MS);
        assert_eq!(
            windows,
            vec![
                TimeWindow::new(9 * HOUR_MS, 10 * HOUR_MS),
                TimeWindow::new(8 * HOUR_MS, 9 * HOUR_MS),
                TimeWindow::new(7 * HOUR_MS, 8 * HOUR_MS),
            ]
        );
    }

    #[test]
    fn test_zero_span_is_single_closed_window() {
        let request = TileRequest::builder(0, 0, 0)
            .timestamp(10 * HOUR_MS)
            .bucket_count(5)
            .build()
            .unwrap();
        assert_eq!(request.bucket_count(), 1);
        assert_eq!(
            request.windows(2 * HOUR_MS),
            vec![TimeWindow::through(8 * HOUR_MS, 10 * HOUR_MS)]
        );
    }
}
