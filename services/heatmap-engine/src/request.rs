//! Raw render parameters as they arrive from a caller.
//!
//! Field names follow the tile URL query string; the short aliases
//! (`t`, `bs`, `bc`, ...) are accepted too.

use chrono::DateTime;
use heatmap_common::{HeatmapError, HeatmapResult};
use renderer::{PaletteRegistry, TileRequest};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RawTileParams {
    pub x: i64,
    pub y: i64,
    pub z: i64,
    /// Epoch ms; 0 means now
    #[serde(alias = "t")]
    pub timestamp: i64,
    #[serde(alias = "bs", alias = "bucketspan")]
    pub bucket_span: i64,
    #[serde(alias = "bc", alias = "bucketcount")]
    pub bucket_count: i64,
    #[serde(alias = "td", alias = "timedecay")]
    pub time_decay: Option<f64>,
    #[serde(alias = "s")]
    pub scale: Option<f64>,
    #[serde(alias = "r")]
    pub radiator: Option<String>,
    /// Palette name or `#RRGGBB` seed
    #[serde(alias = "p")]
    pub palette: Option<String>,
    #[serde(alias = "o")]
    pub opacity: Option<f64>,
}

impl Default for RawTileParams {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            z: 0,
            timestamp: 0,
            bucket_span: 0,
            bucket_count: 1,
            time_decay: None,
            scale: None,
            radiator: None,
            palette: None,
            opacity: None,
        }
    }
}

impl RawTileParams {
    pub fn tile(z: i64, x: i64, y: i64) -> Self {
        Self {
            x,
            y,
            z,
            ..Self::default()
        }
    }

    /// Resolve the palette and build a validated request.
    pub fn validate(
        &self,
        palettes: &PaletteRegistry,
        max_bucket_count: u32,
        now: i64,
    ) -> HeatmapResult<TileRequest> {
        let palette = palettes.resolve(self.palette.as_deref())?;

        let mut builder = TileRequest::builder(self.z, self.x, self.y)
            .timestamp(self.timestamp)
            .bucket_span(self.bucket_span)
            .bucket_count(self.bucket_count)
            .palette(palette)
            .max_bucket_count(max_bucket_count)
            .now(now);

        if let Some(decay) = self.time_decay {
            builder = builder.time_decay(decay);
        }
        if let Some(scale) = self.scale {
            builder = builder.scale(scale);
        }
        if let Some(opacity) = self.opacity {
            builder = builder.opacity(opacity);
        }
        if let Some(radiator) = &self.radiator {
            builder = builder.radiator(radiator.as_str());
        }

        builder.build()
    }
}

/// Parse a timestamp given as epoch milliseconds or RFC 3339.
pub fn parse_timestamp(value: &str) -> HeatmapResult<i64> {
    let value = value.trim();
    if let Ok(millis) = value.parse::<i64>() {
        return Ok(millis);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| HeatmapError::invalid_parameter("timestamp", format!("{}: {}", value, e)))
}
