//! Error types for the heatmap tile engine.

use thiserror::Error;

/// Result type alias using HeatmapError.
pub type HeatmapResult<T> = Result<T, HeatmapError>;

/// Primary error type for heatmap operations.
#[derive(Debug, Error)]
pub enum HeatmapError {
    // === Request Errors ===
    #[error("Invalid zoom level: {0} (expected 0..=30)")]
    InvalidZoom(i64),

    #[error("Tile ({x}, {y}) is outside the tile grid at zoom {z}")]
    InvalidTile { x: i64, y: i64, z: u8 },

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Heat map not found: {0}")]
    HeatmapNotFound(String),

    #[error("Palette not found: {0}")]
    PaletteNotFound(String),

    #[error("Invalid palette: {0}")]
    InvalidPalette(String),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    // === Data Errors ===
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    #[error("Failed to ingest line {line}: {message}")]
    IngestError { line: usize, message: String },

    #[error("Point store corrupted: {0}")]
    StoreCorrupted(String),

    // === Infrastructure Errors ===
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl HeatmapError {
    /// Shorthand for an `InvalidParameter` error.
    pub fn invalid_parameter(param: impl Into<String>, message: impl Into<String>) -> Self {
        HeatmapError::InvalidParameter {
            param: param.into(),
            message: message.into(),
        }
    }

    /// Whether the error was caused by the caller (a bad request at the boundary).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            HeatmapError::InvalidZoom(_)
                | HeatmapError::InvalidTile { .. }
                | HeatmapError::InvalidParameter { .. }
                | HeatmapError::HeatmapNotFound(_)
                | HeatmapError::PaletteNotFound(_)
                | HeatmapError::InvalidPalette(_)
                | HeatmapError::InvalidColor(_)
                | HeatmapError::InvalidEvent(_)
                | HeatmapError::IngestError { .. }
        )
    }

    /// Get the HTTP status code a boundary layer should answer with.
    pub fn http_status_code(&self) -> u16 {
        if self.is_client_error() {
            400
        } else {
            500
        }
    }
}

// Conversion from common error types
impl From<std::io::Error> for HeatmapError {
    fn from(err: std::io::Error) -> Self {
        HeatmapError::InternalError(err.to_string())
    }
}

impl From<serde_json::Error> for HeatmapError {
    fn from(err: serde_json::Error) -> Self {
        HeatmapError::ConfigError(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_map_to_400() {
        assert_eq!(HeatmapError::InvalidZoom(31).http_status_code(), 400);
        assert_eq!(
            HeatmapError::HeatmapNotFound("nope".into()).http_status_code(),
            400
        );
        assert_eq!(
            HeatmapError::invalid_parameter("bc", "must be >= 1").http_status_code(),
            400
        );
    }

    #[test]
    fn test_server_errors_map_to_500() {
        let err = HeatmapError::StoreCorrupted("cell out of order".into());
        assert!(!err.is_client_error());
        assert_eq!(err.http_status_code(), 500);
    }
}
