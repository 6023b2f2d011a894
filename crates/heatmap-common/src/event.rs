//! Weighted, timestamped geo-events.

use crate::{HeatmapError, HeatmapResult};
use serde::Serialize;

/// A single geolocated event.
///
/// Events are immutable: fields are private and only readable through
/// accessors, and construction validates coordinates and weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoEvent {
    lat: f64,
    lon: f64,
    /// Epoch milliseconds
    timestamp: i64,
    weight: f64,
}

impl GeoEvent {
    /// Create an event, rejecting out-of-range coordinates and negative or
    /// non-finite weights.
    pub fn new(lat: f64, lon: f64, timestamp: i64, weight: f64) -> HeatmapResult<Self> {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(HeatmapError::InvalidEvent(format!(
                "latitude {} outside [-90, 90]",
                lat
            )));
        }
        if !lon.is_finite() || !(-180.0..=180.0).contains(&lon) {
            return Err(HeatmapError::InvalidEvent(format!(
                "longitude {} outside [-180, 180]",
                lon
            )));
        }
        if !weight.is_finite() || weight < 0.0 {
            return Err(HeatmapError::InvalidEvent(format!(
                "weight {} must be finite and non-negative",
                weight
            )));
        }
        Ok(Self {
            lat,
            lon,
            timestamp,
            weight,
        })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_event() {
        let event = GeoEvent::new(48.85, 2.35, 1_700_000_000_000, 2.5).unwrap();
        assert_eq!(event.lat(), 48.85);
        assert_eq!(event.lon(), 2.35);
        assert_eq!(event.timestamp(), 1_700_000_000_000);
        assert_eq!(event.weight(), 2.5);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(GeoEvent::new(91.0, 0.0, 0, 1.0).is_err());
        assert!(GeoEvent::new(0.0, -180.5, 0, 1.0).is_err());
        assert!(GeoEvent::new(0.0, 0.0, 0, -1.0).is_err());
        assert!(GeoEvent::new(f64::NAN, 0.0, 0, 1.0).is_err());
        assert!(GeoEvent::new(0.0, 0.0, 0, f64::INFINITY).is_err());
        assert!(GeoEvent::new(0.0, 0.0, 0, 0.0).is_ok());
    }
}
