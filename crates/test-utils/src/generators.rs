//! Synthetic event generators.
//!
//! Layouts are pseudo-random but seeded, so a test sees the same events on
//! every run.

use heatmap_common::GeoEvent;

/// Event with weight 1.
///
/// # Panics
///
/// Panics if the coordinates are out of range; meant for literal test input.
pub fn event_at(lat: f64, lon: f64, timestamp: i64) -> GeoEvent {
    weighted_event(lat, lon, timestamp, 1.0)
}

/// Event with an explicit weight.
pub fn weighted_event(lat: f64, lon: f64, timestamp: i64, weight: f64) -> GeoEvent {
    GeoEvent::new(lat, lon, timestamp, weight).expect("test event must be valid")
}

/// Small linear congruential generator (Knuth's MMIX constants).
///
/// Good enough for spreading test points; not for anything else.
#[derive(Debug, Clone)]
struct TestRng {
    state: u64,
}

impl TestRng {
    fn new(seed: u64) -> Self {
        Self {
            state: seed ^ 0x9E37_79B9_7F4A_7C15,
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    /// Uniform value in `[0, 1)`.
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform value in `[low, high)`.
    fn range(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }
}

/// `count` events scattered around `(lat, lon)` within `spread` degrees,
/// with timestamps spread over the `span_ms` before `now`.
///
/// Coordinates are clamped to the valid range.
pub fn cluster_events(
    seed: u64,
    count: usize,
    (lat, lon): (f64, f64),
    spread: f64,
    now: i64,
    span_ms: i64,
) -> Vec<GeoEvent> {
    let mut rng = TestRng::new(seed);
    (0..count)
        .map(|_| {
            let lat = (lat + rng.range(-spread, spread)).clamp(-85.0, 85.0);
            let lon = (lon + rng.range(-spread, spread)).clamp(-180.0, 180.0);
            let age = if span_ms > 0 {
                (rng.next_u64() % span_ms as u64) as i64
            } else {
                0
            };
            event_at(lat, lon, now - age)
        })
        .collect()
}

/// Render events as newline-delimited JSON in the ingestion format.
pub fn to_ndjson(events: &[GeoEvent]) -> String {
    events
        .iter()
        .map(|e| {
            format!(
                "{{\"lat\":{},\"lon\":{},\"ts\":{},\"weight\":{}}}\n",
                e.lat(),
                e.lon(),
                e.timestamp(),
                e.weight()
            )
        })
        .collect()
}
