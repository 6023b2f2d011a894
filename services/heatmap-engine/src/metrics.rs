//! Engine metrics.
//!
//! Every recording goes to the `metrics` facade (exported by whatever
//! recorder the binary installs) and to in-process counters that back
//! [`MetricsCollector::snapshot`].

use metrics::{counter, histogram};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Render outcome label for `heatmap_tiles_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileOutcome {
    Raster,
    NoData,
    Error,
}

impl TileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TileOutcome::Raster => "raster",
            TileOutcome::NoData => "no_data",
            TileOutcome::Error => "error",
        }
    }
}

#[derive(Debug, Default)]
struct TimingStats {
    count: u64,
    total_us: u64,
    min_us: u64,
    max_us: u64,
    last_us: u64,
}

impl TimingStats {
    fn record(&mut self, duration_us: u64) {
        self.count += 1;
        self.total_us += duration_us;
        self.last_us = duration_us;
        if self.min_us == 0 || duration_us < self.min_us {
            self.min_us = duration_us;
        }
        if duration_us > self.max_us {
            self.max_us = duration_us;
        }
    }

    fn avg_ms(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            (self.total_us as f64 / self.count as f64) / 1000.0
        }
    }
}

#[derive(Debug)]
pub struct MetricsCollector {
    pub tiles_raster: AtomicU64,
    pub tiles_no_data: AtomicU64,
    pub tile_errors: AtomicU64,
    pub events_ingested: AtomicU64,
    render_times: Mutex<TimingStats>,
    start_time: Instant,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub tiles_raster: u64,
    pub tiles_no_data: u64,
    pub tile_errors: u64,
    pub events_ingested: u64,
    pub render_count: u64,
    pub render_avg_ms: f64,
    pub render_min_ms: f64,
    pub render_max_ms: f64,
    pub render_last_ms: f64,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            tiles_raster: AtomicU64::new(0),
            tiles_no_data: AtomicU64::new(0),
            tile_errors: AtomicU64::new(0),
            events_ingested: AtomicU64::new(0),
            render_times: Mutex::new(TimingStats::default()),
            start_time: Instant::now(),
        }
    }

    /// Record one tile request. Failed requests are counted but not timed.
    pub fn record_tile(&self, heatmap: &str, outcome: TileOutcome, duration_us: u64) {
        counter!("heatmap_tiles_total", "outcome" => outcome.as_str()).increment(1);

        let slot = match outcome {
            TileOutcome::Raster => &self.tiles_raster,
            TileOutcome::NoData => &self.tiles_no_data,
            TileOutcome::Error => &self.tile_errors,
        };
        slot.fetch_add(1, Ordering::Relaxed);

        if outcome != TileOutcome::Error {
            histogram!("heatmap_tile_render_seconds", "heatmap" => heatmap.to_string())
                .record(duration_us as f64 / 1_000_000.0);
            self.render_times.lock().record(duration_us);
        }
    }

    pub fn record_ingest(&self, heatmap: &str, events: usize) {
        counter!("heatmap_events_ingested_total", "heatmap" => heatmap.to_string())
            .increment(events as u64);
        self.events_ingested.fetch_add(events as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let times = self.render_times.lock();
        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            tiles_raster: self.tiles_raster.load(Ordering::Relaxed),
            tiles_no_data: self.tiles_no_data.load(Ordering::Relaxed),
            tile_errors: self.tile_errors.load(Ordering::Relaxed),
            events_ingested: self.events_ingested.load(Ordering::Relaxed),
            render_count: times.count,
            render_avg_ms: times.avg_ms(),
            render_min_ms: times.min_us as f64 / 1000.0,
            render_max_ms: times.max_us as f64 / 1000.0,
            render_last_ms: times.last_us as f64 / 1000.0,
        }
    }
}

/// Simple timer for measuring durations
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_by_outcome() {
        let metrics = MetricsCollector::new();
        metrics.record_tile("a", TileOutcome::Raster, 2_000);
        metrics.record_tile("a", TileOutcome::Raster, 4_000);
        metrics.record_tile("a", TileOutcome::NoData, 1_000);
        metrics.record_tile("a", TileOutcome::Error, 0);
        metrics.record_ingest("a", 42);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.tiles_raster, 2);
        assert_eq!(snapshot.tiles_no_data, 1);
        assert_eq!(snapshot.tile_errors, 1);
        assert_eq!(snapshot.events_ingested, 42);
        assert_eq!(snapshot.render_count, 3);
        assert!((snapshot.render_avg_ms - 7.0 / 3.0).abs() < 1e-9);
        assert_eq!(snapshot.render_min_ms, 1.0);
        assert_eq!(snapshot.render_max_ms, 4.0);
        assert_eq!(snapshot.render_last_ms, 1.0);
    }
}
