//! NDJSON event ingestion.
//!
//! One event per line: `{"lat":48.85,"lon":2.35,"ts":1700000000000,"weight":2}`.
//! Blank lines and lines starting with `#` are skipped. The whole input is
//! parsed before anything is appended, so a malformed line leaves the store
//! untouched.

use crate::manager::HeatMapManager;
use heatmap_common::{GeoEvent, HeatmapError, HeatmapResult};
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use tracing::info;

#[derive(Debug, Clone, Copy, Deserialize)]
struct EventRecord {
    lat: f64,
    lon: f64,
    #[serde(alias = "timestamp")]
    ts: i64,
    #[serde(default = "default_weight")]
    weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

/// Outcome of one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub lines: usize,
    pub events: usize,
    pub skipped: usize,
}

/// Parse NDJSON into events. Errors carry the 1-based line number.
pub fn parse_ndjson(reader: impl BufRead) -> HeatmapResult<(Vec<GeoEvent>, IngestReport)> {
    let mut events = Vec::new();
    let mut report = IngestReport::default();

    for (index, line) in reader.lines().enumerate() {
        let number = index + 1;
        let line = line.map_err(|e| HeatmapError::IngestError {
            line: number,
            message: e.to_string(),
        })?;
        report.lines += 1;

        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            report.skipped += 1;
            continue;
        }

        let record: EventRecord =
            serde_json::from_str(trimmed).map_err(|e| HeatmapError::IngestError {
                line: number,
                message: e.to_string(),
            })?;
        let event = GeoEvent::new(record.lat, record.lon, record.ts, record.weight).map_err(
            |e| HeatmapError::IngestError {
                line: number,
                message: e.to_string(),
            },
        )?;
        events.push(event);
    }

    report.events = events.len();
    Ok((events, report))
}

/// Parse NDJSON and append it to one heatmap as a single batch.
pub fn ingest_ndjson(
    manager: &HeatMapManager,
    reader: impl BufRead,
) -> HeatmapResult<IngestReport> {
    let (events, report) = parse_ndjson(reader)?;
    manager.ingest_batch(events);

    info!(
        heatmap = manager.name(),
        lines = report.lines,
        events = report.events,
        skipped = report.skipped,
        "Ingested events"
    );
    Ok(report)
}
