//! Heatmap tile engine service library.
//!
//! Binds named heatmaps to their point stores and tile builders, loads the
//! engine configuration, validates raw render parameters and ingests NDJSON
//! events. The `heatmap-engine` binary is a thin CLI over [`Engine`].

pub mod config;
pub mod engine;
pub mod ingest;
pub mod manager;
pub mod metrics;
pub mod registry;
pub mod request;

pub use config::{EngineConfig, HeatmapDefinition};
pub use engine::{Engine, EngineSummary, HeatmapSummary};
pub use ingest::{ingest_ndjson, parse_ndjson, IngestReport};
pub use manager::HeatMapManager;
pub use metrics::{MetricsCollector, MetricsSnapshot, TileOutcome};
pub use registry::HeatMapRegistry;
pub use request::{parse_timestamp, RawTileParams};
