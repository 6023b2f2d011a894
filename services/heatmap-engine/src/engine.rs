//! Engine facade: the heatmap directory plus the shared style registries.

use crate::config::EngineConfig;
use crate::ingest::{self, IngestReport};
use crate::manager::HeatMapManager;
use crate::metrics::{MetricsCollector, TileOutcome, Timer};
use crate::registry::HeatMapRegistry;
use crate::request::RawTileParams;
use heatmap_common::{format_millis, now_millis, GeoEvent, HeatmapError, HeatmapResult};
use renderer::{PaletteRegistry, RadiatorRegistry, RenderedTile};
use serde::Serialize;
use std::io::BufRead;
use std::sync::Arc;
use tracing::{debug, info};

pub struct Engine {
    config: EngineConfig,
    heatmaps: HeatMapRegistry,
    radiators: Arc<RadiatorRegistry>,
    palettes: Arc<PaletteRegistry>,
    metrics: Arc<MetricsCollector>,
}

/// Summary of one heatmap for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct HeatmapSummary {
    pub name: String,
    pub description: Option<String>,
    pub index_zoom: u8,
    pub events: usize,
    pub cells: usize,
    pub oldest: Option<String>,
    pub newest: Option<String>,
}

/// What the engine currently serves.
#[derive(Debug, Clone, Serialize)]
pub struct EngineSummary {
    pub heatmaps: Vec<HeatmapSummary>,
    pub radiators: Vec<String>,
    pub palettes: Vec<String>,
    pub max_bucket_count: u32,
}

impl Engine {
    /// Build the registries: built-in radiators and palettes, then the
    /// configured styles, then one manager per configured heatmap.
    pub fn from_config(config: EngineConfig) -> HeatmapResult<Self> {
        config.validate()?;

        let mut radiators = RadiatorRegistry::with_builtins();
        let mut palettes = PaletteRegistry::with_builtins();
        let applied = config.style()?.apply_to(&mut radiators, &mut palettes);

        let radiators = Arc::new(radiators);
        let heatmaps = HeatMapRegistry::from_config(&config, &radiators)?;

        info!(
            heatmaps = heatmaps.len(),
            radiators = radiators.len(),
            palettes = palettes.len(),
            custom_styles = applied,
            "Engine ready"
        );

        Ok(Self {
            config,
            heatmaps,
            radiators,
            palettes: Arc::new(palettes),
            metrics: Arc::new(MetricsCollector::new()),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn heatmaps(&self) -> &HeatMapRegistry {
        &self.heatmaps
    }

    pub fn radiators(&self) -> &Arc<RadiatorRegistry> {
        &self.radiators
    }

    pub fn palettes(&self) -> &Arc<PaletteRegistry> {
        &self.palettes
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    fn manager(&self, name: &str) -> HeatmapResult<Arc<HeatMapManager>> {
        self.heatmaps
            .get_heat_map(name)
            .ok_or_else(|| HeatmapError::HeatmapNotFound(name.to_string()))
    }

    /// Render one tile of a named heatmap against the wall clock.
    pub fn get_tile(&self, name: &str, params: &RawTileParams) -> HeatmapResult<RenderedTile> {
        self.get_tile_at(name, params, now_millis())
    }

    /// Render one tile; `now` replaces a zero timestamp.
    pub fn get_tile_at(
        &self,
        name: &str,
        params: &RawTileParams,
        now: i64,
    ) -> HeatmapResult<RenderedTile> {
        let timer = Timer::start();
        let result = self.render(name, params, now);

        let outcome = match &result {
            Ok(RenderedTile::Raster(_)) => TileOutcome::Raster,
            Ok(RenderedTile::NoData) => TileOutcome::NoData,
            Err(e) => {
                debug!(heatmap = name, error = %e, "Tile request failed");
                TileOutcome::Error
            }
        };
        self.metrics.record_tile(name, outcome, timer.elapsed_us());
        result
    }

    fn render(&self, name: &str, params: &RawTileParams, now: i64) -> HeatmapResult<RenderedTile> {
        let manager = self.manager(name)?;
        let request = params.validate(&self.palettes, self.config.max_bucket_count, now)?;
        manager.tile_builder().get_tile(&request)
    }

    /// Append one event; returns its sequence number in the heatmap's store.
    pub fn ingest(&self, name: &str, event: GeoEvent) -> HeatmapResult<u64> {
        let seq = self.manager(name)?.ingest(event);
        self.metrics.record_ingest(name, 1);
        Ok(seq)
    }

    /// Append NDJSON events to a heatmap as one batch.
    pub fn ingest_ndjson(&self, name: &str, reader: impl BufRead) -> HeatmapResult<IngestReport> {
        let manager = self.manager(name)?;
        let report = ingest::ingest_ndjson(&manager, reader)?;
        self.metrics.record_ingest(name, report.events);
        Ok(report)
    }

    /// Create an empty heatmap at runtime, replacing any with the same name.
    pub fn add_heat_map(
        &self,
        name: &str,
        description: Option<String>,
        index_zoom: Option<u8>,
    ) -> HeatmapResult<Arc<HeatMapManager>> {
        if name.trim().is_empty() {
            return Err(HeatmapError::invalid_parameter("name", "heatmap name is empty"));
        }
        let manager = HeatMapManager::new(
            name,
            description,
            index_zoom.unwrap_or(self.config.index_zoom),
            Arc::clone(&self.radiators),
        )?;
        let (published, previous) = self.heatmaps.insert(manager);
        if previous.is_some() {
            info!(heatmap = name, "Replaced heatmap");
        } else {
            info!(heatmap = name, "Added heatmap");
        }
        Ok(published)
    }

    pub fn remove_heat_map(&self, name: &str) -> Option<Arc<HeatMapManager>> {
        let removed = self.heatmaps.remove(name);
        if removed.is_some() {
            info!(heatmap = name, "Removed heatmap");
        }
        removed
    }

    pub fn summary(&self) -> EngineSummary {
        let snapshot = self.heatmaps.snapshot();
        let mut heatmaps: Vec<HeatmapSummary> = snapshot
            .values()
            .map(|manager| {
                let stats = manager.store().stats();
                HeatmapSummary {
                    name: manager.name().to_string(),
                    description: manager.description().map(str::to_string),
                    index_zoom: manager.store().index_zoom(),
                    events: stats.events,
                    cells: stats.cells,
                    oldest: stats.min_timestamp.map(format_millis),
                    newest: stats.max_timestamp.map(format_millis),
                }
            })
            .collect();
        heatmaps.sort_by(|a, b| a.name.cmp(&b.name));

        EngineSummary {
            heatmaps,
            radiators: self.radiators.names(),
            palettes: self.palettes.names(),
            max_bucket_count: self.config.max_bucket_count,
        }
    }
}
