//! One heatmap: its point store and the tile builder bound to it.

use heatmap_common::{GeoEvent, HeatmapResult};
use point_store::PointStore;
use renderer::{RadiatorRegistry, TileBuilder};
use std::sync::Arc;

#[derive(Debug)]
pub struct HeatMapManager {
    name: String,
    description: Option<String>,
    store: Arc<PointStore>,
    builder: TileBuilder,
}

impl HeatMapManager {
    /// Create a manager with an empty store indexed at `index_zoom`.
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        index_zoom: u8,
        radiators: Arc<RadiatorRegistry>,
    ) -> HeatmapResult<Self> {
        let name = name.into();
        let store = Arc::new(PointStore::with_index_zoom(name.as_str(), index_zoom)?);
        let builder = TileBuilder::new(Arc::clone(&store), radiators);
        Ok(Self {
            name,
            description,
            store,
            builder,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn store(&self) -> &Arc<PointStore> {
        &self.store
    }

    pub fn tile_builder(&self) -> &TileBuilder {
        &self.builder
    }

    /// Append one event; returns its sequence number.
    pub fn ingest(&self, event: GeoEvent) -> u64 {
        self.store.append(event)
    }

    /// Append events as one batch; returns how many were appended.
    pub fn ingest_batch(&self, events: Vec<GeoEvent>) -> usize {
        self.store.append_batch(events)
    }
}
