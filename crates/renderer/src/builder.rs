//! Tile building: query, accumulate, normalize, colorize.

use crate::buffer_pool::{take_pixel_buffer, with_accumulation_buffer};
use crate::palette::Palette;
use crate::radiator::{Radiator, RadiatorRegistry};
use crate::raster::{RenderedTile, TileRaster};
use crate::request::TileRequest;
use heatmap_common::{format_millis, HeatmapResult, TILE_SIZE};
use point_store::PointStore;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

const SIZE: usize = TILE_SIZE as usize;

/// Renders tiles from one point store.
///
/// Holds no mutable state, so one builder serves any number of concurrent
/// requests.
#[derive(Debug, Clone)]
pub struct TileBuilder {
    store: Arc<PointStore>,
    radiators: Arc<RadiatorRegistry>,
}

impl TileBuilder {
    pub fn new(store: Arc<PointStore>, radiators: Arc<RadiatorRegistry>) -> Self {
        Self { store, radiators }
    }

    pub fn store(&self) -> &Arc<PointStore> {
        &self.store
    }

    pub fn radiators(&self) -> &Arc<RadiatorRegistry> {
        &self.radiators
    }

    /// Render one tile.
    ///
    /// All buckets are queried against one store snapshot and summed into a
    /// single buffer, normalized by its maximum. Returns
    /// [`RenderedTile::NoData`] when nothing contributes.
    pub fn get_tile(&self, request: &TileRequest) -> HeatmapResult<RenderedTile> {
        let started = Instant::now();
        let tile = request.tile();
        let radiator = self.radiators.get(request.radiator());
        let radius = radiator.support_radius(request.scale());

        let tile_bbox = tile.pixel_bbox();
        let query_bbox = tile_bbox.expand(radius);
        let windows = request.windows(radiator.temporal_horizon_ms());
        let snapshot = self.store.snapshot();

        let rendered: HeatmapResult<(RenderedTile, usize)> =
            with_accumulation_buffer(SIZE, SIZE, |intensity| {
                let mut events = 0usize;

                for window in &windows {
                    let query = snapshot.query(query_bbox, tile.z, *window)?;
                    for located in &query {
                        let weight = located.event.weight();
                        if weight <= 0.0 {
                            continue;
                        }
                        events += 1;
                        splat(
                            intensity,
                            radiator.as_ref(),
                            located.x - tile_bbox.min_x,
                            located.y - tile_bbox.min_y,
                            request.timestamp().saturating_sub(located.event.timestamp()),
                            weight,
                            request,
                            radius,
                        );
                    }
                }

                // Overflowing sums leave an infinite peak, which still renders
                let peak = intensity.iter().copied().fold(0.0f64, f64::max);
                if peak <= 0.0 || peak.is_nan() {
                    return Ok((RenderedTile::NoData, events));
                }

                let pixels = colorize(intensity, peak, request.palette(), request.opacity());
                Ok((RenderedTile::Raster(TileRaster::new(pixels, peak, events)), events))
            });

        let (rendered, events) = rendered?;
        debug!(
            tile = %tile.cache_key(),
            store = %self.store.name(),
            at = %format_millis(request.timestamp()),
            buckets = windows.len(),
            radiator = radiator.name(),
            radius,
            events,
            outcome = rendered.outcome(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "Rendered tile"
        );
        Ok(rendered)
    }
}

/// Add one event's kernel footprint to the buffer.
///
/// `(ex, ey)` is the event's pixel relative to the tile origin and may lie
/// outside the tile; only in-tile pixels are touched.
#[allow(clippy::too_many_arguments)]
fn splat(
    intensity: &mut [f64],
    radiator: &dyn Radiator,
    ex: i64,
    ey: i64,
    age_ms: i64,
    weight: f64,
    request: &TileRequest,
    radius: i64,
) {
    let last = SIZE as i64 - 1;
    let (x0, x1) = ((ex - radius).max(0), (ex + radius).min(last));
    let (y0, y1) = ((ey - radius).max(0), (ey + radius).min(last));

    for py in y0..=y1 {
        let row = py as usize * SIZE;
        for px in x0..=x1 {
            let w = radiator.contribute(
                px - ex,
                py - ey,
                age_ms,
                request.time_decay(),
                request.scale(),
            );
            if w > 0.0 {
                intensity[row + px as usize] += w * weight;
            }
        }
    }
}

/// Intensity relative to the tile peak. Infinite pixels saturate.
fn normalize(value: f64, peak: f64) -> f64 {
    if value.is_infinite() {
        1.0
    } else {
        value / peak
    }
}

/// Map normalized intensities through the palette, one row per task.
fn colorize(intensity: &[f64], peak: f64, palette: &Palette, opacity: f64) -> Vec<u8> {
    take_pixel_buffer(SIZE, SIZE, |pixels| {
        pixels
            .par_chunks_mut(SIZE * 4)
            .zip(intensity.par_chunks(SIZE))
            .for_each(|(out, row)| {
                for (px, &value) in out.chunks_exact_mut(4).zip(row) {
                    let color = palette.map(normalize(value, peak), opacity);
                    px.copy_from_slice(&[color.r, color.g, color.b, color.a]);
                }
            });
    })
}
