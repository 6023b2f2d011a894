//! Lazy, restartable point queries.

use crate::store::CellEvents;
use heatmap_common::{GeoEvent, PixelBBox, TimeWindow};
use projection::Mercator;
use std::sync::Arc;

/// A query result: the event plus its pixel position at the query zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocatedEvent {
    pub event: GeoEvent,
    pub x: i64,
    pub y: i64,
}

/// A prepared query over a store snapshot.
///
/// Holds the candidate cells' contents as loaded when the query was prepared
/// and the snapshot watermark, not the matching events; each call to
/// [`PointQuery::iter`] walks the cells again and yields the same sequence.
/// Nothing is locked while a query is alive.
pub struct PointQuery {
    cells: Vec<Arc<CellEvents>>,
    mercator: Mercator,
    bbox: PixelBBox,
    window: TimeWindow,
    watermark: u64,
}

impl PointQuery {
    pub(crate) fn new(
        cells: Vec<Arc<CellEvents>>,
        mercator: Mercator,
        bbox: PixelBBox,
        window: TimeWindow,
        watermark: u64,
    ) -> Self {
        Self {
            cells,
            mercator,
            bbox,
            window,
            watermark,
        }
    }

    /// Number of geocells the query will visit.
    pub fn cells_visited(&self) -> usize {
        self.cells.len()
    }

    pub fn bbox(&self) -> PixelBBox {
        self.bbox
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    pub fn iter(&self) -> PointIter<'_> {
        PointIter {
            query: self,
            next_cell: 0,
            buffer: Vec::new(),
            position: 0,
        }
    }

    /// Copy the matching events of one cell into `out`.
    fn collect_cell(&self, cell: &CellEvents, out: &mut Vec<LocatedEvent>) {
        for stored in cell.iter() {
            if stored.seq > self.watermark {
                break;
            }
            if !self.window.contains(stored.event.timestamp()) {
                continue;
            }
            let (x, y) = self
                .mercator
                .project_units(stored.event.lon(), stored.units);
            if self.bbox.contains(x, y) {
                out.push(LocatedEvent {
                    event: stored.event,
                    x,
                    y,
                });
            }
        }
    }
}

impl<'q> IntoIterator for &'q PointQuery {
    type Item = LocatedEvent;
    type IntoIter = PointIter<'q>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a [`PointQuery`], filling one cell at a time.
pub struct PointIter<'q> {
    query: &'q PointQuery,
    next_cell: usize,
    buffer: Vec<LocatedEvent>,
    position: usize,
}

impl Iterator for PointIter<'_> {
    type Item = LocatedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(event) = self.buffer.get(self.position) {
                self.position += 1;
                return Some(*event);
            }

            let cell = self.query.cells.get(self.next_cell)?;
            self.next_cell += 1;
            self.buffer.clear();
            self.position = 0;
            self.query.collect_cell(cell, &mut self.buffer);
        }
    }
}
