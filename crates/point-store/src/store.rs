//! Append-only, snapshot-isolated event store.
//!
//! ## Design
//!
//! - **Geocell directory**: events live in per-cell logs keyed by
//!   [`CellKey`]. The directory is an immutable map behind an [`ArcSwap`];
//!   creating a cell publishes a new map, and readers load the current one
//!   without locking.
//! - **Chunked cell logs**: a cell's events are kept in fixed-size chunks.
//!   Appending copies at most the open tail chunk and the chunk pointers,
//!   then swaps the log in. Readers hold an `Arc` to the log they loaded and
//!   never wait on a writer; writers never wait on a reader.
//! - **Sequence watermark**: every event gets a sequence number when it is
//!   appended. Appends are serialized among themselves and publish by bumping
//!   `committed` once the event (or whole batch) is in its cell. A snapshot is
//!   just the value of `committed` at the time it was taken; events with a
//!   higher sequence number are skipped, so later appends stay invisible.
//!
//! Events are never mutated, removed, or reordered once stored.

use crate::geocell::{CellKey, CellRange, DEFAULT_INDEX_ZOOM};
use crate::query::PointQuery;
use arc_swap::ArcSwap;
use heatmap_common::{GeoEvent, HeatmapError, HeatmapResult, PixelBBox, TimeWindow, MAX_ZOOM};
use parking_lot::Mutex;
use projection::{mercator_units, Mercator};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Events per sealed chunk of a cell log.
pub(crate) const CHUNK_SIZE: usize = 256;

type Directory = HashMap<CellKey, Arc<Cell>>;

/// An event as kept in a cell.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StoredEvent {
    pub(crate) seq: u64,
    pub(crate) event: GeoEvent,
    /// Mercator ordinate of the latitude, so queries skip the trigonometry.
    pub(crate) units: f64,
}

/// Immutable contents of a cell at one point in time.
///
/// Every chunk but the last holds exactly [`CHUNK_SIZE`] events. Events are
/// sorted by `seq` across chunks.
#[derive(Debug, Default)]
pub(crate) struct CellEvents {
    chunks: Vec<Arc<Vec<StoredEvent>>>,
}

impl CellEvents {
    pub(crate) fn iter(&self) -> impl Iterator<Item = &StoredEvent> {
        self.chunks.iter().flat_map(|chunk| chunk.iter())
    }

    /// A new log holding these events followed by `added`. Sealed chunks are
    /// shared with `self`.
    fn extended(&self, added: &[StoredEvent]) -> Self {
        let mut chunks = self.chunks.clone();
        let mut rest = added;

        if let Some(tail) = chunks.last_mut() {
            if tail.len() < CHUNK_SIZE {
                let take = (CHUNK_SIZE - tail.len()).min(rest.len());
                let mut grown = Vec::with_capacity(CHUNK_SIZE);
                grown.extend_from_slice(tail.as_slice());
                grown.extend_from_slice(&rest[..take]);
                *tail = Arc::new(grown);
                rest = &rest[take..];
            }
        }
        for piece in rest.chunks(CHUNK_SIZE) {
            let mut chunk = Vec::with_capacity(CHUNK_SIZE);
            chunk.extend_from_slice(piece);
            chunks.push(Arc::new(chunk));
        }

        Self { chunks }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Cell {
    events: ArcSwap<CellEvents>,
}

impl Cell {
    /// Current contents. Later appends do not affect the returned log.
    pub(crate) fn load(&self) -> Arc<CellEvents> {
        self.events.load_full()
    }

    /// Callers hold the store's append lock.
    fn append(&self, added: &[StoredEvent]) {
        let next = self.events.load().extended(added);
        self.events.store(Arc::new(next));
    }
}

/// Summary counters for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub events: usize,
    pub cells: usize,
    pub min_timestamp: Option<i64>,
    pub max_timestamp: Option<i64>,
}

/// Per-heatmap container of weighted, timestamped geo-events.
pub struct PointStore {
    name: String,
    index_zoom: u8,
    index: Mercator,
    cells: ArcSwap<Directory>,
    append_lock: Mutex<()>,
    committed: AtomicU64,
    min_timestamp: AtomicI64,
    max_timestamp: AtomicI64,
}

impl PointStore {
    /// Create an empty store indexed at [`DEFAULT_INDEX_ZOOM`].
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(name.into(), DEFAULT_INDEX_ZOOM)
    }

    /// Create an empty store with an explicit index zoom.
    pub fn with_index_zoom(name: impl Into<String>, index_zoom: u8) -> HeatmapResult<Self> {
        if index_zoom > MAX_ZOOM {
            return Err(HeatmapError::InvalidZoom(index_zoom as i64));
        }
        Ok(Self::build(name.into(), index_zoom))
    }

    fn build(name: String, index_zoom: u8) -> Self {
        debug!(store = %name, index_zoom, "Creating point store");
        Self {
            name,
            index_zoom,
            index: Mercator::clamped(index_zoom),
            cells: ArcSwap::from_pointee(Directory::new()),
            append_lock: Mutex::new(()),
            committed: AtomicU64::new(0),
            min_timestamp: AtomicI64::new(i64::MAX),
            max_timestamp: AtomicI64::new(i64::MIN),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index_zoom(&self) -> u8 {
        self.index_zoom
    }

    /// Number of published events.
    pub fn len(&self) -> usize {
        self.committed.load(Ordering::Acquire) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of occupied geocells.
    pub fn cell_count(&self) -> usize {
        self.cells.load().len()
    }

    /// Oldest and newest timestamps stored, if any.
    pub fn time_span(&self) -> Option<(i64, i64)> {
        if self.is_empty() {
            return None;
        }
        Some((
            self.min_timestamp.load(Ordering::Relaxed),
            self.max_timestamp.load(Ordering::Relaxed),
        ))
    }

    pub fn stats(&self) -> StoreStats {
        let span = self.time_span();
        StoreStats {
            events: self.len(),
            cells: self.cell_count(),
            min_timestamp: span.map(|(min, _)| min),
            max_timestamp: span.map(|(_, max)| max),
        }
    }

    /// Append one event. Visible to every query started after this returns.
    ///
    /// Returns the event's sequence number.
    pub fn append(&self, event: GeoEvent) -> u64 {
        let _guard = self.append_lock.lock();
        let seq = self.committed.load(Ordering::Relaxed) + 1;
        let (key, stored) = self.locate(seq, event);
        for cell in self.cells_for(&[key]) {
            cell.append(&[stored]);
        }
        self.committed.store(seq, Ordering::Release);
        seq
    }

    /// Append a batch of events, published together: a query sees either
    /// all of them or none.
    ///
    /// Returns the number of events appended.
    pub fn append_batch<I>(&self, events: I) -> usize
    where
        I: IntoIterator<Item = GeoEvent>,
    {
        let _guard = self.append_lock.lock();
        let base = self.committed.load(Ordering::Relaxed);
        let mut seq = base;

        // Grouped by cell, each group in sequence order
        let mut groups: HashMap<CellKey, Vec<StoredEvent>> = HashMap::new();
        for event in events {
            seq += 1;
            let (key, stored) = self.locate(seq, event);
            groups.entry(key).or_default().push(stored);
        }

        let groups: Vec<(CellKey, Vec<StoredEvent>)> = groups.into_iter().collect();
        let keys: Vec<CellKey> = groups.iter().map(|(key, _)| *key).collect();
        for ((_, group), cell) in groups.iter().zip(self.cells_for(&keys)) {
            cell.append(group);
        }
        self.committed.store(seq, Ordering::Release);

        let appended = (seq - base) as usize;
        trace!(store = %self.name, appended, cells = keys.len(), "Appended event batch");
        appended
    }

    /// Project an event into its cell and record its timestamp bounds.
    fn locate(&self, seq: u64, event: GeoEvent) -> (CellKey, StoredEvent) {
        let units = mercator_units(event.lat());
        let (x, y) = self.index.project_units(event.lon(), units);
        let key = CellKey::from_pixel(x, y, self.index_zoom);

        self.min_timestamp
            .fetch_min(event.timestamp(), Ordering::Relaxed);
        self.max_timestamp
            .fetch_max(event.timestamp(), Ordering::Relaxed);

        (key, StoredEvent { seq, event, units })
    }

    /// Cells for `keys`, in the same order. Missing cells are created and
    /// published in one directory swap. Callers hold the append lock.
    fn cells_for(&self, keys: &[CellKey]) -> Vec<Arc<Cell>> {
        let current = self.cells.load_full();
        if keys.iter().all(|key| current.contains_key(key)) {
            return keys.iter().filter_map(|key| current.get(key).cloned()).collect();
        }

        let mut next = Directory::clone(&current);
        let cells = keys
            .iter()
            .map(|key| {
                Arc::clone(next.entry(*key).or_insert_with(|| {
                    trace!(store = %self.name, cx = key.cx, cy = key.cy, "New geocell");
                    Arc::new(Cell::default())
                }))
            })
            .collect();
        self.cells.store(Arc::new(next));
        cells
    }

    /// Capture the current watermark. Queries issued through the snapshot
    /// never see events appended afterwards.
    pub fn snapshot(&self) -> StoreSnapshot<'_> {
        StoreSnapshot {
            store: self,
            watermark: self.committed.load(Ordering::Acquire),
        }
    }

    /// Query against a fresh snapshot. See [`StoreSnapshot::query`].
    pub fn query(
        &self,
        bbox: PixelBBox,
        zoom: u8,
        window: TimeWindow,
    ) -> HeatmapResult<PointQuery> {
        self.snapshot().query(bbox, zoom, window)
    }

    /// Walk every cell and check the structural invariants: sequence numbers
    /// strictly increase within a cell and the published events add up to the
    /// watermark.
    ///
    /// Returns the number of events checked.
    pub fn verify(&self) -> HeatmapResult<usize> {
        let watermark = self.committed.load(Ordering::Acquire);
        let cells = self.cells.load();
        let mut total = 0u64;

        for (key, cell) in cells.iter() {
            let events = cell.load();
            let mut last = 0u64;
            for stored in events.iter().take_while(|s| s.seq <= watermark) {
                if stored.seq <= last {
                    return Err(HeatmapError::StoreCorrupted(format!(
                        "cell ({}, {}) holds seq {} after {}",
                        key.cx, key.cy, stored.seq, last
                    )));
                }
                last = stored.seq;
                total += 1;
            }
        }

        if total != watermark {
            return Err(HeatmapError::StoreCorrupted(format!(
                "{} events indexed but {} published",
                total, watermark
            )));
        }
        Ok(total as usize)
    }
}

impl std::fmt::Debug for PointStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointStore")
            .field("name", &self.name)
            .field("index_zoom", &self.index_zoom)
            .field("events", &self.len())
            .finish()
    }
}

/// A consistent read view of a [`PointStore`].
#[derive(Clone, Copy)]
pub struct StoreSnapshot<'a> {
    store: &'a PointStore,
    watermark: u64,
}

impl<'a> StoreSnapshot<'a> {
    /// Number of events visible through this snapshot.
    pub fn len(&self) -> usize {
        self.watermark as usize
    }

    pub fn is_empty(&self) -> bool {
        self.watermark == 0
    }

    /// Events whose pixel position at `zoom` lies in `bbox` and whose
    /// timestamp lies in `window`.
    ///
    /// `bbox` is used as given: callers widen it by their kernel's support
    /// radius. The returned query is lazy and can be iterated any number of
    /// times with the same result.
    pub fn query(
        &self,
        bbox: PixelBBox,
        zoom: u8,
        window: TimeWindow,
    ) -> HeatmapResult<PointQuery> {
        let mercator = Mercator::at_zoom(zoom)?;

        if window.end < window.start {
            return Err(HeatmapError::invalid_parameter(
                "window",
                format!("end {} precedes start {}", window.end, window.start),
            ));
        }

        let cells = match CellRange::covering(&bbox, zoom, self.store.index_zoom) {
            Some(range) if !window.is_empty() && !self.is_empty() => self.candidate_cells(&range),
            _ => Vec::new(),
        };

        trace!(
            store = %self.store.name,
            zoom,
            cells = cells.len(),
            watermark = self.watermark,
            "Prepared point query"
        );

        Ok(PointQuery::new(cells, mercator, bbox, window, self.watermark))
    }

    /// Contents of the occupied cells in `range`, in key order.
    ///
    /// Looks up each key of the range when it is smaller than the directory,
    /// otherwise scans the directory, so cost follows whichever is smaller.
    fn candidate_cells(&self, range: &CellRange) -> Vec<Arc<CellEvents>> {
        let directory = self.store.cells.load();

        let by_key = range.cell_count() <= directory.len() as u64;
        let mut found: Vec<(CellKey, &Arc<Cell>)> = if by_key {
            range
                .keys()
                .filter_map(|key| directory.get(&key).map(|cell| (key, cell)))
                .collect()
        } else {
            directory
                .iter()
                .filter(|(key, _)| range.contains(key))
                .map(|(key, cell)| (*key, cell))
                .collect()
        };

        found.sort_unstable_by_key(|(key, _)| *key);
        found.into_iter().map(|(_, cell)| cell.load()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::event_at;

    const T0: i64 = 1_700_000_000_000;

    fn world(zoom: u8) -> PixelBBox {
        let size = projection::world_pixels(zoom);
        PixelBBox::new(0, 0, size, size)
    }

    #[test]
    fn test_append_and_query() {
        let store = PointStore::new("test");
        store.append(event_at(48.85, 2.35, T0));
        store.append(event_at(40.71, -74.00, T0));

        assert_eq!(store.len(), 2);
        assert_eq!(store.cell_count(), 2);

        let query = store
            .query(world(0), 0, TimeWindow::through(T0, T0))
            .unwrap();
        assert_eq!(query.iter().count(), 2);
    }

    #[test]
    fn test_query_filters_by_time() {
        let store = PointStore::new("test");
        for i in 0..10 {
            store.append(event_at(10.0, 10.0, T0 + i * 1000));
        }

        let query = store
            .query(world(3), 3, TimeWindow::new(T0 + 2000, T0 + 5000))
            .unwrap();
        let stamps: Vec<i64> = query.iter().map(|e| e.event.timestamp()).collect();
        assert_eq!(stamps, vec![T0 + 2000, T0 + 3000, T0 + 4000]);
    }

    #[test]
    fn test_query_filters_by_exact_pixel() {
        let store = PointStore::with_index_zoom("test", 2).unwrap();
        let event = event_at(0.0, 0.0, T0);
        store.append(event);

        // (0, 0) lands on pixel (1024, 1024) at zoom 3
        let inside = PixelBBox::new(1024, 1024, 1025, 1025);
        let beside = PixelBBox::new(1025, 1024, 1100, 1100);
        let window = TimeWindow::through(T0, T0);

        let hits: Vec<_> = store.query(inside, 3, window).unwrap().iter().collect();
        assert_eq!(hits.len(), 1);
        assert_eq!((hits[0].x, hits[0].y), (1024, 1024));
        assert_eq!(store.query(beside, 3, window).unwrap().iter().count(), 0);
    }

    #[test]
    fn test_snapshot_hides_later_appends() {
        let store = PointStore::new("test");
        store.append(event_at(1.0, 1.0, T0));

        let snapshot = store.snapshot();
        store.append(event_at(1.0, 1.0, T0));

        let window = TimeWindow::through(T0, T0);
        assert_eq!(snapshot.query(world(1), 1, window).unwrap().iter().count(), 1);
        assert_eq!(store.query(world(1), 1, window).unwrap().iter().count(), 2);
    }

    #[test]
    fn test_query_is_restartable() {
        let store = PointStore::new("test");
        for i in 0..5 {
            store.append(event_at(i as f64, i as f64, T0));
        }
        let query = store.query(world(2), 2, TimeWindow::through(T0, T0)).unwrap();
        let first: Vec<_> = query.iter().map(|e| (e.x, e.y)).collect();

        store.append(event_at(0.5, 0.5, T0));
        let second: Vec<_> = query.iter().map(|e| (e.x, e.y)).collect();

        assert_eq!(first.len(), 5);
        assert_eq!(first, second);
    }

    #[test]
    fn test_lookup_and_scan_paths_agree() {
        // Index zoom 8 with few occupied cells: a zoom-0 query scans the
        // directory, a zoom-10 query looks up a handful of keys
        let store = PointStore::with_index_zoom("test", 8).unwrap();
        for i in 0..50 {
            store.append(event_at(45.0 + i as f64 * 0.001, 7.0, T0));
        }
        for i in 0..20 {
            store.append(event_at(-30.0, -170.0 + i as f64 * 10.0, T0));
        }
        assert!(store.cell_count() > 20);
        let window = TimeWindow::through(T0, T0);

        let wide = store.query(world(0), 0, window).unwrap().iter().count();

        let (x, y) = projection::lat_lon_to_pixel(45.02, 7.0, 10).unwrap();
        let narrow_bbox = PixelBBox::new(x - 512, y - 512, x + 512, y + 512);
        let narrow = store.query(narrow_bbox, 10, window).unwrap().iter().count();

        assert_eq!(wide, 70);
        assert_eq!(narrow, 50);
    }

    #[test]
    fn test_batch_is_atomic_and_counted() {
        let store = PointStore::new("test");
        let appended = store.append_batch((0..3).map(|i| event_at(0.0, i as f64, T0)));
        assert_eq!(appended, 3);
        assert_eq!(store.len(), 3);
        assert_eq!(store.verify().unwrap(), 3);
    }

    #[test]
    fn test_cell_log_spans_chunks() {
        let store = PointStore::new("test");
        store.append_batch((0..CHUNK_SIZE + 10).map(|_| event_at(5.0, 5.0, T0)));
        for _ in 0..CHUNK_SIZE {
            store.append(event_at(5.0, 5.0, T0));
        }
        store.append_batch((0..2 * CHUNK_SIZE).map(|_| event_at(5.0, 5.0, T0)));

        let total = 4 * CHUNK_SIZE + 10;
        let cells = store.cells.load();
        let events = cells.values().next().unwrap().load();
        assert_eq!(cells.len(), 1);
        assert_eq!(events.iter().count(), total);
        assert_eq!(events.chunks.len(), 5);
        assert!(events.chunks[..4].iter().all(|chunk| chunk.len() == CHUNK_SIZE));

        let seqs: Vec<u64> = events.iter().map(|s| s.seq).collect();
        assert_eq!(seqs, (1..=total as u64).collect::<Vec<_>>());
        assert_eq!(store.verify().unwrap(), total);
    }

    #[test]
    fn test_loaded_cell_is_unaffected_by_appends() {
        let store = PointStore::new("test");
        store.append(event_at(5.0, 5.0, T0));
        let before = store.cells.load().values().next().unwrap().load();

        store.append(event_at(5.0, 5.0, T0));
        assert_eq!(before.iter().count(), 1);
        assert_eq!(store.cells.load().values().next().unwrap().load().iter().count(), 2);
    }

    #[test]
    fn test_time_span_and_stats() {
        let store = PointStore::new("test");
        assert_eq!(store.time_span(), None);

        store.append(event_at(0.0, 0.0, T0 + 50));
        store.append(event_at(0.0, 0.0, T0 - 50));
        assert_eq!(store.time_span(), Some((T0 - 50, T0 + 50)));

        let stats = store.stats();
        assert_eq!(stats.events, 2);
        assert_eq!(stats.cells, 1);
    }

    #[test]
    fn test_invalid_query_arguments() {
        let store = PointStore::new("test");
        assert!(matches!(
            store.query(world(0), 31, TimeWindow::new(0, 1)),
            Err(HeatmapError::InvalidZoom(31))
        ));
        assert!(store.query(world(0), 0, TimeWindow::new(10, 5)).is_err());
        assert!(PointStore::with_index_zoom("bad", 31).is_err());
    }
}
