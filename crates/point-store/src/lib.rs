//! In-memory event storage for heat maps.
//!
//! Provides:
//! - A geocell grid index over Mercator pixels at a fixed index zoom
//! - Append-only, snapshot-isolated storage of weighted geo-events
//! - Lazy, restartable bounding-box + time-window queries

pub mod geocell;
pub mod query;
pub mod store;

pub use geocell::{CellKey, CellRange, DEFAULT_INDEX_ZOOM};
pub use query::{LocatedEvent, PointIter, PointQuery};
pub use store::{PointStore, StoreSnapshot, StoreStats};
