//! Time handling utilities for event timestamps (epoch milliseconds).

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One hour in milliseconds.
pub const HOUR_MS: i64 = 3_600_000;

/// One day in milliseconds.
pub const DAY_MS: i64 = 24 * HOUR_MS;

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Format epoch milliseconds as RFC 3339, for logs and diagnostics.
pub fn format_millis(timestamp: i64) -> String {
    match Utc.timestamp_millis_opt(timestamp).single() {
        Some(dt) => dt.to_rfc3339(),
        None => format!("{}ms", timestamp),
    }
}

/// A time range for event queries.
///
/// Windows are half-open (`[start, end)`) unless built with
/// [`TimeWindow::through`], which includes `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
    pub end_inclusive: bool,
}

impl TimeWindow {
    /// Half-open window `[start, end)`.
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            start,
            end,
            end_inclusive: false,
        }
    }

    /// Closed window `[start, end]`.
    pub fn through(start: i64, end: i64) -> Self {
        Self {
            start,
            end,
            end_inclusive: true,
        }
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        if timestamp < self.start {
            return false;
        }
        if self.end_inclusive {
            timestamp <= self.end
        } else {
            timestamp < self.end
        }
    }

    /// True when no timestamp can fall in the window.
    pub fn is_empty(&self) -> bool {
        if self.end_inclusive {
            self.end < self.start
        } else {
            self.end <= self.start
        }
    }
}
