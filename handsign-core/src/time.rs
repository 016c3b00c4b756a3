//! Time management for live sessions
//!
//! Provides a clock abstraction so the session recorder and pipeline can run
//! against the system clock in production and a controllable clock in tests:
//! - System clock (wall time, milliseconds since the Unix epoch)
//! - Fixed clock (manually advanced, shared between clones)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};

/// Timestamp in milliseconds since the Unix epoch
pub type Timestamp = u64;

/// Source of time for the system
pub trait TimeSource: Send {
    /// Get current timestamp in milliseconds
    fn now(&self) -> Timestamp;

    /// Check if this source provides wall clock time
    fn is_wall_clock(&self) -> bool;
}

/// System time source
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTime;

impl TimeSource for SystemTime {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime as StdSystemTime, UNIX_EPOCH};

        StdSystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }

    fn is_wall_clock(&self) -> bool {
        true
    }
}

/// Manually driven time source for tests and replays
///
/// Clones share the same underlying counter, so a test can keep one handle
/// and advance the clock seen by a pipeline that owns another.
#[derive(Debug, Clone, Default)]
pub struct FixedTime {
    timestamp: Arc<AtomicU64>,
}

impl FixedTime {
    /// Create a clock frozen at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp: Arc::new(AtomicU64::new(timestamp)),
        }
    }

    /// Jump to an absolute timestamp
    pub fn set(&self, timestamp: Timestamp) {
        self.timestamp.store(timestamp, Ordering::SeqCst);
    }

    /// Move the clock forward
    pub fn advance(&self, ms: u64) {
        self.timestamp.fetch_add(ms, Ordering::SeqCst);
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        self.timestamp.load(Ordering::SeqCst)
    }

    fn is_wall_clock(&self) -> bool {
        false
    }
}

/// Convert a timestamp to a UTC date-time
pub fn to_datetime(timestamp: Timestamp) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(timestamp as i64).unwrap_or_default()
}

/// RFC 3339 rendering with millisecond precision
pub fn to_rfc3339(timestamp: Timestamp) -> String {
    to_datetime(timestamp).to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Compact key used in artifact file names, e.g. `20240131_235959_123`
pub fn file_key(timestamp: Timestamp) -> String {
    to_datetime(timestamp).format("%Y%m%d_%H%M%S_%3f").to_string()
}
