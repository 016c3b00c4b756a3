//! Bounded FIFO of recent classifications
//!
//! ## Overview
//!
//! The smoothing window keeps the last W classification results of one live
//! session. It is a fixed-capacity ring: pushing into a full window evicts the
//! oldest entry first, so the window always holds the most recent W results.
//!
//! ## Memory Layout
//!
//! Storage is a `heapless::Deque` with a compile-time capacity of
//! [`MAX_WINDOW_CAPACITY`]. The configured capacity W is a runtime value in
//! `1..=MAX_WINDOW_CAPACITY`; the window never grows past W.
//!
//! ```text
//! capacity W = 5, after pushing r0..r6:
//!
//!   oldest                 newest
//!   ┌────┬────┬────┬────┬────┐
//!   │ r2 │ r3 │ r4 │ r5 │ r6 │
//!   └────┴────┴────┴────┴────┘
//!   r0, r1 evicted
//! ```
//!
//! Operations:
//! - `push()`: O(1), evicts at most one entry
//! - `latest()`: O(1)
//! - `iter()`: O(W), oldest to newest
//!
//! ## Ownership
//!
//! A window belongs to exactly one smoother and one session. It is not shared
//! and is not thread-safe.

use heapless::Deque;

use crate::classifier::ClassificationResult;
use crate::errors::{PipelineError, PipelineResult};

/// Largest supported window capacity
pub const MAX_WINDOW_CAPACITY: usize = 16;

/// Fixed-capacity FIFO of classification results
#[derive(Debug, Clone)]
pub struct SmoothingWindow {
    /// Entries, front = oldest
    entries: Deque<ClassificationResult, MAX_WINDOW_CAPACITY>,
    /// Configured capacity W
    capacity: usize,
}

impl SmoothingWindow {
    /// Create an empty window holding at most `capacity` results
    pub fn new(capacity: usize) -> PipelineResult<Self> {
        if capacity == 0 || capacity > MAX_WINDOW_CAPACITY {
            return Err(PipelineError::InvalidConfig(format!(
                "window capacity must be in 1..={MAX_WINDOW_CAPACITY}, got {capacity}"
            )));
        }
        Ok(Self {
            entries: Deque::new(),
            capacity,
        })
    }

    /// Append a result, evicting the oldest entry when full
    ///
    /// Returns the evicted entry, if any.
    pub fn push(&mut self, result: ClassificationResult) -> Option<ClassificationResult> {
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front()
        } else {
            None
        };

        // Cannot fail: len < capacity <= MAX_WINDOW_CAPACITY after eviction
        let _ = self.entries.push_back(result);
        evicted
    }

    /// Most recently pushed entry
    pub fn latest(&self) -> Option<&ClassificationResult> {
        self.entries.back()
    }

    /// Entries from oldest to newest
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ClassificationResult> + '_ {
        self.entries.iter()
    }

    /// Entries currently held
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// No entries held
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Holding `capacity()` entries
    pub fn is_full(&self) -> bool {
        self.entries.len() == self.capacity
    }

    /// Runtime capacity, at most the backing size
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
