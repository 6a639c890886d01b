//! Atomic counters for stream observability.
//!
//! All counters use relaxed ordering: they are advisory/diagnostic,
//! not synchronization primitives. They are updated by [`StreamHandle`]
//! from operation results, so every backend is counted the same way.
//!
//! [`StreamHandle`]: crate::stream::StreamHandle

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Global stream operation counters.
pub struct StreamMetrics {
    /// Handles constructed.
    pub handles_initialized: AtomicU64,
    /// Characters returned by `get_char`.
    pub chars_read: AtomicU64,
    /// Characters accepted by `put_char`.
    pub chars_written: AtomicU64,
    /// Successful `unget_char` calls.
    pub pushbacks: AtomicU64,
    /// `read_block` calls that returned a non-negative count.
    pub blocks_read: AtomicU64,
    /// `write_block` calls that wrote the full request.
    pub blocks_written: AtomicU64,
    /// Bytes delivered by `read_block`.
    pub bytes_read: AtomicU64,
    /// Bytes accepted by `write_block` and `formatted_write`.
    pub bytes_written: AtomicU64,
    /// `get_char` calls that returned the end-of-stream sentinel.
    pub eof_hits: AtomicU64,
    /// Operations that returned an error sentinel.
    pub failures: AtomicU64,
    /// `close` calls.
    pub closes: AtomicU64,
}

impl StreamMetrics {
    /// Create a new zeroed metrics instance.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            handles_initialized: AtomicU64::new(0),
            chars_read: AtomicU64::new(0),
            chars_written: AtomicU64::new(0),
            pushbacks: AtomicU64::new(0),
            blocks_read: AtomicU64::new(0),
            blocks_written: AtomicU64::new(0),
            bytes_read: AtomicU64::new(0),
            bytes_written: AtomicU64::new(0),
            eof_hits: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            closes: AtomicU64::new(0),
        }
    }

    /// Increment a counter by 1.
    pub fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Increment a counter by `n`.
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Read a counter value.
    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    /// Snapshot all counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            handles_initialized: Self::get(&self.handles_initialized),
            chars_read: Self::get(&self.chars_read),
            chars_written: Self::get(&self.chars_written),
            pushbacks: Self::get(&self.pushbacks),
            blocks_read: Self::get(&self.blocks_read),
            blocks_written: Self::get(&self.blocks_written),
            bytes_read: Self::get(&self.bytes_read),
            bytes_written: Self::get(&self.bytes_written),
            eof_hits: Self::get(&self.eof_hits),
            failures: Self::get(&self.failures),
            closes: Self::get(&self.closes),
        }
    }
}

impl Default for StreamMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`StreamMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub handles_initialized: u64,
    pub chars_read: u64,
    pub chars_written: u64,
    pub pushbacks: u64,
    pub blocks_read: u64,
    pub blocks_written: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub eof_hits: u64,
    pub failures: u64,
    pub closes: u64,
}

/// Process-wide metrics instance.
pub static METRICS: StreamMetrics = StreamMetrics::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let m = StreamMetrics::new();
        StreamMetrics::inc(&m.chars_read);
        StreamMetrics::inc(&m.chars_read);
        StreamMetrics::add(&m.bytes_written, 10);
        let snap = m.snapshot();
        assert_eq!(snap.chars_read, 2);
        assert_eq!(snap.bytes_written, 10);
        assert_eq!(snap.closes, 0);
    }

    #[test]
    fn test_snapshot_serializes() {
        let snap = StreamMetrics::new().snapshot();
        let json = serde_json::to_value(snap).unwrap();
        assert_eq!(json["eof_hits"], 0);
    }
}
