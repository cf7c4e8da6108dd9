//! In-memory per-subscriber traffic accumulator.
//!
//! Tail duty adds deltas, flush duty snapshots them. The two meet only
//! in the table's critical section, so a delta is either fully part of
//! one flush or fully part of the next.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;

/// Accumulated traffic for one correlation key.
#[derive(Debug, Clone, Default)]
pub struct Aggregate {
    /// Upload bytes since the last flush.
    pub upload: i64,
    /// Download bytes since the last flush.
    pub download: i64,
    /// Last time a log line mentioned this key.
    pub last_seen: Option<SystemTime>,
}

/// One key's deltas taken at flush time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushEntry {
    pub key: String,
    pub upload: i64,
    pub download: i64,
}

/// Thread-safe aggregate table, keyed by correlation key.
///
/// Cheap to clone; clones share state. Entries are created lazily and
/// retained for the process lifetime so `last_seen` history survives
/// flushes.
#[derive(Debug, Clone)]
pub struct TrafficTable {
    inner: Arc<Mutex<HashMap<String, Aggregate>>>,
}

impl TrafficTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Add byte deltas for a key (additive) and bump `last_seen`.
    pub fn record(&self, key: &str, upload: i64, download: i64) {
        let mut map = self.inner.lock();
        let entry = map.entry(key.to_string()).or_default();
        entry.upload += upload;
        entry.download += download;
        entry.last_seen = Some(SystemTime::now());
    }

    /// Bump `last_seen` for a key without touching byte counts.
    pub fn touch(&self, key: &str) {
        let mut map = self.inner.lock();
        let entry = map.entry(key.to_string()).or_default();
        entry.last_seen = Some(SystemTime::now());
    }

    /// Snapshot all non-zero deltas and zero them in place.
    ///
    /// Zeroing happens in the same critical section as the snapshot, so
    /// concurrent `record` calls land either before this flush or after
    /// it, never split across it. Entries are retained.
    pub fn snapshot_deltas(&self) -> Vec<FlushEntry> {
        let mut map = self.inner.lock();
        let mut entries = Vec::new();
        for (key, aggregate) in map.iter_mut() {
            if aggregate.upload == 0 && aggregate.download == 0 {
                continue;
            }
            entries.push(FlushEntry {
                key: key.clone(),
                upload: aggregate.upload,
                download: aggregate.download,
            });
            aggregate.upload = 0;
            aggregate.download = 0;
        }
        entries
    }

    /// Copy of the current table for display.
    pub fn stats(&self) -> HashMap<String, Aggregate> {
        self.inner.lock().clone()
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl Default for TrafficTable {
    fn default() -> Self {
        Self::new()
    }
}
