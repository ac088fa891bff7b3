//! Per-shard request counters
//!
//! Tracks request outcomes for every registered shard, read by the
//! readiness and shard listing endpoints.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Outcome of a routed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Read,
    /// GET on a key that was never set
    Miss,
    Write,
    Failure,
}

/// Counters for a single shard
#[derive(Debug, Default)]
pub(crate) struct ShardCounters {
    pub reads: AtomicU64,
    pub misses: AtomicU64,
    pub writes: AtomicU64,
    pub failures: AtomicU64,
}

/// Serializable copy of one shard's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ShardSnapshot {
    pub reads: u64,
    pub misses: u64,
    pub writes: u64,
    pub failures: u64,
}

/// Shared counters across all shards
#[derive(Debug, Clone, Default)]
pub struct ShardStats {
    inner: Arc<DashMap<String, ShardCounters>>,
}

impl ShardStats {
    pub fn new<'a>(shards: impl IntoIterator<Item = &'a str>) -> Self {
        let inner = DashMap::new();
        for name in shards {
            inner.insert(name.to_string(), ShardCounters::default());
        }
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Count an outcome; unknown shard names are ignored
    pub fn record(&self, shard: &str, outcome: Outcome) {
        if let Some(entry) = self.inner.get(shard) {
            let counter = match outcome {
                Outcome::Read => &entry.reads,
                Outcome::Miss => &entry.misses,
                Outcome::Write => &entry.writes,
                Outcome::Failure => &entry.failures,
            };
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn is_tracked(&self, shard: &str) -> bool {
        self.inner.contains_key(shard)
    }

    pub fn snapshot(&self, shard: &str) -> Option<ShardSnapshot> {
        self.inner.get(shard).map(|e| ShardSnapshot {
            reads: e.reads.load(Ordering::Relaxed),
            misses: e.misses.load(Ordering::Relaxed),
            writes: e.writes.load(Ordering::Relaxed),
            failures: e.failures.load(Ordering::Relaxed),
        })
    }

    /// Total requests across all shards, failures included
    pub fn total_requests(&self) -> u64 {
        self.inner
            .iter()
            .map(|e| {
                e.reads.load(Ordering::Relaxed)
                    + e.misses.load(Ordering::Relaxed)
                    + e.writes.load(Ordering::Relaxed)
                    + e.failures.load(Ordering::Relaxed)
            })
            .sum()
    }

    pub fn total_failures(&self) -> u64 {
        self.inner
            .iter()
            .map(|e| e.failures.load(Ordering::Relaxed))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_per_shard() {
        let stats = ShardStats::new(["key1", "key2"]);
        stats.record("key1", Outcome::Write);
        stats.record("key1", Outcome::Read);
        stats.record("key1", Outcome::Read);
        stats.record("key2", Outcome::Miss);
        stats.record("key2", Outcome::Failure);

        assert_eq!(
            stats.snapshot("key1").unwrap(),
            ShardSnapshot { reads: 2, misses: 0, writes: 1, failures: 0 }
        );
        assert_eq!(stats.snapshot("key2").unwrap().misses, 1);
        assert_eq!(stats.total_requests(), 5);
        assert_eq!(stats.total_failures(), 1);
    }

    #[test]
    fn test_unknown_shard_ignored() {
        let stats = ShardStats::new(["key1"]);
        stats.record("key3", Outcome::Read);
        assert!(!stats.is_tracked("key3"));
        assert!(stats.snapshot("key3").is_none());
        assert_eq!(stats.total_requests(), 0);
        assert!(stats.is_tracked("key1"));
    }

    #[test]
    fn test_clones_share_counters() {
        let stats = ShardStats::new(["a"]);
        let clone = stats.clone();
        clone.record("a", Outcome::Write);
        assert_eq!(stats.snapshot("a").unwrap().writes, 1);
    }
}
