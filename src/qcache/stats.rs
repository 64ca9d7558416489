//! Counters and status snapshots for the query cache.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Point-in-time view of the cache, as reported by status commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct QcacheStatus {
    /// Configured budget.
    pub max_bytes: i64,
    /// Configured admission threshold.
    pub threshold_ms: u32,
    /// Configured entry lifetime.
    pub ttl_secs: i64,
    /// Entries currently held.
    pub cached_queries: u64,
    /// Bytes charged by the held entries.
    pub used_bytes: u64,
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that found nothing usable.
    pub misses: u64,
    /// Entries dropped by LRU pressure, expiry or invalidation.
    pub evictions: u64,
    /// Entries refused at insert time.
    pub rejected: u64,
}

impl QcacheStatus {
    /// Fraction of lookups that hit, 0.0 when nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// Thread-safe counters updated outside the table lock.
#[derive(Debug, Default)]
pub(crate) struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    rejected: AtomicU64,
}

impl CacheCounters {
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_evictions(&self, count: u64) {
        if count > 0 {
            self.evictions.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Fill the counter fields of `status`.
    pub(crate) fn fill(&self, status: &mut QcacheStatus) {
        status.hits = self.hits.load(Ordering::Relaxed);
        status.misses = self.misses.load(Ordering::Relaxed);
        status.evictions = self.evictions.load(Ordering::Relaxed);
        status.rejected = self.rejected.load(Ordering::Relaxed);
    }
}
