//! The process-wide query cache table.
//!
//! Entries live in a slab of slots linked into an intrusive doubly linked
//! MRU list by slot index. A hash map goes from fingerprint key to slot.
//! All structural state sits behind one mutex; lookups and inserts touch a
//! constant number of slots, so the critical sections are short and do not
//! depend on entry size.
//!
//! The table owns one `Arc` per entry. Readers get their own clone from
//! [`QueryCache::find`], so evicting an entry never frees data that a
//! replay is still decoding.

use std::sync::Arc;

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::qcache::admission::AdmissionPolicy;
use crate::qcache::config::QcacheConfig;
use crate::qcache::entry::CacheEntry;
use crate::qcache::stats::{CacheCounters, QcacheStatus};

/// Null link in the MRU list.
const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Slot {
    entry: Option<Arc<CacheEntry>>,
    prev: usize,
    next: usize,
}

#[derive(Debug)]
struct TableState {
    config: QcacheConfig,
    keys: AHashMap<u64, usize>,
    slots: Vec<Slot>,
    free: Vec<usize>,
    /// Most recently used.
    head: usize,
    /// Least recently used.
    tail: usize,
    used_bytes: usize,
}

impl TableState {
    fn new(config: QcacheConfig) -> Self {
        TableState {
            config,
            keys: AHashMap::new(),
            slots: Vec::new(),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            used_bytes: 0,
        }
    }

    fn detach(&mut self, slot: usize) {
        let prev = self.slots[slot].prev;
        let next = self.slots[slot].next;

        if prev == NIL {
            self.head = next;
        } else {
            self.slots[prev].next = next;
        }

        if next == NIL {
            self.tail = prev;
        } else {
            self.slots[next].prev = prev;
        }

        self.slots[slot].prev = NIL;
        self.slots[slot].next = NIL;
    }

    fn push_front(&mut self, slot: usize) {
        self.slots[slot].prev = NIL;
        self.slots[slot].next = self.head;

        if self.head != NIL {
            self.slots[self.head].prev = slot;
        }
        self.head = slot;

        if self.tail == NIL {
            self.tail = slot;
        }
    }

    fn promote(&mut self, slot: usize) {
        if self.head != slot {
            self.detach(slot);
            self.push_front(slot);
        }
    }

    fn insert(&mut self, entry: Arc<CacheEntry>) {
        let key = entry.cache_key();
        self.used_bytes += entry.size_bytes();

        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot].entry = Some(entry);
                slot
            }
            None => {
                self.slots.push(Slot {
                    entry: Some(entry),
                    prev: NIL,
                    next: NIL,
                });
                self.slots.len() - 1
            }
        };

        self.keys.insert(key, slot);
        self.push_front(slot);
    }

    fn remove(&mut self, slot: usize) -> Option<Arc<CacheEntry>> {
        let entry = self.slots[slot].entry.take()?;
        self.detach(slot);
        self.keys.remove(&entry.cache_key());
        self.used_bytes -= entry.size_bytes();
        self.free.push(slot);
        Some(entry)
    }

    fn evict_tail(&mut self) -> Option<Arc<CacheEntry>> {
        if self.tail == NIL {
            return None;
        }
        self.remove(self.tail)
    }

    /// Evict from the LRU end until `used_bytes <= budget`.
    fn trim_to(&mut self, budget: usize, evicted: &mut Vec<Arc<CacheEntry>>) {
        while self.used_bytes > budget {
            match self.evict_tail() {
                Some(entry) => evicted.push(entry),
                None => break,
            }
        }
    }

    fn drain(&mut self, evicted: &mut Vec<Arc<CacheEntry>>) {
        evicted.extend(self.slots.drain(..).filter_map(|slot| slot.entry));
        self.keys.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
        self.used_bytes = 0;
    }

    fn mru_order(&self) -> Vec<Arc<CacheEntry>> {
        let mut out = Vec::with_capacity(self.keys.len());
        let mut cursor = self.head;
        while cursor != NIL {
            if let Some(entry) = &self.slots[cursor].entry {
                out.push(Arc::clone(entry));
            }
            cursor = self.slots[cursor].next;
        }
        out
    }
}

/// Handle to a shared query cache table.
///
/// Construct one at startup and hand clones to every worker; clones share
/// the same table.
#[derive(Debug, Clone)]
pub struct QueryCache {
    state: Arc<Mutex<TableState>>,
    counters: Arc<CacheCounters>,
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(QcacheConfig::default())
    }
}

impl QueryCache {
    /// Create an empty cache with the given budget and policy.
    pub fn new(config: QcacheConfig) -> Self {
        QueryCache {
            state: Arc::new(Mutex::new(TableState::new(config))),
            counters: Arc::new(CacheCounters::default()),
        }
    }

    /// Look up an entry.
    ///
    /// Misses when the key is absent, when the entry belongs to another
    /// index, when its filter hashes differ from `filter_hashes`, or when it
    /// has outlived the TTL; an expired entry is dropped on the spot. A hit
    /// moves the entry to the MRU head.
    pub fn find(&self, index_id: i64, key: u64, filter_hashes: &[u64]) -> Option<Arc<CacheEntry>> {
        self.find_at(index_id, key, filter_hashes, Utc::now())
    }

    /// [`find`](Self::find) evaluated at an explicit point in time.
    pub fn find_at(
        &self,
        index_id: i64,
        key: u64,
        filter_hashes: &[u64],
        now: DateTime<Utc>,
    ) -> Option<Arc<CacheEntry>> {
        let mut state = self.state.lock();

        let found = if state.config.is_enabled() {
            state
                .keys
                .get(&key)
                .copied()
                .and_then(|slot| state.slots[slot].entry.clone().map(|entry| (slot, entry)))
        } else {
            None
        };
        let Some((slot, entry)) = found else {
            drop(state);
            self.counters.record_miss();
            return None;
        };

        if entry.is_expired(now, state.config.ttl_secs) {
            let expired = state.remove(slot);
            drop(state);
            debug!("qcache entry {key:#018x} expired (index {})", entry.index_id());
            self.counters.record_evictions(u64::from(expired.is_some()));
            self.counters.record_miss();
            return None;
        }

        if entry.index_id() != index_id || entry.filter_hashes() != filter_hashes {
            drop(state);
            debug!("qcache key {key:#018x} matched but filters or index differ");
            self.counters.record_miss();
            return None;
        }

        state.promote(slot);
        drop(state);
        self.counters.record_hit();
        Some(entry)
    }

    /// Publish a finished entry.
    ///
    /// Returns `false` when the cache is disabled or the entry alone exceeds
    /// the budget. Otherwise any entry under the same key is replaced, LRU
    /// entries are evicted until the new one fits, and it becomes the MRU
    /// head.
    pub fn add(&self, entry: CacheEntry) -> bool {
        let entry = Arc::new(entry);
        let size = entry.size_bytes();
        let mut evicted = Vec::new();

        let mut state = self.state.lock();
        let budget = state.config.budget();
        if !state.config.is_enabled() || size > budget {
            drop(state);
            if budget > 0 {
                warn!("qcache entry of {size} bytes exceeds budget of {budget} bytes; not cached");
            }
            self.counters.record_rejected();
            return false;
        }

        if let Some(&slot) = state.keys.get(&entry.cache_key()) {
            evicted.extend(state.remove(slot));
        }
        state.trim_to(budget - size, &mut evicted);
        state.insert(Arc::clone(&entry));
        drop(state);

        self.counters.record_evictions(evicted.len() as u64);
        debug!(
            "qcache stored {:#018x}: {} matches in {size} bytes, {} evicted",
            entry.cache_key(),
            entry.total_matches(),
            evicted.len()
        );
        true
    }

    /// Remove every entry built against `index_id`. Returns how many were removed.
    pub fn delete_for_index(&self, index_id: i64) -> usize {
        let mut evicted = Vec::new();
        {
            let mut state = self.state.lock();
            let doomed: Vec<usize> = state
                .slots
                .iter()
                .enumerate()
                .filter(|(_, slot)| {
                    slot.entry
                        .as_ref()
                        .is_some_and(|entry| entry.index_id() == index_id)
                })
                .map(|(i, _)| i)
                .collect();
            for slot in doomed {
                evicted.extend(state.remove(slot));
            }
        }

        self.counters.record_evictions(evicted.len() as u64);
        if !evicted.is_empty() {
            info!("qcache invalidated {} entries of index {index_id}", evicted.len());
        }
        evicted.len()
    }

    /// Replace budget and policy. A lowered budget is enforced immediately
    /// by evicting from the LRU end; a disabled config empties the table.
    pub fn configure(&self, config: QcacheConfig) {
        let mut evicted = Vec::new();
        {
            let mut state = self.state.lock();
            state.config = config;
            if config.is_enabled() {
                state.trim_to(config.budget(), &mut evicted);
            } else {
                state.drain(&mut evicted);
            }
        }

        self.counters.record_evictions(evicted.len() as u64);
        info!(
            "qcache configured: max_bytes={} threshold_ms={} ttl_secs={} ({} entries evicted)",
            config.max_bytes,
            config.threshold_ms,
            config.ttl_secs,
            evicted.len()
        );
    }

    /// Active configuration.
    pub fn config(&self) -> QcacheConfig {
        self.state.lock().config
    }

    /// Admission rules of the active configuration.
    pub fn admission(&self) -> AdmissionPolicy {
        AdmissionPolicy::from_config(&self.state.lock().config)
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut evicted = Vec::new();
        self.state.lock().drain(&mut evicted);
        self.counters.record_evictions(evicted.len() as u64);
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.state.lock().keys.len()
    }

    /// Whether the table holds nothing.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Held entries from most to least recently used.
    pub fn entries(&self) -> Vec<Arc<CacheEntry>> {
        self.state.lock().mru_order()
    }

    /// Snapshot of size, configuration and counters.
    pub fn stats(&self) -> QcacheStatus {
        let mut status = {
            let state = self.state.lock();
            QcacheStatus {
                max_bytes: state.config.max_bytes,
                threshold_ms: state.config.threshold_ms,
                ttl_secs: state.config.ttl_secs,
                cached_queries: state.keys.len() as u64,
                used_bytes: state.used_bytes as u64,
                ..Default::default()
            }
        };
        self.counters.fill(&mut status);
        status
    }
}
