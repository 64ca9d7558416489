//! Query engine facing side of the cache.
//!
//! [`SearchCache`] is what the query engine talks to: it fingerprints
//! queries, applies the admission policy and turns cached entries into
//! rankers. [`RecordingRanker`] sits between a live ranker and the result
//! sorter and records the stream it forwards so it can be cached once the
//! ranker is exhausted.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::debug;

use crate::error::Result;
use crate::qcache::config::QcacheConfig;
use crate::qcache::entry::{CacheEntry, EntryBuilder};
use crate::qcache::fingerprint::Fingerprint;
use crate::qcache::replay::{RankerSetup, ReplayRanker};
use crate::qcache::stats::QcacheStatus;
use crate::qcache::table::QueryCache;
use crate::query::query::SearchQuery;
use crate::query::ranker::{RankedMatch, Ranker};
use crate::query::schema::SortingSchema;

/// Query engine entry point to the result cache.
#[derive(Debug, Clone, Default)]
pub struct SearchCache {
    cache: QueryCache,
}

impl SearchCache {
    /// Create a cache with the given configuration.
    pub fn new(config: QcacheConfig) -> Self {
        SearchCache {
            cache: QueryCache::new(config),
        }
    }

    /// Wrap an existing table handle.
    pub fn with_cache(cache: QueryCache) -> Self {
        SearchCache { cache }
    }

    /// The underlying table.
    pub fn table(&self) -> &QueryCache {
        &self.cache
    }

    /// Look up a cached result for `query` on `index_id`.
    pub fn lookup(
        &self,
        index_id: i64,
        query: &SearchQuery,
        schema: &SortingSchema,
    ) -> Option<Arc<CacheEntry>> {
        let fingerprint = Fingerprint::compute(index_id, query, schema.signature());
        let found = self
            .cache
            .find(index_id, fingerprint.key, &fingerprint.filter_hashes);
        debug!(
            "qcache lookup {:#018x} on index {index_id}: {}",
            fingerprint.key,
            if found.is_some() { "hit" } else { "miss" }
        );
        found
    }

    /// Start building an entry, unless the pre-check says it is pointless.
    ///
    /// `previous_elapsed_ms` is the run time of an earlier execution of the
    /// same query, when the caller knows it.
    pub fn builder(&self, index_id: i64, previous_elapsed_ms: Option<u32>) -> Option<EntryBuilder> {
        self.cache
            .admission()
            .should_build(previous_elapsed_ms)
            .then(|| EntryBuilder::new(index_id))
    }

    /// Cache a finished entry for `query` if it took long enough.
    ///
    /// Returns whether the entry was published. A `false` only means the
    /// result was not cached; the caller serves it normally either way.
    pub fn store(&self, query: &SearchQuery, entry: CacheEntry, schema: &SortingSchema) -> bool {
        let policy = self.cache.admission();
        if !policy.should_store(entry.elapsed_ms()) {
            debug!(
                "qcache skipped query on index {}: {} ms below threshold of {} ms",
                entry.index_id(),
                entry.elapsed_ms(),
                policy.threshold_ms()
            );
            return false;
        }

        let fingerprint = Fingerprint::compute(entry.index_id(), query, schema.signature());
        self.cache.add(entry.with_fingerprint(fingerprint))
    }

    /// Build a ranker that replays `entry` for a query set up by `setup`.
    pub fn replay_ranker(&self, entry: Arc<CacheEntry>, setup: &RankerSetup) -> Result<ReplayRanker> {
        ReplayRanker::with_setup(entry, setup)
    }

    /// Serve `query` from the cache or from a live ranker.
    ///
    /// On a hit the returned ranker replays the cached stream and `live` is
    /// never called. On a miss the live ranker is wrapped so that its full
    /// output gets cached when it is exhausted.
    pub fn search<R, F>(
        &self,
        index_id: i64,
        query: &SearchQuery,
        schema: &SortingSchema,
        live: F,
    ) -> Result<Box<dyn Ranker>>
    where
        R: Ranker + 'static,
        F: FnOnce() -> Result<R>,
    {
        if let Some(entry) = self.lookup(index_id, query, schema) {
            let ranker = self.replay_ranker(entry, &RankerSetup::new(index_id))?;
            return Ok(Box::new(ranker));
        }

        let started = Instant::now();
        let inner = live()?;
        match self.builder(index_id, None) {
            Some(builder) => Ok(Box::new(RecordingRanker::start_at(
                inner,
                builder,
                self.clone(),
                query.clone(),
                schema.clone(),
                started,
            ))),
            None => Ok(Box::new(inner)),
        }
    }

    /// Status snapshot for monitoring.
    pub fn status(&self) -> QcacheStatus {
        self.cache.stats()
    }

    /// Replace the budget and policy.
    pub fn configure(&self, config: QcacheConfig) {
        self.cache.configure(config);
    }

    /// Drop every cached result of `index_id`.
    pub fn invalidate_index(&self, index_id: i64) -> usize {
        self.cache.delete_for_index(index_id)
    }
}

/// Forwards a live ranker's matches and records them for the cache.
///
/// When the inner ranker reports exhaustion the recorded stream is sealed
/// with the elapsed time since the recorder started and offered to the
/// cache. A stream that is abandoned early, or that fails, is discarded.
#[derive(Debug)]
pub struct RecordingRanker<R: Ranker> {
    inner: R,
    builder: Option<EntryBuilder>,
    cache: SearchCache,
    query: SearchQuery,
    schema: SortingSchema,
    started: Instant,
    stored: Option<bool>,
}

impl<R: Ranker> RecordingRanker<R> {
    /// Start recording now.
    pub fn new(
        inner: R,
        builder: EntryBuilder,
        cache: SearchCache,
        query: SearchQuery,
        schema: SortingSchema,
    ) -> Self {
        Self::start_at(inner, builder, cache, query, schema, Instant::now())
    }

    /// Start recording with the query clock started at `started`.
    pub fn start_at(
        inner: R,
        builder: EntryBuilder,
        cache: SearchCache,
        query: SearchQuery,
        schema: SortingSchema,
        started: Instant,
    ) -> Self {
        RecordingRanker {
            inner,
            builder: Some(builder),
            cache,
            query,
            schema,
            started,
            stored: None,
        }
    }

    /// Whether the recorded stream was published, once the inner ranker
    /// is exhausted. `None` while still recording or after a failure.
    pub fn stored(&self) -> Option<bool> {
        self.stored
    }

    fn complete(&mut self) {
        if let Some(builder) = self.builder.take() {
            let entry = builder.finish(self.elapsed());
            self.stored = Some(self.cache.store(&self.query, entry, &self.schema));
        }
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    fn observe<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.builder = None;
        }
        result
    }
}

impl<R: Ranker> Ranker for RecordingRanker<R> {
    fn next_match(&mut self) -> Result<Option<RankedMatch>> {
        let next = self.inner.next_match();
        match self.observe(next)? {
            Some(m) => {
                if let Some(builder) = self.builder.as_mut() {
                    builder.push(m);
                }
                Ok(Some(m))
            }
            None => {
                self.complete();
                Ok(None)
            }
        }
    }

    fn next_block(&mut self, out: &mut Vec<RankedMatch>) -> Result<usize> {
        let start = out.len();
        let produced = self.inner.next_block(out);
        let produced = self.observe(produced)?;
        if produced == 0 {
            self.complete();
        } else if let Some(builder) = self.builder.as_mut() {
            for &m in &out[start..] {
                builder.push(m);
            }
        }
        Ok(produced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SarissaError;
    use crate::query::filter::Filter;
    use crate::query::ranker::VecRanker;

    fn eager() -> QcacheConfig {
        QcacheConfig::default().with_threshold_ms(0)
    }

    #[derive(Debug)]
    struct FailingRanker {
        left: usize,
    }

    impl Ranker for FailingRanker {
        fn next_match(&mut self) -> Result<Option<RankedMatch>> {
            if self.left == 0 {
                return Err(SarissaError::ranker("index went away"));
            }
            self.left -= 1;
            Ok(Some(RankedMatch::new(self.left as u64, 1)))
        }
    }

    #[test]
    fn test_store_then_lookup() {
        let cache = SearchCache::new(eager());
        let query = SearchQuery::new("rust cache").with_filter(Filter::range("year", 2000, 2020));
        let schema = SortingSchema::new();

        let mut builder = cache.builder(7, None).unwrap();
        builder.append(100, 5);
        builder.append(50, 5);
        assert!(cache.store(&query, builder.finish(Duration::from_millis(1)), &schema));

        let entry = cache.lookup(7, &query, &schema).unwrap();
        let mut ranker = cache.replay_ranker(entry, &RankerSetup::new(7)).unwrap();
        assert_eq!(
            ranker.collect_all().unwrap(),
            vec![RankedMatch::new(100, 5), RankedMatch::new(50, 5)]
        );

        assert!(cache.lookup(8, &query, &schema).is_none());
        assert!(cache.lookup(7, &SearchQuery::new("rust cache"), &schema).is_none());
    }

    #[test]
    fn test_store_respects_threshold() {
        let cache = SearchCache::new(QcacheConfig::default().with_threshold_ms(50));
        let query = SearchQuery::new("fast");
        let schema = SortingSchema::new();

        let fast = EntryBuilder::new(1).finish(Duration::from_millis(49));
        assert!(!cache.store(&query, fast, &schema));
        assert!(cache.lookup(1, &query, &schema).is_none());

        let slow = EntryBuilder::new(1).finish(Duration::from_millis(50));
        assert!(cache.store(&query, slow, &schema));
        assert!(cache.lookup(1, &query, &schema).is_some());
    }

    #[test]
    fn test_builder_precheck() {
        assert!(SearchCache::new(QcacheConfig::disabled()).builder(1, None).is_none());

        let cache = SearchCache::new(QcacheConfig::default().with_threshold_ms(100));
        assert!(cache.builder(1, None).is_some());
        assert!(cache.builder(1, Some(20)).is_none());
        assert!(cache.builder(1, Some(200)).is_some());
    }

    #[test]
    fn test_search_records_then_replays() {
        let cache = SearchCache::new(eager());
        let query = SearchQuery::new("needle");
        let schema = SortingSchema::new();
        let pairs = [(9, 3), (4, 3), (12, 1)];

        let mut first = cache
            .search(2, &query, &schema, || Ok(VecRanker::from_pairs(pairs)))
            .unwrap();
        let expected: Vec<RankedMatch> = pairs.iter().copied().map(RankedMatch::from).collect();
        assert_eq!(first.collect_all().unwrap(), expected);
        assert_eq!(cache.status().cached_queries, 1);

        let mut second = cache
            .search(2, &query, &schema, || -> Result<VecRanker> {
                panic!("live ranker must not run on a hit")
            })
            .unwrap();
        assert_eq!(second.collect_all().unwrap(), expected);
        assert_eq!(cache.status().hits, 1);
    }

    #[test]
    fn test_abandoned_stream_is_not_cached() {
        let cache = SearchCache::new(eager());
        let query = SearchQuery::new("partial");
        let schema = SortingSchema::new();

        let mut ranker = RecordingRanker::new(
            VecRanker::from_pairs((0..10).map(|d| (d, 1))),
            EntryBuilder::new(1),
            cache.clone(),
            query.clone(),
            schema.clone(),
        );
        ranker.next_match().unwrap();
        assert_eq!(ranker.stored(), None);
        drop(ranker);

        assert!(cache.lookup(1, &query, &schema).is_none());
    }

    #[test]
    fn test_failed_stream_is_not_cached() {
        let cache = SearchCache::new(eager());
        let query = SearchQuery::new("broken");
        let schema = SortingSchema::new();

        let mut ranker = RecordingRanker::new(
            FailingRanker { left: 3 },
            EntryBuilder::new(1),
            cache.clone(),
            query.clone(),
            schema.clone(),
        );
        let mut out = Vec::new();
        assert!(ranker.next_block(&mut out).is_err());
        assert!(ranker.next_match().is_err());
        assert_eq!(ranker.stored(), None);
        assert!(cache.status().cached_queries == 0);
    }

    #[test]
    fn test_recorder_reports_store_outcome() {
        let cache = SearchCache::new(QcacheConfig::default().with_threshold_ms(60_000));
        let mut ranker = RecordingRanker::new(
            VecRanker::from_pairs([(1, 1)]),
            EntryBuilder::new(1),
            cache.clone(),
            SearchQuery::new("quick"),
            SortingSchema::new(),
        );
        let mut out = Vec::new();
        while ranker.next_block(&mut out).unwrap() > 0 {}
        assert_eq!(ranker.stored(), Some(false));
        assert_eq!(out, vec![RankedMatch::new(1, 1)]);
    }

    #[test]
    fn test_invalidate_and_configure() {
        let cache = SearchCache::new(eager());
        let schema = SortingSchema::new();
        for index_id in [1, 1, 2] {
            let query = SearchQuery::new(format!("q{}", cache.status().cached_queries));
            let entry = EntryBuilder::new(index_id).finish(Duration::ZERO);
            assert!(cache.store(&query, entry, &schema));
        }

        assert_eq!(cache.invalidate_index(1), 2);
        assert_eq!(cache.status().cached_queries, 1);

        cache.configure(QcacheConfig::disabled());
        let status = cache.status();
        assert_eq!(status.cached_queries, 0);
        assert_eq!(status.max_bytes, 0);
    }
}
