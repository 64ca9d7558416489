use std::sync::Arc;
use std::time::Duration;

use sarissa_qcache::error::Result;
use sarissa_qcache::qcache::{
    CacheEntry, EntryBuilder, Fingerprint, QcacheConfig, QueryCache, RankerSetup, ReplayRanker,
    SearchCache,
};
use sarissa_qcache::query::{
    ColumnKind, Filter, QueryOptions, RankedMatch, Ranker, RankingMode, SearchQuery,
    SortingSchema, VecRanker,
};

fn entry_for(index_id: i64, fingerprint: Fingerprint, pairs: &[(u64, u32)]) -> CacheEntry {
    let mut builder = EntryBuilder::new(index_id);
    for &(doc_id, weight) in pairs {
        builder.append(doc_id, weight);
    }
    builder
        .finish(Duration::from_millis(10))
        .with_fingerprint(fingerprint)
}

fn matches(pairs: &[(u64, u32)]) -> Vec<RankedMatch> {
    pairs.iter().copied().map(RankedMatch::from).collect()
}

fn replay(entry: Arc<CacheEntry>) -> Result<Vec<RankedMatch>> {
    ReplayRanker::new(entry).collect_all()
}

#[test]
fn cached_result_replays_exactly_and_respects_filters_and_invalidation() -> Result<()> {
    let cache = QueryCache::new(QcacheConfig::default());
    let k1 = 0x1234_5678_9abc_def0;
    let (h1, h2) = (11, 22);
    let pairs = [(100, 5), (50, 5), (200, 9)];

    assert!(cache.add(entry_for(
        7,
        Fingerprint {
            key: k1,
            filter_hashes: vec![h1, h2],
        },
        &pairs,
    )));

    let entry = cache.find(7, k1, &[h1, h2]).expect("expected a hit");
    assert_eq!(replay(entry)?, matches(&pairs));

    assert!(cache.find(7, k1, &[h1]).is_none());
    assert!(cache.find(7, k1, &[h2, h1]).is_none());

    assert_eq!(cache.delete_for_index(7), 1);
    assert!(cache.find(7, k1, &[h1, h2]).is_none());
    Ok(())
}

#[test]
fn least_recently_used_entry_is_evicted_first() {
    let probe = entry_for(1, Fingerprint { key: 0, filter_hashes: vec![] }, &[(1, 1), (2, 2)]);
    let budget = probe.size_bytes() as i64 * 3;
    let cache = QueryCache::new(QcacheConfig::default().with_max_bytes(budget));

    let add = |key: u64| {
        assert!(cache.add(entry_for(
            1,
            Fingerprint { key, filter_hashes: vec![] },
            &[(1, 1), (2, 2)],
        )));
    };

    add(0xA);
    add(0xB);
    add(0xC);
    assert!(cache.find(1, 0xA, &[]).is_some());
    add(0xD);

    assert!(cache.find(1, 0xB, &[]).is_none());
    assert!(cache.find(1, 0xA, &[]).is_some());
    assert!(cache.find(1, 0xC, &[]).is_some());
    assert!(cache.find(1, 0xD, &[]).is_some());
}

#[test]
fn used_bytes_tracks_held_entries_and_stays_within_budget() {
    let budget = 4096;
    let cache = QueryCache::new(QcacheConfig::default().with_max_bytes(budget));

    for key in 0..200u64 {
        let pairs: Vec<(u64, u32)> = (0..(key % 40) * 5)
            .map(|d| (d * 13 % 101, (d % 9) as u32))
            .collect();
        let fingerprint = Fingerprint {
            key: key % 50,
            filter_hashes: vec![key],
        };
        cache.add(entry_for((key % 3) as i64, fingerprint, &pairs));
        if key % 17 == 0 {
            cache.delete_for_index((key % 3) as i64);
        }

        let held: usize = cache.entries().iter().map(|e| e.size_bytes()).sum();
        let status = cache.stats();
        assert_eq!(status.used_bytes, held as u64);
        assert_eq!(status.cached_queries, cache.entries().len() as u64);
        assert!(status.used_bytes <= budget as u64);
    }
}

#[test]
fn oversized_entry_is_rejected_and_nothing_is_evicted() {
    let cache = QueryCache::new(QcacheConfig::default().with_max_bytes(1024));
    assert!(cache.add(entry_for(1, Fingerprint { key: 1, filter_hashes: vec![] }, &[(1, 1)])));

    let huge: Vec<(u64, u32)> = (0..5000).map(|d| (d * 1000, d as u32)).collect();
    assert!(!cache.add(entry_for(1, Fingerprint { key: 2, filter_hashes: vec![] }, &huge)));

    assert!(cache.find(1, 1, &[]).is_some());
    assert_eq!(cache.stats().rejected, 1);
}

#[test]
fn expired_entry_misses_and_is_removed() {
    let ttl = 10;
    let cache = QueryCache::new(QcacheConfig::default().with_ttl_secs(ttl));
    assert!(cache.add(entry_for(1, Fingerprint { key: 5, filter_hashes: vec![] }, &[(3, 3)])));

    let built = cache.entries()[0].built_at();
    let later = built + chrono::Duration::seconds(ttl + 1);
    assert!(cache.find_at(1, 5, &[], later).is_none());
    assert!(cache.is_empty());
    assert_eq!(cache.stats().used_bytes, 0);
}

#[test]
fn entry_expires_before_the_next_whole_second() {
    let cache = QueryCache::new(QcacheConfig::default().with_ttl_secs(10));
    assert!(cache.add(entry_for(1, Fingerprint { key: 5, filter_hashes: vec![] }, &[(3, 3)])));

    let built = cache.entries()[0].built_at();
    assert!(cache.find_at(1, 5, &[], built + chrono::Duration::seconds(10)).is_some());
    assert!(cache.find_at(1, 5, &[], built + chrono::Duration::milliseconds(10_900)).is_none());
    assert!(cache.is_empty());
}

#[test]
fn invalidating_one_index_leaves_others_untouched() -> Result<()> {
    let cache = SearchCache::new(QcacheConfig::default().with_threshold_ms(0));
    let schema = SortingSchema::new().with_column("price", ColumnKind::Float);
    let query = SearchQuery::new("shared query");

    for index_id in [1, 2, 3] {
        let mut builder = cache.builder(index_id, None).expect("cache enabled");
        builder.append(index_id as u64, 1);
        assert!(cache.store(&query, builder.finish(Duration::ZERO), &schema));
    }

    assert_eq!(cache.invalidate_index(2), 1);
    assert!(cache.lookup(2, &query, &schema).is_none());

    for index_id in [1, 3] {
        let entry = cache.lookup(index_id, &query, &schema).expect("expected a hit");
        let mut ranker = cache.replay_ranker(entry, &RankerSetup::new(index_id))?;
        assert_eq!(ranker.collect_all()?, vec![RankedMatch::new(index_id as u64, 1)]);
    }
    Ok(())
}

#[test]
fn filter_variants_of_one_query_are_cached_side_by_side() -> Result<()> {
    let cache = SearchCache::new(QcacheConfig::default().with_threshold_ms(0));
    let schema = SortingSchema::new();
    let plain = SearchQuery::new("laptop");
    let cheap = plain.clone().with_filter(Filter::range("price", 0, 500));
    let pricey = plain.clone().with_filter(Filter::range("price", 500, 1000));

    let mut ranker = cache.search(1, &cheap, &schema, || {
        Ok(VecRanker::from_pairs([(10, 3), (11, 2)]))
    })?;
    ranker.collect_all()?;
    let mut ranker = cache.search(1, &pricey, &schema, || {
        Ok(VecRanker::from_pairs([(20, 7)]))
    })?;
    ranker.collect_all()?;

    assert_eq!(cache.status().cached_queries, 2);
    assert!(cache.lookup(1, &plain, &schema).is_none());

    let entry = cache.lookup(1, &cheap, &schema).expect("cheap variant cached");
    assert_eq!(replay(entry)?, matches(&[(10, 3), (11, 2)]));
    let entry = cache.lookup(1, &pricey, &schema).expect("pricey variant cached");
    assert_eq!(replay(entry)?, matches(&[(20, 7)]));
    Ok(())
}

#[test]
fn empty_result_is_a_valid_hit() -> Result<()> {
    let cache = SearchCache::new(QcacheConfig::default().with_threshold_ms(0));
    let schema = SortingSchema::new();
    let query = SearchQuery::new("no such term");

    let mut first = cache.search(4, &query, &schema, || Ok(VecRanker::new(Vec::new())))?;
    assert!(first.collect_all()?.is_empty());

    let entry = cache.lookup(4, &query, &schema).expect("empty result should be cached");
    assert_eq!(entry.total_matches(), 0);
    assert!(replay(entry)?.is_empty());
    Ok(())
}

#[test]
fn options_and_schema_are_part_of_the_identity() -> Result<()> {
    let cache = SearchCache::new(QcacheConfig::default().with_threshold_ms(0));
    let schema = SortingSchema::new();
    let query = SearchQuery::new("rust");

    let mut ranker = cache.search(1, &query, &schema, || Ok(VecRanker::from_pairs([(1, 1)])))?;
    ranker.collect_all()?;

    let reranked = query
        .clone()
        .with_options(QueryOptions::new().with_ranking(RankingMode::WordCount));
    assert!(cache.lookup(1, &reranked, &schema).is_none());

    let other_schema = SortingSchema::new().with_expr("score2", ColumnKind::Float, "weight()*2");
    assert!(cache.lookup(1, &query, &other_schema).is_none());
    assert!(cache.lookup(1, &query, &schema).is_some());
    Ok(())
}

#[test]
fn disabled_cache_stores_nothing() -> Result<()> {
    let cache = SearchCache::new(QcacheConfig::default().with_max_bytes(0).with_threshold_ms(0));
    let schema = SortingSchema::new();
    let query = SearchQuery::new("anything");

    assert!(cache.builder(1, None).is_none());
    assert!(!cache.store(&query, EntryBuilder::new(1).finish(Duration::from_secs(10)), &schema));

    let mut ranker = cache.search(1, &query, &schema, || Ok(VecRanker::from_pairs([(1, 1)])))?;
    assert_eq!(ranker.collect_all()?, vec![RankedMatch::new(1, 1)]);
    assert!(cache.lookup(1, &query, &schema).is_none());
    assert_eq!(cache.status().cached_queries, 0);
    Ok(())
}

#[test]
fn large_unsorted_stream_survives_the_round_trip() -> Result<()> {
    let pairs: Vec<(u64, u32)> = (0..10_000u64)
        .map(|i| {
            let doc_id = if i % 2 == 0 { u64::MAX - i * 31 } else { i * 7 };
            (doc_id, ((i * i) % 251) as u32)
        })
        .collect();

    let entry = Arc::new(entry_for(1, Fingerprint { key: 1, filter_hashes: vec![] }, &pairs));
    assert_eq!(entry.total_matches(), pairs.len());
    assert!(entry.weights_len() <= 251);
    assert_eq!(replay(entry)?, matches(&pairs));
    Ok(())
}
