use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use sarissa_qcache::error::Result;
use sarissa_qcache::qcache::{QcacheConfig, RankerSetup, SearchCache};
use sarissa_qcache::query::{RankedMatch, Ranker, SearchQuery, SortingSchema, VecRanker};

fn expected_matches(query_id: u64) -> Vec<RankedMatch> {
    (0..(query_id % 7) * 20)
        .map(|i| RankedMatch::new(query_id * 1000 + i, (i % 5) as u32))
        .collect()
}

#[test]
fn concurrent_lookups_always_see_complete_results() -> Result<()> {
    let cache = SearchCache::new(
        QcacheConfig::default()
            .with_max_bytes(64 * 1024)
            .with_threshold_ms(0),
    );
    let schema = SortingSchema::new();
    let stop = Arc::new(AtomicBool::new(false));

    let invalidator = {
        let cache = cache.clone();
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut round = 0i64;
            while !stop.load(Ordering::Relaxed) {
                cache.invalidate_index(round % 4);
                round += 1;
                thread::yield_now();
            }
        })
    };

    let workers: Vec<_> = (0..8u64)
        .map(|worker| {
            let cache = cache.clone();
            let schema = schema.clone();
            thread::spawn(move || -> Result<usize> {
                let mut hits = 0;
                for step in 0..500u64 {
                    let query_id = (worker * 31 + step) % 40;
                    let index_id = (query_id % 4) as i64;
                    let query = SearchQuery::new(format!("q{query_id}"));

                    let replayed = match cache.lookup(index_id, &query, &schema) {
                        Some(entry) => {
                            hits += 1;
                            let setup = RankerSetup::new(index_id);
                            cache.replay_ranker(entry, &setup)?.collect_all()?
                        }
                        None => {
                            let mut ranker = cache.search(index_id, &query, &schema, || {
                                Ok(VecRanker::new(expected_matches(query_id)))
                            })?;
                            ranker.collect_all()?
                        }
                    };
                    assert_eq!(replayed, expected_matches(query_id));
                }
                Ok(hits)
            })
        })
        .collect();

    let mut hits = 0;
    for worker in workers {
        hits += worker.join().expect("worker panicked")?;
    }
    stop.store(true, Ordering::Relaxed);
    invalidator.join().expect("invalidator panicked");

    let status = cache.status();
    assert!(hits > 0);
    assert!(status.used_bytes <= 64 * 1024);
    let held: usize = cache.table().entries().iter().map(|e| e.size_bytes()).sum();
    assert_eq!(status.used_bytes, held as u64);
    Ok(())
}

#[test]
fn reconfiguring_under_load_keeps_the_budget() {
    let cache = SearchCache::new(QcacheConfig::default().with_threshold_ms(0));
    let schema = SortingSchema::new();

    let writers: Vec<_> = (0..4u64)
        .map(|worker| {
            let cache = cache.clone();
            let schema = schema.clone();
            thread::spawn(move || {
                for step in 0..200u64 {
                    let query = SearchQuery::new(format!("w{worker}s{step}"));
                    if let Ok(mut ranker) = cache.search(1, &query, &schema, || {
                        Ok(VecRanker::from_pairs((0..50).map(|d| (d, 1))))
                    }) {
                        let _ = ranker.collect_all();
                    }
                }
            })
        })
        .collect();

    for budget in [4096, 1 << 20, 2048, 0, 8192] {
        cache.configure(QcacheConfig::default().with_max_bytes(budget).with_threshold_ms(0));
        let status = cache.status();
        if budget > 0 {
            assert!(status.used_bytes <= budget as u64);
        }
        thread::yield_now();
    }

    for writer in writers {
        writer.join().expect("writer panicked");
    }

    let status = cache.status();
    assert!(status.used_bytes <= 8192);
    assert_eq!(status.max_bytes, 8192);
}
