//! Command implementations for the qcache CLI.

use std::time::{Duration, Instant};

use anyhow::Context;
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::error::{Result, SarissaError};
use crate::qcache::config::QcacheConfig;
use crate::qcache::replay::RankerSetup;
use crate::qcache::service::{RecordingRanker, SearchCache};
use crate::query::filter::Filter;
use crate::query::query::SearchQuery;
use crate::query::ranker::{RankedMatch, Ranker, VecRanker};
use crate::query::schema::{ColumnKind, SortingSchema};

/// Execute a CLI command.
pub fn execute_command(args: QcacheArgs) -> Result<()> {
    match &args.command {
        Command::Config(config_args) => show_config(config_args.clone(), &args),
        Command::Simulate(simulate_args) => run_simulation(simulate_args.clone(), &args),
    }
}

/// Resolve the cache configuration from file and flags.
pub fn resolve_config(args: &ConfigArgs) -> Result<QcacheConfig> {
    let mut config = match &args.config {
        Some(path) => {
            debug!("Loading qcache config from {}", path.display());
            QcacheConfig::from_json_file(path)?
        }
        None => QcacheConfig::default(),
    };

    if let Some(max_bytes) = args.max_bytes {
        config.max_bytes = max_bytes;
    }
    if let Some(threshold_ms) = args.threshold_ms {
        config.threshold_ms = threshold_ms;
    }
    if let Some(ttl_secs) = args.ttl_secs {
        config.ttl_secs = ttl_secs;
    }

    config.validate()?;
    Ok(config)
}

/// Print the effective configuration after file and flag overrides.
///
/// The tool holds no long-lived cache, so there are no counters to show
/// here; `simulate` reports them for the cache it drives.
fn show_config(args: ShowConfigArgs, cli_args: &QcacheArgs) -> Result<()> {
    let config = resolve_config(&args.config)?;
    output_result("Effective query cache configuration", &config, cli_args)
}

fn build_pool(threads: usize) -> Result<rayon::ThreadPool> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .with_context(|| format!("failed to build a pool of {threads} simulation threads"))?;
    Ok(pool)
}

/// Outcome of one simulated query.
#[derive(Debug, Clone, Copy, Default)]
struct QueryOutcome {
    hit: bool,
    mismatch: bool,
}

/// Deterministic stand-in for the live ranking pipeline.
fn live_matches(seed: u64, query_id: u64, max_matches: usize) -> Vec<RankedMatch> {
    let mut rng = StdRng::seed_from_u64(seed ^ query_id.wrapping_mul(0x9e37_79b9_7f4a_7c15));
    let count = rng.random_range(0..=max_matches);
    (0..count)
        .map(|_| RankedMatch::new(rng.random_range(0..1_000_000u64), rng.random_range(1000..1100u32)))
        .collect()
}

fn workload_query(query_id: u64) -> SearchQuery {
    let mut query = SearchQuery::new(format!("term{} term{}", query_id % 97, query_id));
    if query_id % 3 == 0 {
        query = query.with_filter(Filter::range("year", 2000, 2000 + (query_id % 20) as i64));
    }
    query
}

fn run_query(
    cache: &SearchCache,
    schema: &SortingSchema,
    args: &SimulateArgs,
    step: usize,
) -> Result<QueryOutcome> {
    let mut rng = StdRng::seed_from_u64(args.seed.wrapping_add(step as u64));
    let query_id = rng.random_range(0..args.distinct.max(1));
    let index_id = (query_id % args.indexes.max(1)) as i64;
    let query = workload_query(query_id);
    let expected = live_matches(args.seed, query_id, args.max_matches);

    if args.invalidate_every > 0 && step > 0 && step % args.invalidate_every == 0 {
        let victim = ((step / args.invalidate_every) as u64 % args.indexes.max(1)) as i64;
        cache.invalidate_index(victim);
    }

    if let Some(entry) = cache.lookup(index_id, &query, schema) {
        let mut ranker = cache.replay_ranker(entry, &RankerSetup::new(index_id))?;
        let replayed = ranker.collect_all()?;
        return Ok(QueryOutcome {
            hit: true,
            mismatch: replayed != expected,
        });
    }

    let live = VecRanker::new(expected.clone());
    let produced = match cache.builder(index_id, None) {
        Some(builder) => {
            let mut ranker =
                RecordingRanker::new(live, builder, cache.clone(), query, schema.clone());
            ranker.collect_all()?
        }
        None => VecRanker::new(expected.clone()).collect_all()?,
    };

    Ok(QueryOutcome {
        hit: false,
        mismatch: produced != expected,
    })
}

/// Run a synthetic multi-threaded workload and report cache behaviour.
fn run_simulation(args: SimulateArgs, cli_args: &QcacheArgs) -> Result<()> {
    let config = resolve_config(&args.config)?;
    let threads = args.threads.unwrap_or_else(num_cpus::get).max(1);
    let cache = SearchCache::new(config);
    let schema = SortingSchema::new()
        .with_column("weight", ColumnKind::Integer)
        .with_column("year", ColumnKind::Integer);

    if cli_args.verbosity() > 1 {
        println!(
            "Simulating {} queries ({} distinct) on {threads} threads",
            args.queries, args.distinct
        );
    }

    let pool = build_pool(threads)?;

    let start = Instant::now();
    let outcomes = pool.install(|| {
        (0..args.queries)
            .into_par_iter()
            .map(|step| run_query(&cache, &schema, &args, step))
            .collect::<Result<Vec<_>>>()
    })?;
    let duration = start.elapsed();

    let hits = outcomes.iter().filter(|o| o.hit).count();
    let mismatches = outcomes.iter().filter(|o| o.mismatch).count();
    info!("Simulation finished: {hits} hits, {mismatches} mismatches in {duration:?}");

    let report = SimulationReport {
        queries: args.queries,
        threads,
        hits,
        misses: args.queries - hits,
        mismatches,
        duration_ms: duration.as_millis() as u64,
        queries_per_second: queries_per_second(args.queries, duration),
        status: cache.status(),
    };

    output_result("Simulation completed", &report, cli_args)?;

    if mismatches > 0 {
        return Err(SarissaError::other(format!(
            "{mismatches} replayed results differed from live ranking"
        )));
    }
    Ok(())
}

fn queries_per_second(queries: usize, duration: Duration) -> f64 {
    let secs = duration.as_secs_f64();
    if secs > 0.0 { queries as f64 / secs } else { 0.0 }
}
