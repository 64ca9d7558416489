//! Query fingerprints.
//!
//! A fingerprint is the 64-bit lookup key of a query together with the
//! ordered hashes of its filters. The key covers the index, query text,
//! options, filters and sorting schema. The filter hashes are also stored
//! next to the entry and compared on lookup, so a key collision between
//! queries with different filters still misses.

use std::hash::{BuildHasher, Hash, Hasher};

use ahash::RandomState;

use crate::query::filter::Filter;
use crate::query::query::{QueryOptions, SearchQuery};

// Fixed seeds keep fingerprints stable for the whole process lifetime.
const SEEDS: [u64; 4] = [
    0x243f_6a88_85a3_08d3,
    0x1319_8a2e_0370_7344,
    0xa409_3822_299f_31d0,
    0x082e_fa98_ec4e_6c89,
];

/// Hasher factory used for every cache-related hash.
pub(crate) fn hash_state() -> RandomState {
    RandomState::with_seeds(SEEDS[0], SEEDS[1], SEEDS[2], SEEDS[3])
}

/// Lookup identity of a query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    /// Primary lookup key.
    pub key: u64,
    /// One hash per applied filter, in application order.
    pub filter_hashes: Vec<u64>,
}

impl Fingerprint {
    /// Fingerprint `query` against `index_id` under the given schema signature.
    pub fn compute(index_id: i64, query: &SearchQuery, schema_signature: u64) -> Self {
        Self::from_parts(
            index_id,
            &query.text,
            &query.options,
            &query.filters,
            schema_signature,
        )
    }

    /// Fingerprint from individual query components.
    pub fn from_parts(
        index_id: i64,
        text: &str,
        options: &QueryOptions,
        filters: &[Filter],
        schema_signature: u64,
    ) -> Self {
        let state = hash_state();
        let filter_hashes: Vec<u64> = filters.iter().map(|f| state.hash_one(f)).collect();

        let mut hasher = state.build_hasher();
        index_id.hash(&mut hasher);
        text.hash(&mut hasher);
        options.hash(&mut hasher);
        filter_hashes.hash(&mut hasher);
        schema_signature.hash(&mut hasher);
        let key = hasher.finish();

        Fingerprint { key, filter_hashes }
    }
}
