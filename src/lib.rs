//! # Sarissa Qcache
//!
//! The query result cache of the Sarissa full-text search engine.
//!
//! ## Features
//!
//! - Compact frame encoding of ranked match streams
//! - Byte-budgeted LRU table shared across worker threads
//! - Fingerprints with a filter-hash collision check
//! - TTL expiry and per-index invalidation
//! - Replay through the same pull-based ranker interface as live ranking

pub mod cli;
pub mod error;
pub mod qcache;
pub mod query;
pub mod util;

pub mod prelude {
    pub use crate::error::{Result, SarissaError};
    pub use crate::qcache::{
        CacheEntry, EntryBuilder, Fingerprint, QcacheConfig, QcacheStatus, QueryCache,
        RankerSetup, ReplayRanker, SearchCache,
    };
    pub use crate::query::{Filter, QueryOptions, RankedMatch, Ranker, SearchQuery, SortingSchema};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
