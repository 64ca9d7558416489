//! Query-side collaborators of the cache.
//!
//! The cache does not parse or execute queries. It only needs enough of a
//! query to fingerprint it, and a pull-based ranker interface so a cached
//! result can stand in for a live one.

pub mod filter;
#[allow(clippy::module_inception)]
pub mod query;
pub mod ranker;
pub mod schema;

pub use self::filter::Filter;
pub use self::query::{QueryOptions, RankingMode, SearchQuery};
pub use self::ranker::{EmptyRanker, MAX_BLOCK_MATCHES, RankedMatch, Ranker, VecRanker};
pub use self::schema::{ColumnKind, SchemaColumn, SortingSchema};
