//! Query result cache.
//!
//! Remembers the ranked match stream of expensive queries in a compact
//! frame encoding and replays it for later identical queries. The cache is
//! bounded by a byte budget with LRU eviction, expires entries after a TTL,
//! and can drop everything that belongs to a rebuilt index.

pub mod admission;
pub mod codec;
pub mod config;
pub mod entry;
pub mod fingerprint;
pub mod replay;
pub mod service;
pub mod stats;
pub mod table;

pub use self::admission::AdmissionPolicy;
pub use self::codec::{EncodedMatches, FRAME_CAPACITY, FrameDecoder, FrameEncoder};
pub use self::config::QcacheConfig;
pub use self::entry::{CacheEntry, EntryBuilder};
pub use self::fingerprint::Fingerprint;
pub use self::replay::{RankerSetup, ReplayRanker};
pub use self::service::{RecordingRanker, SearchCache};
pub use self::stats::QcacheStatus;
pub use self::table::QueryCache;
