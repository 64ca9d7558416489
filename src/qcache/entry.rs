//! Cache entries and their builder.
//!
//! An [`EntryBuilder`] is owned by the single thread that runs the query.
//! [`EntryBuilder::finish`] turns it into a [`CacheEntry`] whose payload can
//! no longer change; from then on the entry is only ever read, so it can be
//! shared through an `Arc` without further locking.

use std::mem;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::qcache::codec::{EncodedMatches, FrameDecoder, FrameEncoder};
use crate::qcache::fingerprint::Fingerprint;
use crate::query::ranker::RankedMatch;

/// Accumulates the match stream of a running query.
#[derive(Debug)]
pub struct EntryBuilder {
    index_id: i64,
    encoder: FrameEncoder,
}

impl EntryBuilder {
    /// Start building an entry for `index_id`.
    pub fn new(index_id: i64) -> Self {
        EntryBuilder {
            index_id,
            encoder: FrameEncoder::new(),
        }
    }

    /// Index the entry is built against.
    pub fn index_id(&self) -> i64 {
        self.index_id
    }

    /// Record one match, in the order the ranker produced it.
    pub fn append(&mut self, doc_id: u64, weight: u32) {
        self.encoder.append(doc_id, weight);
    }

    /// Record a ranked match.
    pub fn push(&mut self, m: RankedMatch) {
        self.encoder.append(m.doc_id, m.weight);
    }

    /// Matches recorded so far.
    pub fn len(&self) -> usize {
        self.encoder.len()
    }

    /// Whether no match has been recorded.
    pub fn is_empty(&self) -> bool {
        self.encoder.is_empty()
    }

    /// Seal the entry. `elapsed` is how long the original query took.
    pub fn finish(self, elapsed: Duration) -> CacheEntry {
        let EncodedMatches {
            data,
            weights,
            total_matches,
        } = self.encoder.finish();
        CacheEntry {
            index_id: self.index_id,
            built_at: Utc::now(),
            elapsed_ms: u32::try_from(elapsed.as_millis()).unwrap_or(u32::MAX),
            filter_hashes: Vec::new(),
            cache_key: 0,
            total_matches,
            data: data.into_boxed_slice(),
            weights: weights.into_boxed_slice(),
        }
    }
}

/// A sealed, read-only cached match stream plus its metadata.
#[derive(Debug)]
pub struct CacheEntry {
    index_id: i64,
    built_at: DateTime<Utc>,
    elapsed_ms: u32,
    filter_hashes: Vec<u64>,
    cache_key: u64,
    total_matches: usize,
    data: Box<[u8]>,
    weights: Box<[u32]>,
}

impl CacheEntry {
    /// Index this entry was built against.
    pub fn index_id(&self) -> i64 {
        self.index_id
    }

    /// When the entry was sealed.
    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Wall time of the query that produced the entry.
    pub fn elapsed_ms(&self) -> u32 {
        self.elapsed_ms
    }

    /// Hashes of the filters of the original query, in application order.
    pub fn filter_hashes(&self) -> &[u64] {
        &self.filter_hashes
    }

    /// Fingerprint key the entry is stored under.
    pub fn cache_key(&self) -> u64 {
        self.cache_key
    }

    /// Number of cached matches.
    pub fn total_matches(&self) -> usize {
        self.total_matches
    }

    /// Number of distinct weights.
    pub fn weights_len(&self) -> usize {
        self.weights.len()
    }

    /// Size of the encoded frames.
    pub fn compressed_len(&self) -> usize {
        self.data.len()
    }

    /// Bytes charged against the cache budget for this entry.
    pub fn size_bytes(&self) -> usize {
        mem::size_of::<Self>()
            + self.data.len()
            + self.weights.len() * mem::size_of::<u32>()
            + self.filter_hashes.len() * mem::size_of::<u64>()
    }

    /// Whether the entry is older than `ttl_secs` at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl_secs: i64) -> bool {
        now - self.built_at > chrono::Duration::seconds(ttl_secs)
    }

    /// Decode every match. Mostly useful for diagnostics; replay decodes
    /// frame by frame instead.
    pub fn decode_all(&self) -> Result<Vec<RankedMatch>> {
        let mut decoder = self.decoder();
        let mut out = Vec::with_capacity(self.total_matches);
        while decoder.decode_frame(&self.data, &self.weights, &mut out)? > 0 {}
        Ok(out)
    }

    pub(crate) fn decoder(&self) -> FrameDecoder {
        FrameDecoder::new(self.total_matches)
    }

    pub(crate) fn payload(&self) -> (&[u8], &[u32]) {
        (&self.data, &self.weights)
    }

    /// Attach the lookup identity the entry will be stored under.
    ///
    /// Takes the entry by value: once published behind an `Arc` it can no
    /// longer be re-keyed.
    pub fn with_fingerprint(mut self, fingerprint: Fingerprint) -> Self {
        self.cache_key = fingerprint.key;
        self.filter_hashes = fingerprint.filter_hashes;
        self
    }

    #[cfg(test)]
    pub(crate) fn from_encoded(index_id: i64, encoded: EncodedMatches) -> Self {
        CacheEntry {
            index_id,
            built_at: Utc::now(),
            elapsed_ms: 0,
            filter_hashes: Vec::new(),
            cache_key: 0,
            total_matches: encoded.total_matches,
            data: encoded.data.into_boxed_slice(),
            weights: encoded.weights.into_boxed_slice(),
        }
    }
}
