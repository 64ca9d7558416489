//! Replay of cached match streams through the ranker interface.

use std::sync::Arc;

use log::warn;

use crate::error::{Result, SarissaError};
use crate::qcache::codec::{FRAME_CAPACITY, FrameDecoder};
use crate::qcache::entry::CacheEntry;
use crate::query::ranker::{RankedMatch, Ranker};

/// Per-query context a replay ranker is created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankerSetup {
    /// Index the query runs against.
    pub index_id: i64,
}

impl RankerSetup {
    /// Create a setup for `index_id`.
    pub fn new(index_id: i64) -> Self {
        RankerSetup { index_id }
    }
}

/// A [`Ranker`] that serves a cached entry instead of ranking.
///
/// Frames are decoded one at a time, so at most one frame of matches is
/// buffered regardless of the entry size. The entry itself is only read.
/// A decode failure is sticky: every later pull reports it again.
#[derive(Debug)]
pub struct ReplayRanker {
    entry: Arc<CacheEntry>,
    decoder: FrameDecoder,
    frame: Vec<RankedMatch>,
    frame_pos: usize,
    failure: Option<String>,
}

impl ReplayRanker {
    /// Replay `entry` from its first match.
    pub fn new(entry: Arc<CacheEntry>) -> Self {
        let decoder = entry.decoder();
        ReplayRanker {
            entry,
            decoder,
            frame: Vec::with_capacity(FRAME_CAPACITY),
            frame_pos: 0,
            failure: None,
        }
    }

    /// Create a replay ranker after checking it matches the query setup.
    pub fn with_setup(entry: Arc<CacheEntry>, setup: &RankerSetup) -> Result<Self> {
        if entry.index_id() != setup.index_id {
            return Err(SarissaError::invalid_operation(format!(
                "cached entry belongs to index {}, query runs against index {}",
                entry.index_id(),
                setup.index_id
            )));
        }
        Ok(Self::new(entry))
    }

    /// The entry being replayed.
    pub fn entry(&self) -> &Arc<CacheEntry> {
        &self.entry
    }

    /// Matches not yet handed out.
    pub fn remaining(&self) -> usize {
        self.decoder.remaining() + (self.frame.len() - self.frame_pos)
    }

    fn check_failed(&self) -> Result<()> {
        match &self.failure {
            Some(msg) => Err(SarissaError::corrupt(msg.clone())),
            None => Ok(()),
        }
    }

    /// Decode the next frame into `out`, latching any failure.
    fn decode_into(&mut self, out: &mut Vec<RankedMatch>) -> Result<usize> {
        let (data, weights) = self.entry.payload();
        match self.decoder.decode_frame(data, weights, out) {
            Ok(n) => Ok(n),
            Err(e) => {
                warn!(
                    "qcache entry {:#018x} of index {} failed to decode: {e}",
                    self.entry.cache_key(),
                    self.entry.index_id()
                );
                let msg = match &e {
                    SarissaError::Corrupt(msg) => msg.clone(),
                    other => other.to_string(),
                };
                self.failure = Some(msg);
                Err(e)
            }
        }
    }
}

impl Ranker for ReplayRanker {
    fn next_match(&mut self) -> Result<Option<RankedMatch>> {
        self.check_failed()?;

        if self.frame_pos == self.frame.len() {
            let mut frame = std::mem::take(&mut self.frame);
            frame.clear();
            self.frame_pos = 0;
            let decoded = self.decode_into(&mut frame);
            self.frame = frame;
            if decoded? == 0 {
                return Ok(None);
            }
        }

        let m = self.frame[self.frame_pos];
        self.frame_pos += 1;
        Ok(Some(m))
    }

    /// Hands out one frame per call (or the rest of a partly consumed one).
    fn next_block(&mut self, out: &mut Vec<RankedMatch>) -> Result<usize> {
        self.check_failed()?;

        if self.frame_pos < self.frame.len() {
            let rest = &self.frame[self.frame_pos..];
            out.extend_from_slice(rest);
            let n = rest.len();
            self.frame_pos = self.frame.len();
            return Ok(n);
        }

        self.decode_into(out)
    }
}
