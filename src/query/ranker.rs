//! Pull-based ranker interface shared by live ranking and cache replay.

use std::fmt::Debug;

use crate::error::Result;

/// Largest number of matches a ranker hands out per block.
pub const MAX_BLOCK_MATCHES: usize = 32;

/// A single ranked match: a document and the weight the ranker assigned.
///
/// Both values are opaque to the cache; it only stores and replays them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RankedMatch {
    /// Document ID.
    pub doc_id: u64,
    /// Ranker weight.
    pub weight: u32,
}

impl RankedMatch {
    /// Create a new ranked match.
    pub fn new(doc_id: u64, weight: u32) -> Self {
        RankedMatch { doc_id, weight }
    }
}

impl From<(u64, u32)> for RankedMatch {
    fn from((doc_id, weight): (u64, u32)) -> Self {
        RankedMatch { doc_id, weight }
    }
}

/// Trait for match producers consumed by the result sorter.
///
/// Consumers pull until `next_match` returns `Ok(None)`. Stopping early is
/// always allowed; dropping the ranker releases everything it holds.
pub trait Ranker: Send + Debug {
    /// Produce the next match, or `None` once exhausted.
    fn next_match(&mut self) -> Result<Option<RankedMatch>>;

    /// Append up to [`MAX_BLOCK_MATCHES`] matches to `out`.
    ///
    /// Returns how many were appended; zero means the ranker is exhausted.
    fn next_block(&mut self, out: &mut Vec<RankedMatch>) -> Result<usize> {
        let mut produced = 0;
        while produced < MAX_BLOCK_MATCHES {
            match self.next_match()? {
                Some(m) => {
                    out.push(m);
                    produced += 1;
                }
                None => break,
            }
        }
        Ok(produced)
    }

    /// Drain every remaining match.
    fn collect_all(&mut self) -> Result<Vec<RankedMatch>> {
        let mut out = Vec::new();
        while self.next_block(&mut out)? > 0 {}
        Ok(out)
    }
}

impl<R: Ranker + ?Sized> Ranker for Box<R> {
    fn next_match(&mut self) -> Result<Option<RankedMatch>> {
        (**self).next_match()
    }

    fn next_block(&mut self, out: &mut Vec<RankedMatch>) -> Result<usize> {
        (**self).next_block(out)
    }
}

/// A ranker that produces no matches.
#[derive(Debug, Default)]
pub struct EmptyRanker;

impl EmptyRanker {
    /// Create a new empty ranker.
    pub fn new() -> Self {
        EmptyRanker
    }
}

impl Ranker for EmptyRanker {
    fn next_match(&mut self) -> Result<Option<RankedMatch>> {
        Ok(None)
    }
}

/// A ranker over matches that were computed up front.
#[derive(Debug, Clone)]
pub struct VecRanker {
    matches: Vec<RankedMatch>,
    pos: usize,
}

impl VecRanker {
    /// Create a ranker yielding `matches` in order.
    pub fn new(matches: Vec<RankedMatch>) -> Self {
        VecRanker { matches, pos: 0 }
    }

    /// Create a ranker from `(doc_id, weight)` pairs.
    pub fn from_pairs<I: IntoIterator<Item = (u64, u32)>>(pairs: I) -> Self {
        Self::new(pairs.into_iter().map(RankedMatch::from).collect())
    }

    /// Number of matches not yet produced.
    pub fn remaining(&self) -> usize {
        self.matches.len() - self.pos
    }
}

impl Ranker for VecRanker {
    fn next_match(&mut self) -> Result<Option<RankedMatch>> {
        let next = self.matches.get(self.pos).copied();
        if next.is_some() {
            self.pos += 1;
        }
        Ok(next)
    }
}
