//! Frame codec for cached match streams.
//!
//! Matches are batched into frames of at most [`FRAME_CAPACITY`] entries.
//! A frame is laid out as
//!
//! ```text
//! varint(count) { varint(zigzag(doc_delta)) varint(weight_index) } * count
//! ```
//!
//! where `doc_delta` is the wrapping difference to the previous document ID
//! of the stream (the first match is relative to zero) and `weight_index`
//! points into a per-stream table of distinct weights. Match order is kept
//! exactly as appended; document IDs need not be sorted, so deltas may be
//! negative.

use ahash::AHashMap;

use crate::error::{Result, SarissaError};
use crate::query::ranker::RankedMatch;
use crate::util::varint::{VarInt, VarIntCursor, zigzag_decode, zigzag_encode};

/// Maximum number of matches per frame.
pub const FRAME_CAPACITY: usize = 32;

/// Output of [`FrameEncoder::finish`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedMatches {
    /// Concatenated frames.
    pub data: Vec<u8>,
    /// Distinct weights, referenced by index from the frames.
    pub weights: Vec<u32>,
    /// Number of matches across all frames.
    pub total_matches: usize,
}

/// Incremental encoder. Only lives while an entry is being built.
#[derive(Debug, Default)]
pub struct FrameEncoder {
    data: Vec<u8>,
    weights: Vec<u32>,
    weight_slots: AHashMap<u32, u32>,
    frame: Vec<(u64, u32)>,
    last_doc_id: u64,
    total_matches: usize,
}

impl FrameEncoder {
    /// Create an empty encoder.
    pub fn new() -> Self {
        FrameEncoder {
            frame: Vec::with_capacity(FRAME_CAPACITY),
            ..Default::default()
        }
    }

    /// Append one match.
    pub fn append(&mut self, doc_id: u64, weight: u32) {
        let delta = doc_id.wrapping_sub(self.last_doc_id) as i64;
        self.last_doc_id = doc_id;

        let next_slot = self.weights.len() as u32;
        let slot = *self.weight_slots.entry(weight).or_insert_with(|| {
            self.weights.push(weight);
            next_slot
        });

        self.frame.push((zigzag_encode(delta), slot));
        self.total_matches += 1;

        if self.frame.len() == FRAME_CAPACITY {
            self.flush_frame();
        }
    }

    /// Serialize the pending frame, if any, and start a new one.
    pub fn flush_frame(&mut self) {
        if self.frame.is_empty() {
            return;
        }

        (self.frame.len() as u32).put_varint(&mut self.data);
        for (delta, slot) in self.frame.drain(..) {
            delta.put_varint(&mut self.data);
            slot.put_varint(&mut self.data);
        }
    }

    /// Number of matches appended so far.
    pub fn len(&self) -> usize {
        self.total_matches
    }

    /// Whether nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.total_matches == 0
    }

    /// Bytes produced so far, not counting the pending frame.
    pub fn encoded_len(&self) -> usize {
        self.data.len()
    }

    /// Flush the trailing frame and hand over the encoded stream.
    pub fn finish(mut self) -> EncodedMatches {
        self.flush_frame();
        self.data.shrink_to_fit();
        self.weights.shrink_to_fit();

        EncodedMatches {
            data: self.data,
            weights: self.weights,
            total_matches: self.total_matches,
        }
    }
}

/// Frame-at-a-time decoder state.
///
/// The decoder does not borrow the encoded stream; callers pass the bytes
/// and weight table on every call so the state can sit next to a shared
/// owner of the data.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    pos: usize,
    last_doc_id: u64,
    remaining: usize,
}

impl FrameDecoder {
    /// Create a decoder expecting `total_matches` matches.
    pub fn new(total_matches: usize) -> Self {
        FrameDecoder {
            pos: 0,
            last_doc_id: 0,
            remaining: total_matches,
        }
    }

    /// Matches not yet decoded.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Decode the next frame into `out`.
    ///
    /// Returns the number of matches appended, or zero once the stream is
    /// fully consumed. Any inconsistency between the frames, the weight
    /// table and the expected match count is reported as corruption; on
    /// error nothing is appended to `out`.
    pub fn decode_frame(
        &mut self,
        data: &[u8],
        weights: &[u32],
        out: &mut Vec<RankedMatch>,
    ) -> Result<usize> {
        if self.pos >= data.len() {
            if self.remaining != 0 {
                return Err(SarissaError::corrupt(format!(
                    "stream ended with {} matches missing",
                    self.remaining
                )));
            }
            return Ok(0);
        }
        if self.remaining == 0 {
            return Err(SarissaError::corrupt(format!(
                "{} trailing bytes after last frame",
                data.len() - self.pos
            )));
        }

        let mut cursor = VarIntCursor::new(&data[self.pos..]);
        let count = cursor.read::<u32>()? as usize;
        if count == 0 || count > FRAME_CAPACITY || count > self.remaining {
            return Err(SarissaError::corrupt(format!(
                "frame count {count} out of range ({} remaining)",
                self.remaining
            )));
        }

        let start = out.len();
        let mut doc_id = self.last_doc_id;
        for _ in 0..count {
            let decoded = cursor.read::<u64>().and_then(|delta| {
                let slot = cursor.read::<u32>()? as usize;
                let weight = *weights.get(slot).ok_or_else(|| {
                    SarissaError::corrupt(format!(
                        "weight index {slot} outside table of {}",
                        weights.len()
                    ))
                })?;
                Ok((delta, weight))
            });
            let (delta, weight) = match decoded {
                Ok(pair) => pair,
                Err(e) => {
                    out.truncate(start);
                    return Err(e);
                }
            };
            doc_id = doc_id.wrapping_add(zigzag_decode(delta) as u64);
            out.push(RankedMatch::new(doc_id, weight));
        }

        self.pos += cursor.position();
        self.last_doc_id = doc_id;
        self.remaining -= count;
        Ok(count)
    }
}

/// Decode an entire stream at once.
pub fn decode_all(encoded: &EncodedMatches) -> Result<Vec<RankedMatch>> {
    let mut decoder = FrameDecoder::new(encoded.total_matches);
    let mut out = Vec::with_capacity(encoded.total_matches);
    while decoder.decode_frame(&encoded.data, &encoded.weights, &mut out)? > 0 {}
    Ok(out)
}
