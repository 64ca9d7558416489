//! Variable-length integer encoding utilities.
//!
//! Unsigned values use 7 bits per byte with a continuation bit (LEB128).
//! Signed values are first mapped through zigzag encoding so that small
//! negative numbers stay small: `0, -1, 1, -2, 2` become `0, 1, 2, 3, 4`.

use crate::error::{Result, SarissaError};

/// Longest possible encoding of a u64.
pub const MAX_VARINT_LEN_U64: usize = 10;

/// Longest possible encoding of a u32.
pub const MAX_VARINT_LEN_U32: usize = 5;

/// Append a u64 to `buf` using variable-length encoding.
///
/// Returns the number of bytes written.
pub fn put_u64(buf: &mut Vec<u8>, value: u64) -> usize {
    let mut val = value;
    let mut written = 0;

    loop {
        let mut byte = (val & 0x7F) as u8;
        val >>= 7;

        if val != 0 {
            byte |= 0x80; // Set continuation bit
        }

        buf.push(byte);
        written += 1;

        if val == 0 {
            return written;
        }
    }
}

/// Append a u32 to `buf` using variable-length encoding.
pub fn put_u32(buf: &mut Vec<u8>, value: u32) -> usize {
    put_u64(buf, value as u64)
}

/// Decode a u64 from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed.
pub fn decode_u64(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut result = 0u64;
    let mut shift = 0;

    for (i, &byte) in bytes.iter().enumerate() {
        if i >= MAX_VARINT_LEN_U64 {
            return Err(SarissaError::corrupt("VarInt overflow"));
        }

        let chunk = (byte & 0x7F) as u64;
        // The tenth byte may only carry the top bit of a u64.
        if shift == 63 && chunk > 1 {
            return Err(SarissaError::corrupt("VarInt overflow"));
        }
        result |= chunk << shift;

        if (byte & 0x80) == 0 {
            return Ok((result, i + 1));
        }

        shift += 7;
    }

    Err(SarissaError::corrupt("Incomplete VarInt"))
}

/// Decode a u32 from the front of `bytes`.
pub fn decode_u32(bytes: &[u8]) -> Result<(u32, usize)> {
    let (value, read) = decode_u64(&bytes[..bytes.len().min(MAX_VARINT_LEN_U32)])?;
    let value = u32::try_from(value).map_err(|_| SarissaError::corrupt("VarInt overflow"))?;
    Ok((value, read))
}

/// Number of bytes `value` occupies once encoded.
pub fn encoded_len_u64(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Map a signed value onto the unsigned range so small magnitudes stay small.
#[inline]
pub fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

/// Inverse of [`zigzag_encode`].
#[inline]
pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// A trait for types that can be encoded as variable-length integers.
pub trait VarInt: Sized {
    /// Append this value as a variable-length integer.
    fn put_varint(&self, buf: &mut Vec<u8>) -> usize;

    /// Decode a variable-length integer from the front of `bytes`.
    fn decode_varint(bytes: &[u8]) -> Result<(Self, usize)>;
}

impl VarInt for u32 {
    fn put_varint(&self, buf: &mut Vec<u8>) -> usize {
        put_u32(buf, *self)
    }

    fn decode_varint(bytes: &[u8]) -> Result<(Self, usize)> {
        decode_u32(bytes)
    }
}

impl VarInt for u64 {
    fn put_varint(&self, buf: &mut Vec<u8>) -> usize {
        put_u64(buf, *self)
    }

    fn decode_varint(bytes: &[u8]) -> Result<(Self, usize)> {
        decode_u64(bytes)
    }
}

/// Forward-only reader over a byte slice of varints.
#[derive(Debug, Clone)]
pub struct VarIntCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> VarIntCursor<'a> {
    /// Create a cursor positioned at the start of `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        VarIntCursor { bytes, pos: 0 }
    }

    /// Read the next value.
    pub fn read<T: VarInt>(&mut self) -> Result<T> {
        let (value, read) = T::decode_varint(&self.bytes[self.pos..])?;
        self.pos += read;
        Ok(value)
    }

    /// Current byte offset.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Whether every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }
}
