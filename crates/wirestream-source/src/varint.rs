//! LEB128 variable-length integers.
//!
//! Each byte carries 7 payload bits, least significant group first. The high
//! bit (`0x80`) marks that another byte follows. A `u64` needs at most
//! [`MAX_VARINT_LEN`] bytes; the tenth byte may only carry the single
//! remaining bit, so any tenth byte above `0x01` is an overflow.
//!
//! Signed values are zigzag-mapped first so that small magnitudes stay short
//! regardless of sign: `0, -1, 1, -2, 2, ...` become `0, 1, 2, 3, 4, ...`.

use crate::error::{Result, SourceError};
use crate::traits::ByteSource;

/// Maximum encoded length of a 64-bit varint.
pub const MAX_VARINT_LEN: usize = 10;

/// Map a signed integer onto the unsigned range, keeping small magnitudes small.
#[inline]
pub fn zigzag_encode(v: i64) -> u64 {
    let x = (v as u64) << 1;
    if v < 0 {
        !x
    } else {
        x
    }
}

/// Inverse of [`zigzag_encode`].
#[inline]
pub fn zigzag_decode(u: u64) -> i64 {
    let x = (u >> 1) as i64;
    if u & 1 != 0 {
        !x
    } else {
        x
    }
}

/// Encode `x` into `buf` and return the number of bytes used (1 to 10).
#[inline]
pub fn encode_uvarint(mut x: u64, buf: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut i = 0;
    while x >= 0x80 {
        buf[i] = (x as u8) | 0x80;
        x >>= 7;
        i += 1;
    }
    buf[i] = x as u8;
    i + 1
}

/// Zigzag-map `v` and encode it into `buf`. Returns the number of bytes used.
#[inline]
pub fn encode_varint(v: i64, buf: &mut [u8; MAX_VARINT_LEN]) -> usize {
    encode_uvarint(zigzag_encode(v), buf)
}

/// Number of bytes [`encode_uvarint`] would produce for `x`.
#[inline]
pub fn uvarint_len(x: u64) -> usize {
    let bits = 64 - (x | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Decode an unsigned varint from the front of `buf`.
///
/// Returns the value and the number of bytes it occupied.
pub fn decode_uvarint(buf: &[u8]) -> Result<(u64, usize)> {
    let mut pos = 0;
    let value = decode_with(|| {
        let byte = *buf.get(pos).ok_or(SourceError::Truncated)?;
        pos += 1;
        Ok(byte)
    })?;
    Ok((value, pos))
}

/// Decode a zigzag-mapped signed varint from the front of `buf`.
pub fn decode_varint(buf: &[u8]) -> Result<(i64, usize)> {
    let (u, n) = decode_uvarint(buf)?;
    Ok((zigzag_decode(u), n))
}

/// Decode an unsigned varint one byte at a time from `src`.
pub fn read_uvarint<S: ByteSource + ?Sized>(src: &mut S) -> Result<u64> {
    decode_with(|| src.read_byte())
}

/// Decode a zigzag-mapped signed varint one byte at a time from `src`.
pub fn read_varint<S: ByteSource + ?Sized>(src: &mut S) -> Result<i64> {
    read_uvarint(src).map(zigzag_decode)
}

fn decode_with<F>(mut next: F) -> Result<u64>
where
    F: FnMut() -> Result<u8>,
{
    let mut x = 0u64;
    for i in 0..MAX_VARINT_LEN {
        let byte = next()?;
        let shift = 7 * i as u32;
        if byte < 0x80 {
            if i == MAX_VARINT_LEN - 1 && byte > 1 {
                return Err(SourceError::Overflow);
            }
            return Ok(x | (u64::from(byte) << shift));
        }
        x |= u64::from(byte & 0x7f) << shift;
    }
    Err(SourceError::Overflow)
}
