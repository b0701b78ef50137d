use std::io::Read;

use crate::error::{Result, SourceError};
use crate::traits::ByteSource;

/// A source over bytes that are already fully in memory.
///
/// Reads are cursor arithmetic over the backing buffer and [`slice`] hands
/// out views into it without copying. A failed request leaves the cursor
/// where it was.
///
/// [`slice`]: ByteSource::slice
#[derive(Debug, Clone)]
pub struct SliceSource<B> {
    buf: B,
    pos: usize,
    start: usize,
}

impl<B: AsRef<[u8]>> SliceSource<B> {
    /// Create a source reading `buf` from the beginning.
    pub fn new(buf: B) -> Self {
        Self::starting_at(buf, 0)
    }

    /// Create a source reading `buf` from `pos` (clamped to its length).
    pub fn starting_at(buf: B, pos: usize) -> Self {
        let pos = pos.min(buf.as_ref().len());
        Self {
            buf,
            pos,
            start: pos,
        }
    }

    /// Bytes left before the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.buf.as_ref().len() - self.pos
    }

    /// Current cursor position within the backing buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Borrow the backing buffer.
    pub fn get_ref(&self) -> &B {
        &self.buf
    }

    /// Consume the source and return the backing buffer.
    pub fn into_inner(self) -> B {
        self.buf
    }

    fn advance(&mut self, n: usize) -> Result<&[u8]> {
        if n > self.remaining() {
            return Err(SourceError::Truncated);
        }
        let start = self.pos;
        self.pos += n;
        Ok(&self.buf.as_ref()[start..self.pos])
    }
}

impl<B: AsRef<[u8]>> Read for SliceSource<B> {
    fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
        let rest = &self.buf.as_ref()[self.pos..];
        let n = rest.len().min(out.len());
        out[..n].copy_from_slice(&rest[..n]);
        self.pos += n;
        Ok(n)
    }
}

impl<B: AsRef<[u8]>> ByteSource for SliceSource<B> {
    fn read_byte(&mut self) -> Result<u8> {
        let byte = *self
            .buf
            .as_ref()
            .get(self.pos)
            .ok_or(SourceError::Truncated)?;
        self.pos += 1;
        Ok(byte)
    }

    fn slice(&mut self, n: usize) -> Result<&[u8]> {
        self.advance(n)
    }

    fn read_owned(&mut self, n: usize) -> Result<Vec<u8>> {
        self.advance(n).map(<[u8]>::to_vec)
    }

    fn consumed(&self) -> u64 {
        (self.pos - self.start) as u64
    }
}
