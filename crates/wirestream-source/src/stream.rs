use std::io::{BufRead, BufReader, ErrorKind, Read};

use tracing::trace;

use crate::error::{Result, SourceError};
use crate::traits::ByteSource;

const READ_CHUNK_SIZE: usize = 8 * 1024;

/// A source over an incremental byte supply (sockets, pipes, files).
///
/// Byte-at-a-time reads are served from the supplier's `BufRead` buffer.
/// [`slice`] copies into an owned scratch buffer that is reused across calls
/// and only grows, to the next power of two, as request data arrives. A
/// length that the supplier cannot back never allocates more than one chunk
/// past the bytes actually received.
///
/// [`slice`]: ByteSource::slice
#[derive(Debug)]
pub struct StreamSource<R> {
    inner: R,
    scratch: Vec<u8>,
    consumed: u64,
}

impl<R: Read> StreamSource<BufReader<R>> {
    /// Wrap an unbuffered supplier so single bytes can be read cheaply.
    pub fn new(inner: R) -> Self {
        Self::buffered(BufReader::new(inner))
    }
}

impl<R: BufRead> StreamSource<R> {
    /// Use a supplier that already buffers.
    pub fn buffered(inner: R) -> Self {
        Self::with_scratch_capacity(inner, 0)
    }

    /// Use a buffered supplier and pre-size the scratch buffer.
    pub fn with_scratch_capacity(inner: R, capacity: usize) -> Self {
        Self {
            inner,
            scratch: vec![0; capacity],
            consumed: 0,
        }
    }

    /// Current size of the scratch buffer used by `slice`.
    pub fn scratch_capacity(&self) -> usize {
        self.scratch.len()
    }

    /// Borrow the underlying supplier.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Mutably borrow the underlying supplier.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consume the source and return the underlying supplier.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn grow_scratch(&mut self, n: usize) {
        if self.scratch.len() >= n {
            return;
        }
        let capacity = n.checked_next_power_of_two().unwrap_or(n);
        trace!(
            from = self.scratch.len(),
            to = capacity,
            "growing stream scratch buffer"
        );
        self.scratch.resize(capacity, 0);
    }
}

impl<R: BufRead> Read for StreamSource<R> {
    fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(out)?;
        self.consumed += n as u64;
        Ok(n)
    }
}

impl<R: BufRead> ByteSource for StreamSource<R> {
    fn read_byte(&mut self) -> Result<u8> {
        loop {
            let byte = match self.inner.fill_buf() {
                Ok([]) => return Err(SourceError::Truncated),
                Ok(buf) => buf[0],
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(SourceError::Io(err)),
            };
            self.inner.consume(1);
            self.consumed += 1;
            return Ok(byte);
        }
    }

    fn slice(&mut self, n: usize) -> Result<&[u8]> {
        // Grow one chunk ahead of the data received, never by the requested length.
        let mut filled = 0;
        while filled < n {
            let end = filled + (n - filled).min(READ_CHUNK_SIZE);
            self.grow_scratch(end);
            fill_exact(
                &mut self.inner,
                &mut self.scratch[filled..end],
                &mut self.consumed,
            )?;
            filled = end;
        }
        Ok(&self.scratch[..n])
    }

    fn read_owned(&mut self, n: usize) -> Result<Vec<u8>> {
        // Grow with the data actually received rather than trusting `n`.
        let mut out = Vec::with_capacity(n.min(READ_CHUNK_SIZE));
        let got = (&mut self.inner).take(n as u64).read_to_end(&mut out);
        self.consumed += out.len() as u64;
        got?;
        if out.len() < n {
            return Err(SourceError::Truncated);
        }
        Ok(out)
    }

    fn consumed(&self) -> u64 {
        self.consumed
    }
}

/// Fill `dst` completely from `inner`, counting every byte received.
fn fill_exact<R: Read>(inner: &mut R, dst: &mut [u8], consumed: &mut u64) -> Result<()> {
    let mut filled = 0;
    while filled < dst.len() {
        match inner.read(&mut dst[filled..]) {
            Ok(0) => return Err(SourceError::Truncated),
            Ok(n) => {
                filled += n;
                *consumed += n as u64;
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(SourceError::Io(err)),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    fn trickle(bytes: &[u8]) -> StreamSource<BufReader<ByteByByteReader>> {
        StreamSource::new(ByteByByteReader {
            bytes: bytes.to_vec(),
            pos: 0,
        })
    }

    #[test]
    fn read_byte_until_eof() {
        let mut src = trickle(&[1, 2]);
        assert_eq!(src.read_byte().unwrap(), 1);
        assert_eq!(src.read_byte().unwrap(), 2);
        assert!(matches!(src.read_byte(), Err(SourceError::Truncated)));
        assert_eq!(src.consumed(), 2);
    }

    #[test]
    fn slice_assembles_partial_reads() {
        let mut src = trickle(&[1, 2, 3, 4, 5]);
        assert_eq!(src.slice(4).unwrap(), &[1, 2, 3, 4]);
        assert_eq!(src.consumed(), 4);
    }

    #[test]
    fn scratch_grows_to_next_power_of_two() {
        let mut src = trickle(&[0u8; 40]);
        assert_eq!(src.scratch_capacity(), 0);

        src.slice(3).unwrap();
        assert_eq!(src.scratch_capacity(), 4);

        src.slice(2).unwrap();
        assert_eq!(src.scratch_capacity(), 4);

        src.slice(17).unwrap();
        assert_eq!(src.scratch_capacity(), 32);
    }

    #[test]
    fn scratch_is_reused_between_slices() {
        let mut src = trickle(&[1, 2, 3, 4]);
        let first = src.slice(2).unwrap().as_ptr();
        let second = src.slice(2).unwrap();
        assert_eq!(second, &[3, 4]);
        assert_eq!(first, second.as_ptr());
    }

    #[test]
    fn truncated_slice_counts_bytes_received() {
        let mut src = trickle(&[1, 2, 3]);
        assert!(matches!(src.slice(5), Err(SourceError::Truncated)));
        assert_eq!(src.consumed(), 3);
    }

    #[test]
    fn hostile_slice_length_is_truncated_without_allocating() {
        let mut src = trickle(&[0xaa]);
        assert!(matches!(src.slice(usize::MAX), Err(SourceError::Truncated)));
        assert_eq!(src.consumed(), 1);
        assert!(src.scratch_capacity() <= READ_CHUNK_SIZE);

        let mut src = trickle(&[0xaa, 0xbb]);
        assert!(matches!(src.slice(1 << 40), Err(SourceError::Truncated)));
        assert!(src.scratch_capacity() <= READ_CHUNK_SIZE);
    }

    #[test]
    fn slice_spanning_several_chunks() {
        let data: Vec<u8> = (0..READ_CHUNK_SIZE * 2 + 5).map(|i| i as u8).collect();
        let mut src = StreamSource::new(data.as_slice());
        assert_eq!(src.slice(data.len()).unwrap(), data.as_slice());
        assert_eq!(src.consumed(), data.len() as u64);
        assert_eq!(src.scratch_capacity(), (data.len()).next_power_of_two());
    }

    #[test]
    fn read_owned_is_exact() {
        let mut src = trickle(&[9, 8, 7, 6]);
        assert_eq!(src.read_owned(3).unwrap(), vec![9, 8, 7]);
        assert!(matches!(src.read_owned(3), Err(SourceError::Truncated)));
        assert_eq!(src.consumed(), 4);
    }

    #[test]
    fn huge_length_does_not_preallocate() {
        let mut src = trickle(&[1, 2]);
        assert!(matches!(
            src.read_owned(usize::MAX / 2),
            Err(SourceError::Truncated)
        ));
    }

    #[test]
    fn varints_decode_through_read_byte() {
        let mut src = trickle(&[0x91, 0xa2, 0xc4, 0x88, 0x91, 0xa2, 0xc4, 0x88, 0x11, 0x1f]);
        assert_eq!(src.read_uvarint().unwrap(), 0x1111_1111_1111_1111);
        assert_eq!(src.read_varint().unwrap(), -16);
        assert_eq!(src.consumed(), 10);
    }

    #[test]
    fn interrupted_reads_are_retried() {
        let mut src = StreamSource::new(InterruptedThenData {
            interrupted: false,
            bytes: vec![0x2a, 0x01, 0x02],
            pos: 0,
        });
        assert_eq!(src.read_byte().unwrap(), 0x2a);
        assert_eq!(src.slice(2).unwrap(), &[1, 2]);
    }

    #[test]
    fn other_io_errors_propagate() {
        let mut src = StreamSource::new(BrokenReader);
        let err = src.read_byte().unwrap_err();
        assert!(matches!(err, SourceError::Io(e) if e.kind() == ErrorKind::ConnectionReset));
    }

    struct InterruptedThenData {
        interrupted: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    struct BrokenReader;

    impl Read for BrokenReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::ConnectionReset))
        }
    }
}
