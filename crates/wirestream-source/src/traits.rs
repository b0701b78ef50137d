use std::io::{BufReader, Cursor, Read};

use bytes::{Bytes, BytesMut};

use crate::error::Result;
use crate::slice::SliceSource;
use crate::stream::StreamSource;
use crate::varint;

/// A forward-only supplier of bytes that decoders pull from.
///
/// Implemented by [`SliceSource`] (zero-copy over memory) and
/// [`StreamSource`] (copying out of an incremental `Read`). The cursor only
/// moves forward; there is no seeking back.
pub trait ByteSource: Read {
    /// Read the next byte, or fail with `Truncated` at end of input.
    fn read_byte(&mut self) -> Result<u8>;

    /// Take the next `n` bytes as one contiguous slice.
    ///
    /// For a materialized source the slice borrows the backing data. For a
    /// streaming source it points into a scratch buffer that the next call
    /// overwrites; the borrow on `self` enforces that.
    fn slice(&mut self, n: usize) -> Result<&[u8]>;

    /// Read exactly `n` bytes into a freshly allocated buffer the caller owns.
    fn read_owned(&mut self, n: usize) -> Result<Vec<u8>>;

    /// Total number of bytes taken from the underlying supplier so far.
    fn consumed(&self) -> u64;

    /// Decode an unsigned varint.
    fn read_uvarint(&mut self) -> Result<u64> {
        varint::read_uvarint(self)
    }

    /// Decode a zigzag-mapped signed varint.
    fn read_varint(&mut self) -> Result<i64> {
        varint::read_varint(self)
    }
}

impl<T: ByteSource + ?Sized> ByteSource for &mut T {
    fn read_byte(&mut self) -> Result<u8> {
        (**self).read_byte()
    }

    fn slice(&mut self, n: usize) -> Result<&[u8]> {
        (**self).slice(n)
    }

    fn read_owned(&mut self, n: usize) -> Result<Vec<u8>> {
        (**self).read_owned(n)
    }

    fn consumed(&self) -> u64 {
        (**self).consumed()
    }

    fn read_uvarint(&mut self) -> Result<u64> {
        (**self).read_uvarint()
    }

    fn read_varint(&mut self) -> Result<i64> {
        (**self).read_varint()
    }
}

/// Conversion into the most efficient [`ByteSource`] for a supplier.
///
/// Suppliers whose whole content is already in memory become a
/// [`SliceSource`]; incremental ones become a [`StreamSource`]. Sources
/// convert to themselves, so wrapping twice never nests. Any other `Read`
/// type can be adopted explicitly with [`StreamSource::new`].
pub trait IntoByteSource {
    /// The source variant chosen for this supplier.
    type Source: ByteSource;

    /// Perform the conversion.
    fn into_byte_source(self) -> Self::Source;
}

impl<'a> IntoByteSource for &'a [u8] {
    type Source = SliceSource<&'a [u8]>;

    fn into_byte_source(self) -> Self::Source {
        SliceSource::new(self)
    }
}

impl<'a, const N: usize> IntoByteSource for &'a [u8; N] {
    type Source = SliceSource<&'a [u8]>;

    fn into_byte_source(self) -> Self::Source {
        SliceSource::new(self.as_slice())
    }
}

impl<'a> IntoByteSource for &'a Vec<u8> {
    type Source = SliceSource<&'a [u8]>;

    fn into_byte_source(self) -> Self::Source {
        SliceSource::new(self.as_slice())
    }
}

/// An absent supplier reads as zero bytes.
impl<'a> IntoByteSource for Option<&'a [u8]> {
    type Source = SliceSource<&'a [u8]>;

    fn into_byte_source(self) -> Self::Source {
        SliceSource::new(self.unwrap_or_default())
    }
}

impl IntoByteSource for Vec<u8> {
    type Source = SliceSource<Vec<u8>>;

    fn into_byte_source(self) -> Self::Source {
        SliceSource::new(self)
    }
}

impl IntoByteSource for Bytes {
    type Source = SliceSource<Bytes>;

    fn into_byte_source(self) -> Self::Source {
        SliceSource::new(self)
    }
}

impl IntoByteSource for BytesMut {
    type Source = SliceSource<Bytes>;

    fn into_byte_source(self) -> Self::Source {
        SliceSource::new(self.freeze())
    }
}

/// Reading starts at the cursor's current position.
impl<T: AsRef<[u8]>> IntoByteSource for Cursor<T> {
    type Source = SliceSource<T>;

    fn into_byte_source(self) -> Self::Source {
        let pos = usize::try_from(self.position()).unwrap_or(usize::MAX);
        SliceSource::starting_at(self.into_inner(), pos)
    }
}

impl<B: AsRef<[u8]>> IntoByteSource for SliceSource<B> {
    type Source = Self;

    fn into_byte_source(self) -> Self::Source {
        self
    }
}

impl<R: std::io::BufRead> IntoByteSource for StreamSource<R> {
    type Source = Self;

    fn into_byte_source(self) -> Self::Source {
        self
    }
}

/// Already buffered, so byte-at-a-time reads are served without another layer.
impl<R: Read> IntoByteSource for BufReader<R> {
    type Source = StreamSource<BufReader<R>>;

    fn into_byte_source(self) -> Self::Source {
        StreamSource::buffered(self)
    }
}

macro_rules! stream_source_for {
    ($($(#[$meta:meta])* $ty:ty),* $(,)?) => {
        $(
            $(#[$meta])*
            impl IntoByteSource for $ty {
                type Source = StreamSource<BufReader<$ty>>;

                fn into_byte_source(self) -> Self::Source {
                    StreamSource::new(self)
                }
            }
        )*
    };
}

stream_source_for!(
    std::fs::File,
    std::net::TcpStream,
    std::io::Stdin,
    std::process::ChildStdout,
    #[cfg(unix)]
    std::os::unix::net::UnixStream,
);
