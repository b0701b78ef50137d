use std::io::{BufReader, Read};
use std::str::FromStr;

use tracing::debug;
use wirestream_source::{ByteSource, IntoByteSource, SliceSource, StreamSource};

use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::marshal::{ReadFrom, UnmarshalBinary};

/// Cap on up-front allocation for sequences; longer ones grow as they decode.
const MAX_PREALLOCATED_ITEMS: usize = 1024;

/// Decodes typed values from a byte source.
///
/// Values must be read in the order they were written. Every operation either
/// completes or returns the first error; bytes consumed before a failure stay
/// consumed and are counted by [`offset`](Reader::offset).
pub struct Reader<S> {
    src: S,
    config: StreamConfig,
}

impl<S: ByteSource> Reader<S> {
    /// Create a reader over the most efficient source for `src`.
    pub fn new<T>(src: T) -> Self
    where
        T: IntoByteSource<Source = S>,
    {
        Self::with_config(src, StreamConfig::default())
    }

    /// Create a reader with explicit limits.
    pub fn with_config<T>(src: T, config: StreamConfig) -> Self
    where
        T: IntoByteSource<Source = S>,
    {
        Self {
            src: src.into_byte_source(),
            config,
        }
    }

    /// Number of bytes consumed from the source through this reader.
    pub fn offset(&self) -> u64 {
        self.src.consumed()
    }

    // --------------------------- Unsigned Integers ---------------------------

    /// Read a variable-length unsigned integer.
    pub fn read_uvarint(&mut self) -> Result<u64> {
        Ok(self.src.read_uvarint()?)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.src.read_byte()?)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_array().map(u16::from_le_bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    /// Read a native-width unsigned integer (8 bytes on the wire).
    pub fn read_usize(&mut self) -> Result<usize> {
        usize::try_from(self.read_u64()?).map_err(|_| Error::Overflow)
    }

    // --------------------------- Signed Integers ---------------------------

    /// Read a zigzag-mapped variable-length signed integer.
    pub fn read_varint(&mut self) -> Result<i64> {
        Ok(self.src.read_varint()?)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        self.read_u8().map(|v| v as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        self.read_array().map(i16::from_le_bytes)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_array().map(i32::from_le_bytes)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.read_array().map(i64::from_le_bytes)
    }

    /// Read a native-width signed integer (8 bytes on the wire).
    pub fn read_isize(&mut self) -> Result<isize> {
        isize::try_from(self.read_i64()?).map_err(|_| Error::Overflow)
    }

    // --------------------------- Floats ---------------------------

    pub fn read_f32(&mut self) -> Result<f32> {
        self.read_u32().map(f32::from_bits)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.read_u64().map(f64::from_bits)
    }

    // --------------------------- Other Types ---------------------------

    /// Read a boolean. Only `0x01` is true; every other byte reads as false.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.src.read_byte()? == 1)
    }

    // --------------------------- Strings ---------------------------

    /// Read a length-prefixed byte string into a new buffer.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_len()?;
        Ok(self.src.read_owned(len)?)
    }

    /// Read a length-prefixed UTF-8 string.
    ///
    /// The decoded buffer is moved into the `String`, not copied.
    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        Ok(String::from_utf8(bytes)?)
    }

    // --------------------------- Sequences ---------------------------

    /// Read an element count, then call `f` once per element with its index.
    pub fn read_range<F>(&mut self, mut f: F) -> Result<()>
    where
        F: FnMut(usize, &mut Self) -> Result<()>,
    {
        let count = self.read_count()?;
        for i in 0..count {
            f(i, self)?;
        }
        Ok(())
    }

    /// Read a count-prefixed sequence, decoding each element with `f`.
    pub fn read_vec<T, F>(&mut self, mut f: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self) -> Result<T>,
    {
        let count = self.read_count()?;
        let mut out = Vec::with_capacity(count.min(MAX_PREALLOCATED_ITEMS));
        for _ in 0..count {
            out.push(f(self)?);
        }
        Ok(out)
    }

    /// Read a count-prefixed sequence of self-describing elements.
    pub fn read_seq<T: ReadFrom>(&mut self) -> Result<Vec<T>> {
        self.read_vec(T::read_from)
    }

    // --------------------------- Marshaled Types ---------------------------

    /// Decode a self-describing value.
    pub fn read_self<T: ReadFrom>(&mut self) -> Result<T> {
        T::read_from(self)
    }

    /// Read a length-prefixed block and rebuild `T` from it.
    pub fn read_binary<T: UnmarshalBinary>(&mut self) -> Result<T> {
        let block = self.slice_bytes()?;
        T::unmarshal_binary(block).map_err(|err| {
            let err = Error::delegate(err);
            debug!(error = %err, "binary unmarshal failed");
            err
        })
    }

    /// Read a length-prefixed UTF-8 block and parse `T` from it.
    pub fn read_text<T>(&mut self) -> Result<T>
    where
        T: FromStr,
        T::Err: Into<crate::error::BoxError>,
    {
        let block = self.slice_bytes()?;
        let text = std::str::from_utf8(block)?;
        text.parse().map_err(|err| {
            let err = Error::delegate(err);
            debug!(error = %err, "text parse failed");
            err
        })
    }

    /// Read a length-prefixed JSON document.
    #[cfg(feature = "json")]
    pub fn read_json<T: serde::de::DeserializeOwned>(&mut self) -> Result<T> {
        let block = self.slice_bytes()?;
        Ok(serde_json::from_slice(block)?)
    }

    // --------------------------- Accessors ---------------------------

    /// Current reader configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Update the maximum accepted length prefix.
    pub fn set_max_length(&mut self, max_length: usize) {
        self.config.max_length = max_length;
    }

    /// Update the maximum accepted sequence count.
    pub fn set_max_items(&mut self, max_items: usize) {
        self.config.max_items = max_items;
    }

    /// Borrow the underlying source.
    pub fn get_ref(&self) -> &S {
        &self.src
    }

    /// Mutably borrow the underlying source.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.src
    }

    /// Consume the reader and return the source.
    pub fn into_inner(self) -> S {
        self.src
    }

    // --------------------------- Internals ---------------------------

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let bytes = self.src.slice(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn read_len(&mut self) -> Result<usize> {
        let len = self.read_uvarint()?;
        checked_prefix(len, self.config.max_length)
    }

    fn read_count(&mut self) -> Result<usize> {
        let count = self.read_uvarint()?;
        checked_prefix(count, self.config.max_items)
    }

    /// Length-prefixed block borrowed from the source. The view may point into
    /// a reused scratch buffer, so it never leaves this reader.
    fn slice_bytes(&mut self) -> Result<&[u8]> {
        let len = self.read_len()?;
        Ok(self.src.slice(len)?)
    }
}

impl<R: Read> Reader<StreamSource<BufReader<R>>> {
    /// Create a reader over an arbitrary incremental supplier.
    pub fn from_stream(inner: R) -> Self {
        Self::new(StreamSource::new(inner))
    }
}

impl Default for Reader<SliceSource<&'static [u8]>> {
    /// A reader over no data; the first read fails with `Truncated`.
    fn default() -> Self {
        Self::new(None::<&'static [u8]>)
    }
}

impl<S: ByteSource> Read for Reader<S> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.src.read(buf)
    }
}

/// A reader hands back its source, so wrapping a reader again never nests.
impl<S: ByteSource> IntoByteSource for Reader<S> {
    type Source = S;

    fn into_byte_source(self) -> S {
        self.src
    }
}

impl<S> std::fmt::Debug for Reader<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn checked_prefix(len: u64, max: usize) -> Result<usize> {
    match usize::try_from(len) {
        Ok(n) if n <= max => Ok(n),
        _ => {
            debug!(len, max, "length prefix exceeds limit");
            Err(Error::LengthTooLarge { len, max })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn reader(bytes: &[u8]) -> Reader<SliceSource<&[u8]>> {
        Reader::new(bytes)
    }

    #[test]
    fn fixed_width_little_endian() {
        let mut r = reader(&[0x11, 0x22, 0x11, 0x44, 0x33, 0x22, 0x11]);
        assert_eq!(r.read_u8().unwrap(), 0x11);
        assert_eq!(r.read_u16().unwrap(), 0x1122);
        assert_eq!(r.read_u32().unwrap(), 0x1122_3344);
        assert_eq!(r.offset(), 7);
    }

    #[test]
    fn signed_fixed_width() {
        let mut r = reader(&[0xff, 0xfe, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
        assert_eq!(r.read_i8().unwrap(), -1);
        assert_eq!(r.read_i64().unwrap(), -2);
        assert!(matches!(r.read_i8(), Err(Error::Truncated)));
    }

    #[test]
    fn floats_from_bits() {
        let mut r = reader(&[0x00, 0x00, 0x88, 0x41, 0, 0, 0, 0, 0, 0, 0x31, 0x40]);
        assert_eq!(r.read_f32().unwrap(), 17.0);
        assert_eq!(r.read_f64().unwrap(), 17.0);
    }

    #[test]
    fn bool_is_permissive() {
        let mut r = reader(&[0x01, 0x00, 0x11, 0x02]);
        assert!(r.read_bool().unwrap());
        assert!(!r.read_bool().unwrap());
        assert!(!r.read_bool().unwrap());
        assert!(!r.read_bool().unwrap());
    }

    #[test]
    fn string_and_bytes() {
        let mut r = reader(&[0x05, b'h', b'e', b'l', b'l', b'o', 0x02, 0xde, 0xad, 0x00]);
        assert_eq!(r.read_string().unwrap(), "hello");
        assert_eq!(r.read_bytes().unwrap(), vec![0xde, 0xad]);
        assert_eq!(r.read_bytes().unwrap(), Vec::<u8>::new());
        assert_eq!(r.offset(), 10);
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let mut r = reader(&[0x02, 0xc3, 0x28]);
        assert!(matches!(r.read_string(), Err(Error::InvalidUtf8(_))));
        assert_eq!(r.offset(), 3);
    }

    #[test]
    fn truncated_string_keeps_prefix_consumed() {
        let mut r = reader(&[0x05, b'h', b'e']);
        assert!(matches!(r.read_string(), Err(Error::Truncated)));
        assert_eq!(r.offset(), 1);
    }

    #[test]
    fn length_limit_is_enforced() {
        let cfg = StreamConfig::default().with_max_length(4);
        let mut r = Reader::with_config(&[0x05u8, b'h', b'e', b'l', b'l', b'o'][..], cfg);
        let err = r.read_bytes().unwrap_err();
        assert!(matches!(err, Error::LengthTooLarge { len: 5, max: 4 }));
        assert_eq!(r.offset(), 1);
    }

    #[test]
    fn item_limit_is_enforced() {
        let mut r = reader(&[0x03, 0x01, 0x02, 0x03]);
        r.set_max_items(2);
        let err = r.read_vec(|r| r.read_u8()).unwrap_err();
        assert!(matches!(err, Error::LengthTooLarge { len: 3, max: 2 }));
    }

    #[test]
    fn range_visits_every_index() {
        let mut r = reader(&[0x03, 0x0a, 0x0b, 0x0c]);
        let mut seen = Vec::new();
        r.read_range(|i, r| {
            seen.push((i, r.read_u8()?));
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, vec![(0, 0x0a), (1, 0x0b), (2, 0x0c)]);
    }

    #[test]
    fn sequence_aborts_on_first_failure() {
        let mut r = reader(&[0x03, 0x01, 0x02]);
        let err = r.read_vec(|r| r.read_u8()).unwrap_err();
        assert!(matches!(err, Error::Truncated));
        assert_eq!(r.offset(), 3);
    }

    #[test]
    fn hostile_count_does_not_preallocate() {
        let mut r = reader(&[0xff, 0xff, 0xff, 0xff, 0x0f]);
        assert!(matches!(r.read_vec(|r| r.read_u8()), Err(Error::Truncated)));
    }

    #[derive(Debug, PartialEq)]
    struct Stamp(u32);

    impl UnmarshalBinary for Stamp {
        type Error = String;

        fn unmarshal_binary(data: &[u8]) -> std::result::Result<Self, String> {
            let arr: [u8; 4] = data
                .try_into()
                .map_err(|_| format!("expected 4 bytes, got {}", data.len()))?;
            Ok(Stamp(u32::from_be_bytes(arr)))
        }
    }

    #[test]
    fn binary_hook_receives_block() {
        let mut r = reader(&[0x04, 0x00, 0x00, 0x01, 0x00]);
        assert_eq!(r.read_binary::<Stamp>().unwrap(), Stamp(256));
        assert_eq!(r.offset(), 5);
    }

    #[test]
    fn binary_hook_error_is_delegated() {
        let mut r = reader(&[0x02, 0x00, 0x00]);
        let err = r.read_binary::<Stamp>().unwrap_err();
        assert!(matches!(err, Error::Delegate(_)));
        assert_eq!(err.to_string(), "expected 4 bytes, got 2");
    }

    #[test]
    fn text_hook_parses() {
        let mut r = reader(&[0x03, b'4', b'2', b'0', 0x02, b'x', b'y']);
        assert_eq!(r.read_text::<u32>().unwrap(), 420);
        assert!(matches!(r.read_text::<u32>(), Err(Error::Delegate(_))));
    }

    #[test]
    fn default_reader_is_empty() {
        let mut r: Reader<SliceSource<&[u8]>> = Reader::default();
        assert!(matches!(r.read_u8(), Err(Error::Truncated)));
        assert_eq!(r.offset(), 0);
    }

    #[test]
    fn rewrapping_keeps_position() {
        let mut r1 = reader(&[0x01, 0x02]);
        r1.read_u8().unwrap();
        let mut r2 = Reader::new(r1);
        assert_eq!(r2.offset(), 1);
        assert_eq!(r2.read_u8().unwrap(), 0x02);
    }

    #[test]
    fn stream_and_cursor_sources() {
        let wire = [0x05u8, b'h', b'e', b'l', b'l', b'o'];

        let mut streamed = Reader::from_stream(&wire[..]);
        assert_eq!(streamed.read_string().unwrap(), "hello");
        assert_eq!(streamed.offset(), 6);

        let mut cursor = Reader::new(Cursor::new(wire.to_vec()));
        assert_eq!(cursor.read_string().unwrap(), "hello");
    }

    #[test]
    fn io_read_on_empty_returns_zero() {
        let mut r: Reader<SliceSource<&[u8]>> = Reader::default();
        assert_eq!(r.read(&mut [0u8; 4]).unwrap(), 0);
    }

    #[test]
    fn native_width_is_eight_bytes() {
        let wire = (-1i64).to_le_bytes();
        let mut r = reader(&wire);
        assert_eq!(r.read_isize().unwrap(), -1);
        assert_eq!(r.offset(), 8);
    }
}
