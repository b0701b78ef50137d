use std::fmt::Display;
use std::io::{self, ErrorKind, Write};

use tracing::{debug, trace};
use wirestream_source::varint::{encode_uvarint, encode_varint};
use wirestream_source::MAX_VARINT_LEN;

use crate::config::StreamConfig;
use crate::error::{Error, Result};
use crate::marshal::{MarshalBinary, WriteTo};
use crate::sink::Close;

type CloseFn<W> = fn(&mut W) -> io::Result<()>;

/// Encodes typed values into any `Write` sink.
///
/// Nothing is buffered: every value goes straight to the sink. Wrap the sink
/// in a `BufWriter` when it is expensive to write to, and call
/// [`flush`](Writer::flush) when done.
///
/// A `Writer` is itself a `Write` sink, so wrapping one (or `&mut` one) in
/// another nests the two. The layers stay consistent: each counts every byte
/// passing through it. Pass the existing writer around instead of rewrapping
/// it when a single offset is wanted.
pub struct Writer<W> {
    inner: W,
    scratch: [u8; MAX_VARINT_LEN],
    offset: u64,
    config: StreamConfig,
    closer: Option<CloseFn<W>>,
}

impl<W: Write> Writer<W> {
    /// Create a new writer with default configuration.
    ///
    /// [`close`](Writer::close) is a no-op on the result, even for sinks that
    /// implement [`Close`]; use [`closable`](Writer::closable) for those.
    pub fn new(inner: W) -> Self {
        Self::with_config(inner, StreamConfig::default())
    }

    /// Create a new writer with explicit configuration.
    pub fn with_config(inner: W, config: StreamConfig) -> Self {
        Self {
            inner,
            scratch: [0; MAX_VARINT_LEN],
            offset: 0,
            config,
            closer: None,
        }
    }

    /// Bind to a new sink and zero the offset. Returns the previous sink.
    ///
    /// The configuration and close capability are kept.
    pub fn reset(&mut self, inner: W) -> W {
        trace!(offset = self.offset, "resetting writer");
        self.offset = 0;
        std::mem::replace(&mut self.inner, inner)
    }

    /// Number of bytes the sink has accepted through this writer.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    // --------------------------- Unsigned Integers ---------------------------

    /// Write a variable-length unsigned integer.
    pub fn write_uvarint(&mut self, v: u64) -> Result<()> {
        let n = encode_uvarint(v, &mut self.scratch);
        self.emit(n)
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.write_fixed(&[v])
    }

    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        self.write_fixed(&v.to_le_bytes())
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        self.write_fixed(&v.to_le_bytes())
    }

    pub fn write_u64(&mut self, v: u64) -> Result<()> {
        self.write_fixed(&v.to_le_bytes())
    }

    /// Write a native-width unsigned integer as 8 bytes.
    pub fn write_usize(&mut self, v: usize) -> Result<()> {
        let v = u64::try_from(v).map_err(|_| Error::Overflow)?;
        self.write_u64(v)
    }

    // --------------------------- Signed Integers ---------------------------

    /// Write a zigzag-mapped variable-length signed integer.
    pub fn write_varint(&mut self, v: i64) -> Result<()> {
        let n = encode_varint(v, &mut self.scratch);
        self.emit(n)
    }

    pub fn write_i8(&mut self, v: i8) -> Result<()> {
        self.write_fixed(&v.to_le_bytes())
    }

    pub fn write_i16(&mut self, v: i16) -> Result<()> {
        self.write_fixed(&v.to_le_bytes())
    }

    pub fn write_i32(&mut self, v: i32) -> Result<()> {
        self.write_fixed(&v.to_le_bytes())
    }

    pub fn write_i64(&mut self, v: i64) -> Result<()> {
        self.write_fixed(&v.to_le_bytes())
    }

    /// Write a native-width signed integer as 8 bytes.
    pub fn write_isize(&mut self, v: isize) -> Result<()> {
        let v = i64::try_from(v).map_err(|_| Error::Overflow)?;
        self.write_i64(v)
    }

    // --------------------------- Floats ---------------------------

    pub fn write_f32(&mut self, v: f32) -> Result<()> {
        self.write_u32(v.to_bits())
    }

    pub fn write_f64(&mut self, v: f64) -> Result<()> {
        self.write_u64(v.to_bits())
    }

    // --------------------------- Other Types ---------------------------

    pub fn write_bool(&mut self, v: bool) -> Result<()> {
        self.write_u8(u8::from(v))
    }

    // --------------------------- Strings ---------------------------

    /// Write a length-prefixed byte string.
    pub fn write_bytes(&mut self, v: &[u8]) -> Result<()> {
        if v.len() > self.config.max_length {
            debug!(
                len = v.len(),
                max = self.config.max_length,
                "refusing to write oversized payload"
            );
            return Err(Error::LengthTooLarge {
                len: v.len() as u64,
                max: self.config.max_length,
            });
        }
        self.write_uvarint(v.len() as u64)?;
        write_counted(&mut self.inner, v, &mut self.offset)
    }

    /// Write a length-prefixed UTF-8 string.
    pub fn write_str(&mut self, v: &str) -> Result<()> {
        self.write_bytes(v.as_bytes())
    }

    // --------------------------- Sequences ---------------------------

    /// Write `count`, then call `f` once per element with its index.
    pub fn write_range<F>(&mut self, count: usize, mut f: F) -> Result<()>
    where
        F: FnMut(usize, &mut Self) -> Result<()>,
    {
        self.write_uvarint(count as u64)?;
        for i in 0..count {
            f(i, self)?;
        }
        Ok(())
    }

    /// Write a count-prefixed sequence of self-describing elements.
    pub fn write_seq<T: WriteTo>(&mut self, items: &[T]) -> Result<()> {
        self.write_range(items.len(), |i, w| items[i].write_to(w))
    }

    // --------------------------- Marshaled Types ---------------------------

    /// Encode a self-describing value.
    pub fn write_self<T: WriteTo + ?Sized>(&mut self, v: &T) -> Result<()> {
        v.write_to(self)
    }

    /// Write the value's standalone binary form as a length-prefixed block.
    pub fn write_binary<T: MarshalBinary + ?Sized>(&mut self, v: &T) -> Result<()> {
        let data = v.marshal_binary().map_err(|err| {
            let err = Error::delegate(err);
            debug!(error = %err, "binary marshal failed");
            err
        })?;
        self.write_bytes(&data)
    }

    /// Write the value's `Display` form as a length-prefixed string.
    pub fn write_text<T: Display + ?Sized>(&mut self, v: &T) -> Result<()> {
        self.write_str(&v.to_string())
    }

    /// Write the value as a length-prefixed JSON document.
    #[cfg(feature = "json")]
    pub fn write_json<T: serde::Serialize + ?Sized>(&mut self, v: &T) -> Result<()> {
        let data = serde_json::to_vec(v)?;
        self.write_bytes(&data)
    }

    // --------------------------- Sink Control ---------------------------

    /// Flush the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(Error::Io(err)),
            }
        }
    }

    /// Close the underlying sink if it was registered as closable.
    ///
    /// A no-op for writers built with [`new`](Writer::new) or
    /// [`with_config`](Writer::with_config); only
    /// [`closable`](Writer::closable) records the capability.
    pub fn close(&mut self) -> Result<()> {
        let Some(close) = self.closer else {
            debug!("close ignored: writer was not created with Writer::closable");
            return Ok(());
        };
        trace!(offset = self.offset, "closing writer sink");
        close(&mut self.inner)?;
        Ok(())
    }

    // --------------------------- Accessors ---------------------------

    /// Current writer configuration.
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Update the maximum length accepted by `write_bytes`/`write_str`.
    pub fn set_max_length(&mut self, max_length: usize) {
        self.config.max_length = max_length;
    }

    /// Borrow the underlying sink.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Mutably borrow the underlying sink.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Consume the writer and return the sink.
    pub fn into_inner(self) -> W {
        self.inner
    }

    // --------------------------- Internals ---------------------------

    fn write_fixed<const N: usize>(&mut self, bytes: &[u8; N]) -> Result<()> {
        self.scratch[..N].copy_from_slice(bytes);
        self.emit(N)
    }

    fn emit(&mut self, n: usize) -> Result<()> {
        write_counted(&mut self.inner, &self.scratch[..n], &mut self.offset)
    }
}

impl<W: Write + Close> Writer<W> {
    /// Create a writer whose [`close`](Writer::close) forwards to the sink.
    pub fn closable(inner: W) -> Self {
        Self {
            closer: Some(<W as Close>::close as CloseFn<W>),
            ..Self::new(inner)
        }
    }
}

impl<W: Write> Write for Writer<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.offset += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W> std::fmt::Debug for Writer<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Writer")
            .field("offset", &self.offset)
            .field("config", &self.config)
            .field("closable", &self.closer.is_some())
            .finish_non_exhaustive()
    }
}

/// Write all of `buf`, adding every accepted byte to `offset`.
fn write_counted<W: Write>(inner: &mut W, buf: &[u8], offset: &mut u64) -> Result<()> {
    let mut written = 0usize;
    while written < buf.len() {
        let err = match inner.write(&buf[written..]) {
            Ok(0) => None,
            Ok(n) => {
                written += n;
                *offset += n as u64;
                continue;
            }
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => Some(err),
        };
        debug!(written, expected = buf.len(), "short write");
        return Err(Error::ShortWrite {
            written,
            expected: buf.len(),
            source: err,
        });
    }
    Ok(())
}
