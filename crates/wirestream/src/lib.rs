//! Compact, self-delimiting binary streams.
//!
//! A [`Writer`] encodes typed values into any `Write` sink and a [`Reader`]
//! decodes them back, in the same order, from any byte source. There is no
//! out-of-band metadata; every variable-size value carries its own length.
//!
//! # Wire format
//!
//! ```text
//! ┌──────────────────┬──────────────────────────────────────────────┐
//! │ uvarint          │ LEB128, 7 bits per byte, 0x80 = continue,    │
//! │                  │ at most 10 bytes                             │
//! │ varint           │ zigzag(x) as uvarint                         │
//! │ u8/u16/u32/u64   │ little-endian, exact width                   │
//! │ f32/f64          │ little-endian IEEE-754 bits                  │
//! │ bool             │ one byte, 0x01 = true, anything else = false │
//! │ bytes / string   │ uvarint length, then raw bytes               │
//! │ sequence         │ uvarint count, then each element             │
//! └──────────────────┴──────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use wirestream::{Reader, Writer};
//!
//! let mut writer = Writer::new(Vec::new());
//! writer.write_str("hello")?;
//! writer.write_varint(-16)?;
//! let wire = writer.into_inner();
//! assert_eq!(wire, [0x05, b'h', b'e', b'l', b'l', b'o', 0x1f]);
//!
//! let mut reader = Reader::new(&wire);
//! assert_eq!(reader.read_string()?, "hello");
//! assert_eq!(reader.read_varint()?, -16);
//! assert_eq!(reader.offset(), 7);
//! # Ok::<(), wirestream::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod marshal;
pub mod reader;
pub mod sink;
pub mod writer;

pub use config::StreamConfig;
pub use error::{Error, Result};
pub use marshal::{MarshalBinary, ReadFrom, UnmarshalBinary, WriteTo};
pub use reader::Reader;
pub use sink::Close;
pub use writer::Writer;

/// Re-export source types.
pub mod source {
    pub use wirestream_source::*;
}

pub use wirestream_source::{ByteSource, IntoByteSource, SliceSource, StreamSource};
