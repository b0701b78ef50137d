//! Varint codec and byte sources for wirestream.
//!
//! This is the lowest layer of wirestream. It provides:
//! - The LEB128 varint codec (unsigned, and zigzag-mapped signed)
//! - [`SliceSource`], a zero-copy source over bytes already in memory
//! - [`StreamSource`], a buffered source over an incremental `Read` supplier
//!
//! [`IntoByteSource`] picks the right variant for a supplier at construction
//! time. Everything else builds on top of the [`ByteSource`] trait.

pub mod error;
pub mod slice;
pub mod stream;
pub mod traits;
pub mod varint;

pub use error::{Result, SourceError};
pub use slice::SliceSource;
pub use stream::StreamSource;
pub use traits::{ByteSource, IntoByteSource};
pub use varint::MAX_VARINT_LEN;
