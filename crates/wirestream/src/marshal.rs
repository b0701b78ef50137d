//! Self-describing types.
//!
//! A type that knows its own layout implements [`WriteTo`] and [`ReadFrom`]
//! and calls back into the public `Writer`/`Reader` operations. Types that
//! already have a standalone byte representation implement
//! [`MarshalBinary`]/[`UnmarshalBinary`] instead; the stream stores that
//! representation as a length-prefixed byte block.

use std::io::Write;

use wirestream_source::ByteSource;

use crate::error::{BoxError, Result};
use crate::reader::Reader;
use crate::writer::Writer;

/// Encode `self` through a [`Writer`].
pub trait WriteTo {
    fn write_to<W: Write>(&self, w: &mut Writer<W>) -> Result<()>;
}

/// Decode a value through a [`Reader`].
pub trait ReadFrom: Sized {
    fn read_from<S: ByteSource>(r: &mut Reader<S>) -> Result<Self>;
}

/// Produce a standalone binary representation.
pub trait MarshalBinary {
    type Error: Into<BoxError>;

    fn marshal_binary(&self) -> std::result::Result<Vec<u8>, Self::Error>;
}

/// Rebuild a value from the representation produced by [`MarshalBinary`].
pub trait UnmarshalBinary: Sized {
    type Error: Into<BoxError>;

    fn unmarshal_binary(data: &[u8]) -> std::result::Result<Self, Self::Error>;
}

impl<T: WriteTo + ?Sized> WriteTo for &T {
    fn write_to<W: Write>(&self, w: &mut Writer<W>) -> Result<()> {
        (**self).write_to(w)
    }
}

impl<T: WriteTo + ?Sized> WriteTo for Box<T> {
    fn write_to<W: Write>(&self, w: &mut Writer<W>) -> Result<()> {
        (**self).write_to(w)
    }
}

impl<T: ReadFrom> ReadFrom for Box<T> {
    fn read_from<S: ByteSource>(r: &mut Reader<S>) -> Result<Self> {
        T::read_from(r).map(Box::new)
    }
}

macro_rules! scalar_impls {
    ($($ty:ty => $write:ident, $read:ident;)*) => {
        $(
            impl WriteTo for $ty {
                fn write_to<W: Write>(&self, w: &mut Writer<W>) -> Result<()> {
                    w.$write(*self)
                }
            }

            impl ReadFrom for $ty {
                fn read_from<S: ByteSource>(r: &mut Reader<S>) -> Result<Self> {
                    r.$read()
                }
            }
        )*
    };
}

scalar_impls! {
    u8 => write_u8, read_u8;
    u16 => write_u16, read_u16;
    u32 => write_u32, read_u32;
    u64 => write_u64, read_u64;
    usize => write_usize, read_usize;
    i8 => write_i8, read_i8;
    i16 => write_i16, read_i16;
    i32 => write_i32, read_i32;
    i64 => write_i64, read_i64;
    isize => write_isize, read_isize;
    f32 => write_f32, read_f32;
    f64 => write_f64, read_f64;
    bool => write_bool, read_bool;
}

impl WriteTo for str {
    fn write_to<W: Write>(&self, w: &mut Writer<W>) -> Result<()> {
        w.write_str(self)
    }
}

impl WriteTo for String {
    fn write_to<W: Write>(&self, w: &mut Writer<W>) -> Result<()> {
        w.write_str(self)
    }
}

impl ReadFrom for String {
    fn read_from<S: ByteSource>(r: &mut Reader<S>) -> Result<Self> {
        r.read_string()
    }
}

/// A count-prefixed sequence of elements.
impl<T: WriteTo> WriteTo for [T] {
    fn write_to<W: Write>(&self, w: &mut Writer<W>) -> Result<()> {
        w.write_seq(self)
    }
}

impl<T: WriteTo> WriteTo for Vec<T> {
    fn write_to<W: Write>(&self, w: &mut Writer<W>) -> Result<()> {
        w.write_seq(self)
    }
}

impl<T: ReadFrom> ReadFrom for Vec<T> {
    fn read_from<S: ByteSource>(r: &mut Reader<S>) -> Result<Self> {
        r.read_seq()
    }
}
