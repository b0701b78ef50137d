//! Optional sink capabilities.
//!
//! Every sink is a `std::io::Write`, which already covers writing and
//! flushing. Closing has no std trait, so sinks that can be closed opt in
//! through [`Close`] and are handed to [`Writer::closable`].
//!
//! [`Writer::closable`]: crate::Writer::closable

use std::io;
use std::net::Shutdown;

/// A sink that can be closed explicitly.
pub trait Close {
    /// Close the sink. Further writes are expected to fail.
    fn close(&mut self) -> io::Result<()>;
}

impl<T: Close + ?Sized> Close for &mut T {
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl<T: Close + ?Sized> Close for Box<T> {
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// Shuts down the write half; the peer observes end of stream.
impl Close for std::net::TcpStream {
    fn close(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Write)
    }
}

/// Shuts down the write half; the peer observes end of stream.
#[cfg(unix)]
impl Close for std::os::unix::net::UnixStream {
    fn close(&mut self) -> io::Result<()> {
        self.shutdown(Shutdown::Write)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    #[test]
    #[cfg(unix)]
    fn closing_unix_stream_signals_eof() {
        let (mut left, mut right) = std::os::unix::net::UnixStream::pair().unwrap();
        Close::close(&mut left).unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(right.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn boxed_sink_forwards_close() {
        struct Flag(bool);

        impl Close for Flag {
            fn close(&mut self) -> io::Result<()> {
                self.0 = true;
                Ok(())
            }
        }

        let mut boxed = Box::new(Flag(false));
        boxed.close().unwrap();
        assert!(boxed.0);
    }
}
