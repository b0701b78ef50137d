/// Errors that can occur while pulling bytes out of a source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The source ran out of bytes before the requested value was complete.
    #[error("source exhausted before value was complete")]
    Truncated,

    /// A varint needs more than 64 bits.
    #[error("varint overflows a 64-bit integer")]
    Overflow,

    /// The underlying supplier failed with something other than end of input.
    #[error("source I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SourceError>;
