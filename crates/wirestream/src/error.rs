use wirestream_source::SourceError;

/// Boxed error returned by caller-supplied marshal hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while reading or writing a stream.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The source ran out of bytes before the value was complete.
    #[error("stream truncated (incomplete value)")]
    Truncated,

    /// A varint, or a native-width integer, does not fit the target type.
    #[error("integer overflows its target type")]
    Overflow,

    /// The sink accepted fewer bytes than requested, or refused the write.
    ///
    /// `written` and `expected` describe the chunk that failed, not the whole
    /// value: a string's length prefix and payload are separate chunks. The
    /// writer's `offset()` holds the running total of accepted bytes.
    #[error("short write ({written} of {expected} bytes accepted)")]
    ShortWrite {
        written: usize,
        expected: usize,
        source: Option<std::io::Error>,
    },

    /// A length or count prefix exceeds the configured maximum.
    #[error("length prefix too large ({len}, max {max})")]
    LengthTooLarge { len: u64, max: usize },

    /// A string payload is not valid UTF-8.
    #[error("string is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// Error returned unchanged from a caller-supplied marshal or parse hook.
    #[error(transparent)]
    Delegate(BoxError),

    /// JSON serialization/deserialization error.
    #[cfg(feature = "json")]
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The underlying source failed.
    #[error("stream I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap an error coming out of a caller-supplied hook.
    pub fn delegate(err: impl Into<BoxError>) -> Self {
        Error::Delegate(err.into())
    }
}

impl From<SourceError> for Error {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Truncated => Error::Truncated,
            SourceError::Overflow => Error::Overflow,
            SourceError::Io(io) => Error::Io(io),
        }
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Error::InvalidUtf8(err.utf8_error())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
