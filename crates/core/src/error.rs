//! Error types for the MJPEG reader library.

use std::fmt;

/// Errors that can occur while fetching or reading an MJPEG stream.
///
/// Variants map to specific failure modes across the stack:
///
/// - **Transport**: [`Io`](Self::Io), [`InvalidUrl`](Self::InvalidUrl).
/// - **HTTP**: [`Parse`](Self::Parse) for a malformed response head.
/// - **Framing**: [`Truncated`](Self::Truncated),
///   [`FramingViolation`](Self::FramingViolation),
///   [`LimitExceeded`](Self::LimitExceeded).
///
/// Reaching the end of the stream, or a part that carries no usable
/// length, is not an error. Those come back as
/// [`ReadOutcome`](crate::reader::ReadOutcome) variants.
#[derive(Debug, thiserror::Error)]
pub enum MjpegError {
    /// Underlying I/O or socket error, including read/connect timeouts.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the HTTP response head.
    #[error("HTTP parse error: {kind}")]
    Parse { kind: ParseErrorKind },

    /// URL could not be understood (only `http://host[:port][/path]` is supported).
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The stream ended before a length-delimited payload was complete.
    #[error("stream truncated: expected {expected} payload bytes, read {read}")]
    Truncated { expected: usize, read: usize },

    /// Strict mode only: the two bytes after a payload were not `\r\n`.
    #[error("framing violation: expected CRLF after payload, got {trailer:?}")]
    FramingViolation { trailer: Vec<u8> },

    /// A header block or payload grew past its configured ceiling.
    #[error("{what} exceeded limit of {limit} bytes")]
    LimitExceeded { what: &'static str, limit: usize },
}

/// Specific kind of HTTP response parse failure.
#[derive(Debug)]
pub enum ParseErrorKind {
    /// The connection closed before a status line arrived.
    EmptyResponse,
    /// Status line did not have the expected `HTTP/x.y CODE [Reason]` format.
    InvalidStatusLine,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyResponse => write!(f, "empty response"),
            Self::InvalidStatusLine => write!(f, "invalid status line"),
        }
    }
}

/// Convenience alias for `Result<T, MjpegError>`.
pub type Result<T> = std::result::Result<T, MjpegError>;
