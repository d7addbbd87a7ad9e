use std::io::{BufRead, Read};

use crate::error::{MjpegError, ParseErrorKind, Result};
use crate::protocol::{Boundary, HeaderBlock};

/// Upper bound on the status line plus headers of an HTTP response.
pub const MAX_RESPONSE_HEAD_BYTES: usize = 64 * 1024;

/// A parsed HTTP response head (RFC 9112 §4).
///
/// ```text
/// HTTP/1.0 200 OK\r\n
/// Content-Type: multipart/x-mixed-replace; boundary=frame\r\n
/// Cache-Control: no-cache\r\n
/// \r\n
/// ```
#[derive(Debug, Clone)]
pub struct ResponseHead {
    /// Protocol version from the status line (e.g. `HTTP/1.1`).
    pub version: String,
    pub status_code: u16,
    /// Reason phrase; may be empty.
    pub reason: String,
    pub headers: HeaderBlock,
}

impl ResponseHead {
    /// Parse a response head from its text representation: status line,
    /// header lines, optional trailing blank line.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let text = String::from_utf8_lossy(raw);
        let text = text.trim_start_matches(['\r', '\n']);
        let (status_line, header_text) = text.split_once('\n').unwrap_or((text, ""));

        if status_line.trim().is_empty() {
            return Err(MjpegError::Parse {
                kind: ParseErrorKind::EmptyResponse,
            });
        }

        let mut parts = status_line.trim().splitn(3, ' ');
        let version = parts.next().unwrap_or_default();
        let code = parts.next().unwrap_or_default();
        let reason = parts.next().unwrap_or_default().trim();

        if !version.starts_with("HTTP/") {
            return Err(MjpegError::Parse {
                kind: ParseErrorKind::InvalidStatusLine,
            });
        }
        let status_code = code.parse::<u16>().map_err(|_| MjpegError::Parse {
            kind: ParseErrorKind::InvalidStatusLine,
        })?;

        Ok(ResponseHead {
            version: version.to_string(),
            status_code,
            reason: reason.to_string(),
            headers: HeaderBlock::parse(header_text.as_bytes().to_vec()),
        })
    }

    /// Read a response head off the wire, stopping right after the blank
    /// line so the body stays unread in `reader`.
    pub fn read_from<R: BufRead>(reader: &mut R) -> Result<Self> {
        let mut raw = Vec::new();
        loop {
            let mut line = Vec::new();
            let remaining = (MAX_RESPONSE_HEAD_BYTES - raw.len()) as u64;
            let n = reader.by_ref().take(remaining).read_until(b'\n', &mut line)?;
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&line);
            if raw.len() >= MAX_RESPONSE_HEAD_BYTES {
                return Err(MjpegError::LimitExceeded {
                    what: "response head",
                    limit: MAX_RESPONSE_HEAD_BYTES,
                });
            }
            if line == b"\r\n" || line == b"\n" {
                break;
            }
        }

        if raw.is_empty() {
            return Err(MjpegError::Parse {
                kind: ParseErrorKind::EmptyResponse,
            });
        }
        Self::parse(&raw)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.content_type()
    }

    /// The multipart boundary, if this is a multipart response.
    pub fn boundary(&self) -> Option<Boundary> {
        self.content_type().and_then(Boundary::from_content_type)
    }
}
