//! Low-level part readers. Each function consumes exactly one piece of a
//! part from a blocking stream and leaves the cursor right after it.

use std::io::{BufRead, ErrorKind, Read};

use crate::error::{MjpegError, Result};
use crate::protocol::boundary::trim_line_end;
use crate::protocol::{Boundary, Delimiter, HeaderBlock};

/// Default ceiling on one part's header block.
pub const DEFAULT_MAX_HEADER_BYTES: usize = 16 * 1024;

/// Payload buffers start at most this large and grow as bytes arrive.
const INITIAL_PAYLOAD_CAPACITY: usize = 64 * 1024;

/// A header block and whether the stream ended while reading it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRead {
    pub block: HeaderBlock,
    /// True when no terminating blank line was seen, either because the
    /// stream hit EOF or because a close delimiter arrived.
    pub end_of_stream: bool,
}

/// The bytes of a length-delimited payload and the two bytes after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub data: Vec<u8>,
    /// Expected to be `\r\n`; shorter than 2 bytes only at end of stream.
    pub trailer: Vec<u8>,
}

/// A boundary-delimited payload and what stopped the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scanned {
    pub data: Vec<u8>,
    /// `None` when the stream ended without a delimiter.
    pub delimiter: Option<Delimiter>,
}

/// Read one part header block with the default size limit and no known
/// boundary. The stream is taken to be between parts, so an empty line
/// straight away yields an empty block.
pub fn next_header_block<R: BufRead>(stream: &mut R) -> Result<HeaderRead> {
    read_header_block(stream, None, DEFAULT_MAX_HEADER_BYTES, false)
}

/// Read lines until a blank line, returning everything before it.
///
/// Delimiter lines that precede the first header line belong to the
/// multipart envelope and are skipped. The first blank line ends the
/// block, even when no header line came before it. The one exception is
/// the body preamble (`in_preamble`): before the first delimiter of the
/// body, blank lines are padding. A close delimiter ends the stream.
///
/// When `boundary` is `None`, any colon-free line starting with `--` is
/// taken as a delimiter.
pub fn read_header_block<R: BufRead>(
    stream: &mut R,
    boundary: Option<&Boundary>,
    max_bytes: usize,
    in_preamble: bool,
) -> Result<HeaderRead> {
    let mut raw = Vec::new();
    let mut consumed = 0usize;
    let mut after_delimiter = false;

    loop {
        let remaining = max_bytes.saturating_sub(consumed);
        if remaining == 0 {
            return Err(header_limit(max_bytes));
        }

        let mut line = Vec::new();
        let n = stream
            .by_ref()
            .take(remaining as u64)
            .read_until(b'\n', &mut line)?;
        if n == 0 {
            return Ok(HeaderRead {
                block: HeaderBlock::parse(raw),
                end_of_stream: true,
            });
        }
        consumed += n;
        if n == remaining && !line.ends_with(b"\n") {
            return Err(header_limit(max_bytes));
        }

        let blank = line == b"\r\n" || line == b"\n";

        if raw.is_empty() {
            if blank {
                if in_preamble && !after_delimiter {
                    continue;
                }
                break;
            }
            match delimiter_kind(&line, boundary) {
                Some(Delimiter::Part) => {
                    after_delimiter = true;
                    continue;
                }
                Some(Delimiter::Close) => {
                    return Ok(HeaderRead {
                        block: HeaderBlock::default(),
                        end_of_stream: true,
                    });
                }
                None => {}
            }
        }

        if blank {
            break;
        }
        raw.extend_from_slice(&line);
    }

    Ok(HeaderRead {
        block: HeaderBlock::parse(raw),
        end_of_stream: false,
    })
}

/// Read exactly `length` payload bytes, then the 2-byte trailer.
///
/// Partial reads are retried until `length` bytes arrived. If the stream
/// ends first, [`MjpegError::Truncated`] reports how far it got. The buffer
/// grows with the bytes actually received, so an inflated `length` costs
/// nothing up front. The trailer is returned as read and not checked here.
pub fn read_frame_payload<R: Read>(stream: &mut R, length: usize) -> Result<Payload> {
    let mut data = Vec::with_capacity(length.min(INITIAL_PAYLOAD_CAPACITY));
    stream
        .by_ref()
        .take(length as u64)
        .read_to_end(&mut data)?;
    let read = data.len();
    if read < length {
        return Err(MjpegError::Truncated {
            expected: length,
            read,
        });
    }

    let mut trailer = [0u8; 2];
    let trailer_len = fill(stream, &mut trailer)?;

    Ok(Payload {
        data,
        trailer: trailer[..trailer_len].to_vec(),
    })
}

/// Collect bytes up to the next delimiter line of `boundary`.
///
/// The line break right before the delimiter belongs to the delimiter
/// (RFC 2046 §5.1.1) and is stripped from the payload. The delimiter line
/// itself is consumed.
pub fn read_until_boundary<R: BufRead>(
    stream: &mut R,
    boundary: &Boundary,
    max_bytes: usize,
) -> Result<Scanned> {
    // Room for the CRLF that precedes the delimiter.
    let limit = max_bytes.saturating_add(2);
    let mut data = Vec::new();

    loop {
        let remaining = limit.saturating_sub(data.len());
        if remaining == 0 {
            return Err(MjpegError::LimitExceeded {
                what: "payload",
                limit: max_bytes,
            });
        }

        let mut line = Vec::new();
        let n = stream
            .by_ref()
            .take(remaining as u64)
            .read_until(b'\n', &mut line)?;
        if n == 0 {
            strip_line_break(&mut data);
            return Ok(Scanned {
                data,
                delimiter: None,
            });
        }

        if let Some(delimiter) = boundary.classify(&line) {
            strip_line_break(&mut data);
            return Ok(Scanned {
                data,
                delimiter: Some(delimiter),
            });
        }
        data.extend_from_slice(&line);
    }
}

fn delimiter_kind(line: &[u8], boundary: Option<&Boundary>) -> Option<Delimiter> {
    if let Some(boundary) = boundary {
        return boundary.classify(line);
    }

    let line = trim_line_end(line);
    if line.len() <= 2 || !line.starts_with(b"--") || line.contains(&b':') {
        return None;
    }
    if line.len() > 4 && line.ends_with(b"--") {
        Some(Delimiter::Close)
    } else {
        Some(Delimiter::Part)
    }
}

fn strip_line_break(data: &mut Vec<u8>) {
    if data.ends_with(b"\r\n") {
        data.truncate(data.len() - 2);
    } else if data.ends_with(b"\n") {
        data.truncate(data.len() - 1);
    }
}

/// Read until `buf` is full or the stream ends. Returns bytes read.
fn fill<R: Read>(stream: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match stream.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

fn header_limit(max_bytes: usize) -> MjpegError {
    MjpegError::LimitExceeded {
        what: "part header block",
        limit: max_bytes,
    }
}
