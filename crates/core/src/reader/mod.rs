//! MJPEG frame reader.
//!
//! Pulls one part at a time out of a `multipart/x-mixed-replace` body. The
//! caller opens the connection, consumes the top-level response head, and
//! hands the reader a [`BufRead`] positioned at the first part.
//!
//! ## Reader state machine
//!
//! ```text
//!                 header block with length N
//! AwaitingHeader ---------------------------> AwaitingPayload { Some(N) }
//!       ^      \                                     |
//!       |       \ no length, boundary known          | N bytes + 2-byte trailer
//!       |        `--------> AwaitingPayload { None } |
//!       |                          | scan to delimiter
//!       `--------------------------+-----------------'
//!
//! end of stream / close delimiter / no length and no boundary -> Finished
//! ```
//!
//! Every read cycle returns a [`ReadOutcome`], so running out of stream and
//! meeting a part the reader cannot delimit are told apart from each other
//! and from real errors.

pub mod frame;
pub mod part;

use std::io::BufRead;
use std::thread;
use std::time::Duration;

use crate::error::{MjpegError, Result};
use crate::protocol::{Boundary, Delimiter, HeaderBlock, parse_length};
pub use frame::{Frame, FrameRun, Framing, ReadOutcome, StopReason};
pub use part::{
    DEFAULT_MAX_HEADER_BYTES, HeaderRead, Payload, next_header_block, read_frame_payload,
    read_header_block, read_until_boundary,
};

/// Default ceiling on a single frame payload.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Reader configuration.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Boundary from the response `Content-Type`. Enables delimiter
    /// scanning for parts that carry no `Content-Length`.
    pub boundary: Option<Boundary>,
    /// Reject a length-delimited payload whose trailer is not `\r\n`
    /// instead of logging it.
    pub strict_trailer: bool,
    pub max_header_bytes: usize,
    pub max_payload_bytes: usize,
    /// Pause between frames in [`FrameReader::read_frame_paced`] and
    /// [`FrameReader::read_n_frames`].
    pub frame_delay: Option<Duration>,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            boundary: None,
            strict_trailer: false,
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            frame_delay: None,
        }
    }
}

/// Where the reader is within the current part.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// Reading header lines up to a blank line.
    AwaitingHeader,
    /// Reading the payload: `Some(n)` for `n` bytes plus trailer, `None`
    /// for a scan up to the next delimiter.
    AwaitingPayload { length: Option<usize> },
    /// End of stream, close delimiter, undelimitable part, or a previous error.
    Finished,
}

/// Incremental multipart frame reader over a blocking stream.
///
/// Pass `&mut stream` to keep the stream after reading, or move it in and
/// take it back with [`into_inner`](Self::into_inner).
pub struct FrameReader<R> {
    stream: R,
    config: ReaderConfig,
    state: ReaderState,
    frames_read: usize,
}

impl<R: BufRead> FrameReader<R> {
    pub fn new(stream: R) -> Self {
        Self::with_config(stream, ReaderConfig::default())
    }

    pub fn with_config(stream: R, config: ReaderConfig) -> Self {
        Self {
            stream,
            config,
            state: ReaderState::AwaitingHeader,
            frames_read: 0,
        }
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    /// Number of frames produced so far.
    pub fn frames_read(&self) -> usize {
        self.frames_read
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn get_ref(&self) -> &R {
        &self.stream
    }

    pub fn into_inner(self) -> R {
        self.stream
    }

    /// Run one read cycle: a header block, then its payload.
    ///
    /// Any error leaves the reader [`Finished`](ReaderState::Finished),
    /// since the stream position is no longer known.
    pub fn read_frame(&mut self) -> Result<ReadOutcome> {
        let outcome = self.step();
        if outcome.is_err() {
            self.state = ReaderState::Finished;
        }
        outcome
    }

    /// [`read_frame`](Self::read_frame), preceded by the configured
    /// `frame_delay` once at least one frame has been produced.
    pub fn read_frame_paced(&mut self) -> Result<ReadOutcome> {
        if self.frames_read > 0 && self.state != ReaderState::Finished {
            if let Some(delay) = self.config.frame_delay {
                thread::sleep(delay);
            }
        }
        self.read_frame()
    }

    /// Read up to `n` frames, stopping early at end of stream or at a part
    /// that cannot be delimited.
    pub fn read_n_frames(&mut self, n: usize) -> Result<FrameRun> {
        let mut frames = Vec::new();

        for _ in 0..n {
            match self.read_frame_paced()? {
                ReadOutcome::Frame(frame) => frames.push(frame),
                ReadOutcome::EndOfStream => {
                    return Ok(FrameRun {
                        frames,
                        stop: StopReason::EndOfStream,
                    });
                }
                ReadOutcome::UnsupportedFraming(headers) => {
                    return Ok(FrameRun {
                        frames,
                        stop: StopReason::UnsupportedFraming(headers),
                    });
                }
            }
        }

        Ok(FrameRun {
            frames,
            stop: StopReason::Completed,
        })
    }

    fn step(&mut self) -> Result<ReadOutcome> {
        if self.state == ReaderState::Finished {
            return Ok(ReadOutcome::EndOfStream);
        }

        // Blank lines are only padding before the first part of the body.
        let header = read_header_block(
            &mut self.stream,
            self.config.boundary.as_ref(),
            self.config.max_header_bytes,
            self.frames_read == 0,
        )?;

        if header.end_of_stream && header.block.is_empty() {
            tracing::debug!(frames = self.frames_read, "end of stream");
            self.state = ReaderState::Finished;
            return Ok(ReadOutcome::EndOfStream);
        }

        let block = header.block;
        tracing::debug!(
            index = self.frames_read,
            headers = %block.text().trim_end(),
            "part header"
        );

        // Content-Length: 0 carries no image; treat it like a missing length.
        if let Some(length) = parse_length(&block).filter(|&length| length > 0) {
            return self.read_length_delimited(block, length);
        }

        match self.config.boundary.clone() {
            Some(boundary) => self.read_boundary_delimited(block, &boundary),
            None => {
                tracing::debug!(
                    index = self.frames_read,
                    "part has no Content-Length and no boundary is known"
                );
                self.state = ReaderState::Finished;
                Ok(ReadOutcome::UnsupportedFraming(block))
            }
        }
    }

    fn read_length_delimited(&mut self, headers: HeaderBlock, length: usize) -> Result<ReadOutcome> {
        if length > self.config.max_payload_bytes {
            return Err(MjpegError::LimitExceeded {
                what: "payload",
                limit: self.config.max_payload_bytes,
            });
        }

        self.state = ReaderState::AwaitingPayload {
            length: Some(length),
        };
        let payload = read_frame_payload(&mut self.stream, length)?;

        if payload.trailer != b"\r\n" {
            if self.config.strict_trailer {
                return Err(MjpegError::FramingViolation {
                    trailer: payload.trailer,
                });
            }
            tracing::warn!(
                index = self.frames_read,
                trailer = ?payload.trailer,
                "unexpected bytes after payload"
            );
        }

        self.state = ReaderState::AwaitingHeader;
        Ok(ReadOutcome::Frame(self.emit(
            headers,
            payload.data,
            payload.trailer,
            Framing::ContentLength,
        )))
    }

    fn read_boundary_delimited(
        &mut self,
        headers: HeaderBlock,
        boundary: &Boundary,
    ) -> Result<ReadOutcome> {
        self.state = ReaderState::AwaitingPayload { length: None };
        let scanned = read_until_boundary(&mut self.stream, boundary, self.config.max_payload_bytes)?;

        self.state = match scanned.delimiter {
            Some(Delimiter::Part) => ReaderState::AwaitingHeader,
            Some(Delimiter::Close) | None => ReaderState::Finished,
        };

        if scanned.delimiter.is_none() && scanned.data.is_empty() {
            return Ok(ReadOutcome::EndOfStream);
        }

        Ok(ReadOutcome::Frame(self.emit(
            headers,
            scanned.data,
            Vec::new(),
            Framing::Boundary,
        )))
    }

    fn emit(
        &mut self,
        headers: HeaderBlock,
        payload: Vec<u8>,
        trailer: Vec<u8>,
        framing: Framing,
    ) -> Frame {
        let frame = Frame {
            index: self.frames_read,
            headers,
            payload,
            trailer,
            framing,
        };
        self.frames_read += 1;
        tracing::debug!(index = frame.index, bytes = frame.len(), ?framing, "frame");
        frame
    }
}

/// Yields frames until end of stream or an undelimitable part. An error is
/// yielded once, after which the iterator is exhausted.
impl<R: BufRead> Iterator for FrameReader<R> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_frame() {
            Ok(ReadOutcome::Frame(frame)) => Some(Ok(frame)),
            Ok(ReadOutcome::EndOfStream | ReadOutcome::UnsupportedFraming(_)) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

/// Read up to `n` frames from `stream` with the given configuration.
pub fn read_n_frames<R: BufRead>(stream: R, n: usize, config: ReaderConfig) -> Result<FrameRun> {
    FrameReader::with_config(stream, config).read_n_frames(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    fn part(len_header: bool, payload: &[u8]) -> Vec<u8> {
        let mut out = b"--frame\r\nContent-Type: image/jpeg\r\n".to_vec();
        if len_header {
            out.extend_from_slice(format!("Content-Length: {}\r\n", payload.len()).as_bytes());
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(payload);
        out.extend_from_slice(b"\r\n");
        out
    }

    fn boundary_config() -> ReaderConfig {
        ReaderConfig {
            boundary: Some(Boundary::new("frame")),
            ..ReaderConfig::default()
        }
    }

    #[test]
    fn single_part_scenario() {
        let wire: &[u8] = b"Content-Type: image/jpeg\r\nContent-Length: 4\r\n\r\nABCD\r\n";
        let mut cursor = Cursor::new(wire);

        let header = next_header_block(&mut cursor).unwrap();
        assert_eq!(
            header.block.raw(),
            b"Content-Type: image/jpeg\r\nContent-Length: 4\r\n"
        );
        let length = parse_length(&header.block).unwrap();
        assert_eq!(length, 4);

        let payload = read_frame_payload(&mut cursor, length).unwrap();
        assert_eq!(payload.data, b"ABCD");
        assert_eq!(payload.trailer, b"\r\n");
        assert_eq!(cursor.position() as usize, wire.len());
    }

    #[test]
    fn reads_exactly_n_frames_and_stops_at_next_part() {
        let payloads: [&[u8]; 4] = [b"one", b"two", b"three", b"four"];
        let mut wire = Vec::new();
        for payload in payloads {
            wire.extend(part(true, payload));
        }
        let mut cursor = Cursor::new(wire);

        let run = read_n_frames(&mut cursor, 3, ReaderConfig::default()).unwrap();
        assert_eq!(run.stop, StopReason::Completed);
        let read: Vec<&[u8]> = run.frames.iter().map(|f| f.payload.as_slice()).collect();
        assert_eq!(read, payloads[..3]);
        assert!(run.frames.iter().all(|f| f.framing == Framing::ContentLength));
        assert_eq!(run.frames[2].index, 2);

        let mut rest = Vec::new();
        cursor.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, part(true, b"four"));
    }

    #[test]
    fn stops_at_end_of_stream() {
        let mut wire = part(true, b"a");
        wire.extend(part(true, b"b"));
        let mut reader = FrameReader::new(Cursor::new(wire));

        let run = reader.read_n_frames(5).unwrap();
        assert_eq!(run.frames.len(), 2);
        assert_eq!(run.stop, StopReason::EndOfStream);
        assert_eq!(reader.state(), ReaderState::Finished);
        assert_eq!(reader.read_frame().unwrap(), ReadOutcome::EndOfStream);
    }

    #[test]
    fn stops_before_payload_without_length() {
        let mut wire = part(true, b"first");
        wire.extend(part(false, b"second"));
        let mut cursor = Cursor::new(wire);

        let run = read_n_frames(&mut cursor, 5, ReaderConfig::default()).unwrap();
        assert_eq!(run.frames.len(), 1);
        assert_eq!(run.frames[0].payload, b"first");
        match run.stop {
            StopReason::UnsupportedFraming(headers) => {
                assert_eq!(headers.content_type(), Some("image/jpeg"));
            }
            other => panic!("unexpected stop: {:?}", other),
        }

        let mut rest = Vec::new();
        cursor.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"second\r\n");
    }

    #[test]
    fn no_length_header_scenario() {
        let wire: &[u8] = b"Content-Type: image/jpeg\r\n\r\n\xff\xd8...";
        let mut reader = FrameReader::new(Cursor::new(wire));
        match reader.read_frame().unwrap() {
            ReadOutcome::UnsupportedFraming(headers) => assert_eq!(parse_length(&headers), None),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(reader.frames_read(), 0);
        assert_eq!(reader.get_ref().position(), 28);
    }

    #[test]
    fn zero_length_is_not_a_frame() {
        let wire: &[u8] = b"Content-Length: 0\r\n\r\n\r\n";
        let mut reader = FrameReader::new(Cursor::new(wire));
        assert!(matches!(
            reader.read_frame().unwrap(),
            ReadOutcome::UnsupportedFraming(_)
        ));
    }

    #[test]
    fn boundary_fallback() {
        let mut wire = part(false, b"\xff\xd8first\xff\xd9");
        wire.extend(part(true, b"second"));
        wire.extend(part(false, b"third\r\nwith break"));
        wire.extend_from_slice(b"--frame--\r\n");

        let run = read_n_frames(Cursor::new(wire), 10, boundary_config()).unwrap();
        assert_eq!(run.stop, StopReason::EndOfStream);
        assert_eq!(run.frames.len(), 3);
        assert_eq!(run.frames[0].framing, Framing::Boundary);
        assert!(run.frames[0].looks_like_jpeg());
        assert_eq!(run.frames[1].framing, Framing::ContentLength);
        assert_eq!(run.frames[1].payload, b"second");
        assert_eq!(run.frames[2].payload, b"third\r\nwith break");
    }

    #[test]
    fn boundary_fallback_with_empty_part_headers() {
        let wire: &[u8] = b"--frame\r\n\r\nAAA\r\n--frame\r\n\r\nBBB\r\n--frame--\r\n";

        let run = read_n_frames(Cursor::new(wire), 5, boundary_config()).unwrap();
        let payloads: Vec<&[u8]> = run.frames.iter().map(|f| f.payload.as_slice()).collect();
        assert_eq!(payloads, [&b"AAA"[..], &b"BBB"[..]]);
        assert!(run.frames.iter().all(|f| f.headers.is_empty()));
        assert_eq!(run.stop, StopReason::EndOfStream);
    }

    #[test]
    fn leading_padding_skipped_before_first_part() {
        let wire: &[u8] = b"\r\n\r\n--frame\r\nContent-Length: 2\r\n\r\nhi\r\n";
        let mut reader = FrameReader::new(Cursor::new(wire));
        let frame = reader.next().unwrap().unwrap();
        assert_eq!(frame.payload, b"hi");
    }

    #[test]
    fn boundary_payload_ends_at_eof() {
        let wire = part(false, b"only");
        let mut reader = FrameReader::with_config(Cursor::new(wire), boundary_config());

        let frame = match reader.read_frame().unwrap() {
            ReadOutcome::Frame(frame) => frame,
            other => panic!("unexpected outcome: {:?}", other),
        };
        assert_eq!(frame.payload, b"only");
        assert_eq!(reader.state(), ReaderState::Finished);
        assert_eq!(reader.read_frame().unwrap(), ReadOutcome::EndOfStream);
    }

    #[test]
    fn permissive_trailer() {
        let wire: &[u8] = b"Content-Length: 4\r\n\r\nABCDXY";
        let mut reader = FrameReader::new(Cursor::new(wire));
        let frame = reader.next().unwrap().unwrap();
        assert_eq!(frame.payload, b"ABCD");
        assert_eq!(frame.trailer, b"XY");
        assert!(!frame.trailer_ok());
    }

    #[test]
    fn strict_trailer() {
        let wire: &[u8] = b"Content-Length: 4\r\n\r\nABCDXY";
        let config = ReaderConfig {
            strict_trailer: true,
            ..ReaderConfig::default()
        };
        let mut reader = FrameReader::with_config(Cursor::new(wire), config);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, MjpegError::FramingViolation { ref trailer } if trailer == b"XY"));
        assert_eq!(reader.state(), ReaderState::Finished);
    }

    #[test]
    fn truncated_payload_is_an_error() {
        let wire: &[u8] = b"Content-Length: 100\r\n\r\nshort";
        let mut reader = FrameReader::new(Cursor::new(wire));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(
            err,
            MjpegError::Truncated {
                expected: 100,
                read: 5
            }
        ));
    }

    #[test]
    fn oversized_length_rejected() {
        let wire: &[u8] = b"Content-Length: 1000\r\n\r\n";
        let config = ReaderConfig {
            max_payload_bytes: 10,
            ..ReaderConfig::default()
        };
        let mut reader = FrameReader::with_config(Cursor::new(wire), config);
        assert!(matches!(
            reader.read_frame(),
            Err(MjpegError::LimitExceeded { limit: 10, .. })
        ));
    }

    #[test]
    fn iterator_collects_frames() {
        let mut wire = part(true, b"x");
        wire.extend(part(true, b"yy"));
        let frames: Vec<Frame> = FrameReader::new(Cursor::new(wire))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].len(), 2);
    }

    #[test]
    fn frame_delay_between_frames() {
        let mut wire = part(true, b"x");
        wire.extend(part(true, b"y"));
        let config = ReaderConfig {
            frame_delay: Some(Duration::from_millis(20)),
            ..ReaderConfig::default()
        };

        let started = std::time::Instant::now();
        let run = read_n_frames(Cursor::new(wire), 2, config).unwrap();
        assert_eq!(run.frames.len(), 2);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
