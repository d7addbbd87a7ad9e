//! Diagnostic probes against an MJPEG-over-HTTP endpoint.
//!
//! Each probe opens one connection, gathers what it saw into a report, and
//! closes the connection. Printing is left to the caller.
//!
//! | Probe | What it reports |
//! |-------|-----------------|
//! | [`dump`] | Status, response headers, first N body bytes |
//! | [`read_frames`] | Status, response headers, then per-frame summaries |

use std::io::Read;
use std::time::Duration;

use crate::error::Result;
use crate::protocol::ResponseHead;
use crate::reader::{FrameReader, Framing, ReadOutcome, ReaderConfig};
use crate::transport::HttpConnection;

/// Static image served by the local debug server.
pub const DEFAULT_IMAGE_URL: &str = "http://localhost:9876/screen.jpg";
/// MJPEG stream served by the local debug server.
pub const DEFAULT_STREAM_URL: &str = "http://localhost:9876/stream.mjpeg";

/// Probe configuration.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Connect and per-read socket timeout.
    pub timeout: Duration,
    /// Body bytes captured by [`dump`].
    pub preview_bytes: usize,
    /// Frames requested by [`read_frames`].
    pub frames: usize,
    /// Pause between frames in [`read_frames`].
    pub frame_delay: Option<Duration>,
    /// Fail on a non-CRLF trailer instead of reporting it.
    pub strict_trailer: bool,
    /// Fall back to boundary scanning when a part has no `Content-Length`.
    pub boundary_fallback: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            preview_bytes: 100,
            frames: 5,
            frame_delay: Some(Duration::from_millis(100)),
            strict_trailer: false,
            boundary_fallback: true,
        }
    }
}

/// What [`dump`] saw.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub url: String,
    pub head: ResponseHead,
    /// Up to `preview_bytes` of the body.
    pub preview: Vec<u8>,
}

/// One frame as seen by [`read_frames`]. The payload itself is dropped.
#[derive(Debug, Clone)]
pub struct FrameSummary {
    pub index: usize,
    /// Part header block as text.
    pub header_text: String,
    pub payload_len: usize,
    pub trailer: Vec<u8>,
    pub framing: Framing,
    pub jpeg: bool,
}

/// Why [`read_frames`] stopped.
#[derive(Debug)]
pub enum FramesStop {
    /// All requested frames were read.
    Completed,
    EndOfStream,
    /// A part had no usable `Content-Length`; carries its header text.
    UnsupportedFraming(String),
    /// Reading failed after `frames` were already collected.
    Failed(crate::MjpegError),
}

/// What [`read_frames`] saw.
#[derive(Debug)]
pub struct FramesReport {
    pub url: String,
    pub head: ResponseHead,
    pub frames: Vec<FrameSummary>,
    pub stop: FramesStop,
}

impl FramesReport {
    pub fn completed(&self) -> bool {
        matches!(self.stop, FramesStop::Completed)
    }
}

/// Fetch `url` and capture its status, headers, and the first
/// `preview_bytes` of the body.
pub fn dump(url: &str, config: &ProbeConfig) -> Result<ProbeReport> {
    let mut conn = HttpConnection::open(url, config.timeout)?;

    let mut preview = Vec::with_capacity(config.preview_bytes);
    conn.body()
        .take(config.preview_bytes as u64)
        .read_to_end(&mut preview)?;

    tracing::debug!(url, bytes = preview.len(), "captured body preview");

    Ok(ProbeReport {
        url: url.to_string(),
        head: conn.head,
        preview,
    })
}

/// Fetch `url` and read up to `config.frames` frames from its multipart
/// body.
///
/// Connection and response-head failures are returned as errors. Once the
/// body is being read, failures end the run and are reported in
/// [`FramesReport::stop`] alongside the frames read before them.
pub fn read_frames(url: &str, config: &ProbeConfig) -> Result<FramesReport> {
    let conn = HttpConnection::open(url, config.timeout)?;
    let (head, body) = conn.into_parts();

    let boundary = if config.boundary_fallback {
        head.boundary()
    } else {
        None
    };
    if head.boundary().is_none() {
        tracing::warn!(
            url,
            content_type = head.content_type().unwrap_or(""),
            "response is not multipart"
        );
    }

    let reader_config = ReaderConfig {
        boundary,
        strict_trailer: config.strict_trailer,
        frame_delay: config.frame_delay,
        ..ReaderConfig::default()
    };
    let mut reader = FrameReader::with_config(body, reader_config);

    let mut frames = Vec::new();
    let mut stop = FramesStop::Completed;

    // Summaries are collected one at a time so frames read before a
    // failure are still reported.
    for _ in 0..config.frames {
        match reader.read_frame_paced() {
            Ok(ReadOutcome::Frame(frame)) => frames.push(FrameSummary {
                index: frame.index,
                header_text: frame.headers.text().trim_end().to_string(),
                payload_len: frame.len(),
                jpeg: frame.looks_like_jpeg(),
                trailer: frame.trailer,
                framing: frame.framing,
            }),
            Ok(ReadOutcome::EndOfStream) => {
                stop = FramesStop::EndOfStream;
                break;
            }
            Ok(ReadOutcome::UnsupportedFraming(headers)) => {
                stop = FramesStop::UnsupportedFraming(headers.text().trim_end().to_string());
                break;
            }
            Err(e) => {
                tracing::warn!(url, frames = frames.len(), error = %e, "frame read failed");
                stop = FramesStop::Failed(e);
                break;
            }
        }
    }

    Ok(FramesReport {
        url: url.to_string(),
        head,
        frames,
        stop,
    })
}
