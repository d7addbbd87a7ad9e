use crate::protocol::HeaderBlock;

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];

/// How a frame's payload was delimited on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Exactly `Content-Length` bytes, followed by a 2-byte trailer.
    ContentLength,
    /// Everything up to the next boundary delimiter line.
    Boundary,
}

/// One decoded part of a multipart stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Zero-based position of this frame within the reader's lifetime.
    pub index: usize,
    /// The part's header block.
    pub headers: HeaderBlock,
    /// Image bytes.
    pub payload: Vec<u8>,
    /// Bytes consumed after a length-delimited payload (expected `\r\n`).
    /// Empty for boundary-delimited frames.
    pub trailer: Vec<u8>,
    pub framing: Framing,
}

impl Frame {
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Whether the trailer was the expected CRLF. Always true for
    /// boundary-delimited frames.
    pub fn trailer_ok(&self) -> bool {
        match self.framing {
            Framing::ContentLength => self.trailer == b"\r\n",
            Framing::Boundary => true,
        }
    }

    /// Cheap sanity check: SOI marker at the start and EOI at the end.
    pub fn looks_like_jpeg(&self) -> bool {
        self.payload.len() >= 4
            && self.payload.starts_with(&JPEG_SOI)
            && self.payload.ends_with(&JPEG_EOI)
    }
}

/// Result of one read cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Frame(Frame),
    /// The stream ended (or sent a close delimiter) at a part boundary.
    EndOfStream,
    /// The part has no usable `Content-Length` and no boundary is known,
    /// so its payload cannot be located. Carries the offending headers.
    UnsupportedFraming(HeaderBlock),
}

/// Why a multi-frame read stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// All requested frames were read.
    Completed,
    EndOfStream,
    UnsupportedFraming(HeaderBlock),
}

/// Frames collected by [`FrameReader::read_n_frames`](super::FrameReader::read_n_frames).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRun {
    pub frames: Vec<Frame>,
    pub stop: StopReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(payload: &[u8], trailer: &[u8], framing: Framing) -> Frame {
        Frame {
            index: 0,
            headers: HeaderBlock::default(),
            payload: payload.to_vec(),
            trailer: trailer.to_vec(),
            framing,
        }
    }

    #[test]
    fn jpeg_markers() {
        assert!(frame(&[0xFF, 0xD8, 0x00, 0xFF, 0xD9], b"\r\n", Framing::ContentLength).looks_like_jpeg());
        assert!(!frame(b"ABCD", b"\r\n", Framing::ContentLength).looks_like_jpeg());
        assert!(!frame(&[0xFF, 0xD8, 0xD9], b"\r\n", Framing::ContentLength).looks_like_jpeg());
    }

    #[test]
    fn trailer_check() {
        assert!(frame(b"x", b"\r\n", Framing::ContentLength).trailer_ok());
        assert!(!frame(b"x", b"--", Framing::ContentLength).trailer_ok());
        assert!(frame(b"x", b"", Framing::Boundary).trailer_ok());
    }
}
