//! HTTP and multipart wire formats.
//!
//! This module handles the text-based parts of an MJPEG stream: the
//! top-level HTTP response head, the multipart boundary it declares, and
//! the per-part header blocks.
//!
//! ## MJPEG over HTTP
//!
//! The server answers a plain GET with a `multipart/x-mixed-replace` body
//! that never ends. Each part replaces the previous image:
//!
//! ```text
//! HTTP/1.0 200 OK\r\n
//! Content-Type: multipart/x-mixed-replace; boundary=frame\r\n
//! \r\n
//! --frame\r\n
//! Content-Type: image/jpeg\r\n
//! Content-Length: 48213\r\n
//! \r\n
//! <48213 bytes of JPEG>\r\n
//! --frame\r\n
//! ...
//! ```
//!
//! | Piece | Type | Reference |
//! |-------|------|-----------|
//! | Status line + headers | [`ResponseHead`] | RFC 9112 §4 |
//! | `boundary=` parameter | [`Boundary`] | RFC 2046 §5.1.1 |
//! | Part headers | [`HeaderBlock`] | RFC 2046 §5.1 |
//!
//! `Content-Length` on a part is not required by RFC 2046 but nearly every
//! MJPEG server sends it; the reader uses it when present and falls back to
//! boundary scanning otherwise.

pub mod boundary;
pub mod headers;
pub mod response;

pub use boundary::{Boundary, Delimiter};
pub use headers::{HeaderBlock, parse_length};
pub use response::ResponseHead;
