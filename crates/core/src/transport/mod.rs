//! Network transport for fetching MJPEG streams.
//!
//! - **HTTP** ([`http`]): one blocking TCP connection per request. Sends a
//!   GET, parses the response head, and hands back the socket as a
//!   buffered body reader for [`FrameReader`](crate::reader::FrameReader).
//!
//! Only plain `http://` is handled; cameras and local debug servers rarely
//! speak anything else.

pub mod http;

pub use http::{HttpConnection, HttpUrl};
