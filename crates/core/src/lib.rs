pub mod error;
pub mod probe;
pub mod protocol;
pub mod reader;
pub mod transport;

pub use error::{MjpegError, Result};
pub use protocol::{Boundary, HeaderBlock, ResponseHead};
pub use reader::{Frame, FrameReader, FrameRun, ReadOutcome, ReaderConfig, StopReason};
pub use transport::HttpConnection;
