use std::fmt;
use std::io::{BufReader, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{MjpegError, Result};
use crate::protocol::ResponseHead;

/// Client identification sent in every request.
pub const USER_AGENT: &str = "mjpeg-rs/0.1";

/// An `http://` URL split into the pieces needed to open a connection.
///
/// ## Examples
///
/// ```
/// use mjpeg::transport::HttpUrl;
///
/// let url = HttpUrl::parse("http://localhost:9876/stream.mjpeg").unwrap();
/// assert_eq!(url.host, "localhost");
/// assert_eq!(url.port, 9876);
/// assert_eq!(url.path, "/stream.mjpeg");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpUrl {
    /// Host name or address, without IPv6 brackets.
    pub host: String,
    pub port: u16,
    /// Path plus query, always starting with `/`.
    pub path: String,
}

impl HttpUrl {
    pub fn parse(url: &str) -> Result<Self> {
        let invalid = |reason: &str| MjpegError::InvalidUrl(format!("{}: {}", reason, url));

        let (scheme, rest) = url.split_once("://").ok_or_else(|| invalid("missing scheme"))?;
        if !scheme.eq_ignore_ascii_case("http") {
            return Err(invalid("only http:// is supported"));
        }

        let rest = rest.split('#').next().unwrap_or_default();
        let (authority, path) = match rest.find(['/', '?']) {
            Some(pos) => (&rest[..pos], &rest[pos..]),
            None => (rest, "/"),
        };
        let path = if path.starts_with('?') {
            format!("/{}", path)
        } else {
            path.to_string()
        };

        if authority.contains('@') {
            return Err(invalid("credentials in URL are not supported"));
        }

        let (host, port) = if let Some(bracketed) = authority.strip_prefix('[') {
            let (host, after) = bracketed
                .split_once(']')
                .ok_or_else(|| invalid("unterminated IPv6 address"))?;
            let port = match after.strip_prefix(':') {
                Some(port) => Some(port),
                None if after.is_empty() => None,
                None => return Err(invalid("unexpected characters after IPv6 address")),
            };
            (host, port)
        } else {
            match authority.rsplit_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (authority, None),
            }
        };

        if host.is_empty() {
            return Err(invalid("missing host"));
        }
        let port = match port {
            Some(port) => port.parse::<u16>().map_err(|_| invalid("invalid port"))?,
            None => 80,
        };

        Ok(HttpUrl {
            host: host.to_string(),
            port,
            path,
        })
    }

    /// Value for the `Host` request header.
    pub fn host_header(&self) -> String {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        if self.port == 80 {
            host
        } else {
            format!("{}:{}", host, self.port)
        }
    }

    /// Serialize a GET request for this URL.
    ///
    /// HTTP/1.0 keeps servers from switching to chunked transfer coding,
    /// so the body on the wire is the multipart stream itself.
    pub fn get_request(&self) -> String {
        format!(
            "GET {} HTTP/1.0\r\nHost: {}\r\nUser-Agent: {}\r\nAccept: */*\r\nConnection: close\r\n\r\n",
            self.path,
            self.host_header(),
            USER_AGENT
        )
    }
}

impl fmt::Display for HttpUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "http://{}{}", self.host_header(), self.path)
    }
}

/// An open HTTP response: the parsed head plus the unread body.
///
/// The body reader owns the socket; dropping the connection closes it.
pub struct HttpConnection {
    pub head: ResponseHead,
    body: BufReader<TcpStream>,
    peer_addr: SocketAddr,
}

impl HttpConnection {
    /// Connect, send a GET, and read the response head.
    ///
    /// `timeout` bounds the connect and every subsequent socket read or
    /// write. Non-2xx statuses are returned, not treated as errors.
    pub fn open(url: &str, timeout: Duration) -> Result<Self> {
        let url = HttpUrl::parse(url)?;
        let stream = connect(&url, timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        let peer_addr = stream.peer_addr()?;

        let mut writer = stream.try_clone()?;
        writer.write_all(url.get_request().as_bytes())?;
        writer.flush()?;

        let mut body = BufReader::new(stream);
        let head = ResponseHead::read_from(&mut body)?;

        tracing::info!(
            %peer_addr,
            status = head.status_code,
            content_type = head.content_type().unwrap_or(""),
            "connected"
        );

        Ok(Self {
            head,
            body,
            peer_addr,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// The response body, positioned right after the head.
    pub fn body(&mut self) -> &mut BufReader<TcpStream> {
        &mut self.body
    }

    pub fn into_parts(self) -> (ResponseHead, BufReader<TcpStream>) {
        (self.head, self.body)
    }
}

fn connect(url: &HttpUrl, timeout: Duration) -> Result<TcpStream> {
    let mut last_error = None;

    for addr in (url.host.as_str(), url.port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::debug!(%addr, error = %e, "connect attempt failed");
                last_error = Some(e);
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no addresses for {}", url.host),
            )
        })
        .into())
}
