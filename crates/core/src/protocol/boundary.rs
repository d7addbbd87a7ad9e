/// Multipart boundary taken from a `Content-Type` header (RFC 2046 §5.1.1).
///
/// Parts in the body are separated by delimiter lines:
///
/// ```text
/// --myboundary\r\n        <- delimiter
/// Content-Type: image/jpeg\r\n
/// \r\n
/// <jpeg bytes>\r\n
/// --myboundary--\r\n      <- close delimiter (optional for endless streams)
/// ```
///
/// Some cameras declare `boundary=--myboundary` and then emit
/// `--myboundary` on the wire. Both spellings are accepted when the
/// declared token already starts with `--`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    token: String,
}

/// What a delimiter line signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// Another part follows.
    Part,
    /// `--boundary--`: no more parts.
    Close,
}

impl Boundary {
    pub fn new(token: &str) -> Self {
        Boundary {
            token: token.to_string(),
        }
    }

    /// Extract the boundary from a multipart `Content-Type` value.
    ///
    /// ```
    /// use mjpeg::protocol::Boundary;
    ///
    /// let b = Boundary::from_content_type("multipart/x-mixed-replace; boundary=\"frame\"").unwrap();
    /// assert_eq!(b.token(), "frame");
    /// assert!(Boundary::from_content_type("image/jpeg").is_none());
    /// ```
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let mut params = content_type.split(';');
        let media_type = params.next()?.trim();
        if !media_type.to_ascii_lowercase().starts_with("multipart/") {
            return None;
        }

        params.find_map(|param| {
            let (name, value) = param.split_once('=')?;
            if !name.trim().eq_ignore_ascii_case("boundary") {
                return None;
            }
            let token = value.trim().trim_matches('"');
            (!token.is_empty()).then(|| Boundary::new(token))
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Classify a line read from the body. Trailing CR/LF and transport
    /// padding are ignored.
    pub fn classify(&self, line: &[u8]) -> Option<Delimiter> {
        let line = trim_line_end(line);
        let candidates = [Some(self.token.as_bytes()), self.bare_token()];

        for dashless in candidates.into_iter().flatten() {
            let Some(rest) = line.strip_prefix(b"--".as_slice()) else {
                continue;
            };
            let Some(rest) = rest.strip_prefix(dashless) else {
                continue;
            };
            match rest {
                b"" => return Some(Delimiter::Part),
                b"--" => return Some(Delimiter::Close),
                _ => {}
            }
        }
        None
    }

    fn bare_token(&self) -> Option<&[u8]> {
        self.token
            .strip_prefix("--")
            .filter(|rest| !rest.is_empty())
            .map(str::as_bytes)
    }
}

pub(crate) fn trim_line_end(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\r' | b'\n' | b' ' | b'\t') {
        end -= 1;
    }
    &line[..end]
}
