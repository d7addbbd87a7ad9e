use std::borrow::Cow;

/// A block of `Name: Value` header lines, as found at the top of an HTTP
/// response or at the start of every part in a multipart body.
///
/// ```text
/// Content-Type: image/jpeg\r\n
/// Content-Length: 48213\r\n
/// \r\n
/// ```
///
/// The raw bytes are kept verbatim for inspection. The parsed pairs are
/// built once, from a lossy UTF-8 decode, so malformed header text never
/// fails. Lines without a colon are dropped from the pairs but stay in
/// [`raw`](Self::raw). Continuation lines (leading space or tab) are
/// folded into the previous value.
///
/// Header lookup is case-insensitive per RFC 9110 §5.1.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBlock {
    raw: Vec<u8>,
    /// Headers as ordered (name, value) pairs. Names are stored as-received;
    /// lookups via [`get_header`](Self::get_header) are case-insensitive.
    pub headers: Vec<(String, String)>,
}

impl HeaderBlock {
    /// Build a header block from raw header bytes (terminating blank line
    /// excluded).
    pub fn parse(raw: Vec<u8>) -> Self {
        let mut headers: Vec<(String, String)> = Vec::new();

        for line in String::from_utf8_lossy(&raw).lines() {
            if line.trim().is_empty() {
                continue;
            }

            if line.starts_with([' ', '\t']) {
                if let Some((_, value)) = headers.last_mut() {
                    if !value.is_empty() {
                        value.push(' ');
                    }
                    value.push_str(line.trim());
                }
                continue;
            }

            let Some(colon_pos) = line.find(':') else {
                tracing::debug!(line, "skipping header line without colon");
                continue;
            };

            let name = line[..colon_pos].trim().to_string();
            let value = line[colon_pos + 1..].trim().to_string();
            headers.push((name, value));
        }

        HeaderBlock { raw, headers }
    }

    /// The header bytes exactly as read from the stream.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Lossy text view of [`raw`](Self::raw), for logging.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.raw)
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Look up a header value by name (case-insensitive). The first
    /// occurrence wins.
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.get_header("Content-Type")
    }

    /// Shorthand for [`parse_length`].
    pub fn content_length(&self) -> Option<usize> {
        parse_length(self)
    }
}

/// Extract the payload length from a part's `Content-Length` header.
///
/// Returns `None` when the header is absent or its value is not a
/// non-negative integer. A present but unparsable value is logged.
pub fn parse_length(block: &HeaderBlock) -> Option<usize> {
    let value = block.get_header("Content-Length")?;
    match value.parse::<usize>() {
        Ok(length) => Some(length),
        Err(_) => {
            tracing::warn!(value, "ignoring unparsable Content-Length");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(raw: &str) -> HeaderBlock {
        HeaderBlock::parse(raw.as_bytes().to_vec())
    }

    #[test]
    fn parses_part_headers() {
        let b = block("Content-Type: image/jpeg\r\nContent-Length: 4\r\n");
        assert_eq!(b.headers.len(), 2);
        assert_eq!(b.content_type(), Some("image/jpeg"));
        assert_eq!(b.content_length(), Some(4));
    }

    #[test]
    fn lookup_case_insensitive() {
        let b = block("content-length: 42\r\n");
        assert_eq!(b.get_header("Content-Length"), Some("42"));
        assert_eq!(b.get_header("CONTENT-LENGTH"), Some("42"));
        assert_eq!(parse_length(&b), Some(42));
    }

    #[test]
    fn length_values() {
        for n in [0usize, 1, 4, 65_535, 10_000_000] {
            let b = block(&format!("Content-Length: {}\r\n", n));
            assert_eq!(parse_length(&b), Some(n));
        }
    }

    #[test]
    fn missing_or_bad_length() {
        assert_eq!(parse_length(&block("Content-Type: image/jpeg\r\n")), None);
        assert_eq!(parse_length(&block("Content-Length: -3\r\n")), None);
        assert_eq!(parse_length(&block("Content-Length: lots\r\n")), None);
    }

    #[test]
    fn value_whitespace_trimmed() {
        let b = block("Content-Length:    17   \r\n");
        assert_eq!(parse_length(&b), Some(17));
    }

    #[test]
    fn value_keeps_later_colons() {
        let b = block("X-Timestamp: 12:30:01\r\n");
        assert_eq!(b.get_header("x-timestamp"), Some("12:30:01"));
    }

    #[test]
    fn folded_value_is_joined() {
        let b = block("X-Note: first\r\n  second\r\nContent-Length: 2\r\n");
        assert_eq!(b.get_header("X-Note"), Some("first second"));
        assert_eq!(b.content_length(), Some(2));
    }

    #[test]
    fn invalid_utf8_does_not_fail() {
        let mut raw = b"X-Junk: \xff\xfe\r\n".to_vec();
        raw.extend_from_slice(b"Content-Length: 9\r\n");
        let b = HeaderBlock::parse(raw.clone());
        assert_eq!(b.raw(), raw.as_slice());
        assert_eq!(b.content_length(), Some(9));
        assert!(b.get_header("X-Junk").is_some());
    }

    #[test]
    fn line_without_colon_is_skipped() {
        let b = block("garbage\r\nContent-Length: 3\r\n");
        assert_eq!(b.headers.len(), 1);
        assert_eq!(b.content_length(), Some(3));
    }

    #[test]
    fn first_duplicate_wins() {
        let b = block("Content-Length: 5\r\nContent-Length: 6\r\n");
        assert_eq!(b.content_length(), Some(5));
    }
}
