use http::{Method, Version};
use smallvec::SmallVec;
use std::io::{BufRead, Read};
use std::sync::Arc;
use tracing::debug;

use super::error::ProtocolError;

/// Maximum inline headers before heap allocation.
/// Most client-library requests carry well under 16 headers.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Hard cap on the number of request headers.
pub const MAX_HEADERS: usize = 32;

/// Stack-allocated header storage. Names are lowercased.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Request line and headers of one HTTP/1.x request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestHead {
    /// HTTP method (GET, POST, etc.)
    pub method: Method,
    /// Request target as sent, including any query string
    pub target: String,
    /// Target without the query string
    pub path: String,
    /// HTTP/1.0 or HTTP/1.1
    pub version: Version,
    /// HTTP headers (lowercase names, trimmed values)
    pub headers: HeaderVec,
    content_length: Option<usize>,
}

impl RequestHead {
    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Declared `Content-Length`, validated during parsing.
    #[must_use]
    pub fn content_length(&self) -> Option<usize> {
        self.content_length
    }

    /// Whether the final transfer coding is `chunked`.
    #[must_use]
    pub fn is_chunked(&self) -> bool {
        self.get_header("transfer-encoding")
            .and_then(|v| v.rsplit(',').next())
            .is_some_and(|coding| coding.trim().eq_ignore_ascii_case("chunked"))
    }

    /// Whether the request carries body bytes on the wire.
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.is_chunked() || self.content_length.unwrap_or(0) > 0
    }

    /// Media type of `Content-Type` without parameters, lowercased.
    #[must_use]
    pub fn media_type(&self) -> Option<String> {
        self.get_header("content-type")
            .and_then(|v| v.split(';').next())
            .map(|m| m.trim().to_ascii_lowercase())
    }

    /// Whether the client allows the connection to stay open afterwards.
    #[must_use]
    pub fn wants_keep_alive(&self) -> bool {
        let has_token = |token: &str| {
            self.get_header("connection").is_some_and(|v| {
                v.split(',')
                    .any(|t| t.trim().eq_ignore_ascii_case(token))
            })
        };
        match self.version {
            Version::HTTP_10 => has_token("keep-alive"),
            _ => !has_token("close"),
        }
    }
}

/// Read one request head from `reader`.
///
/// Returns `Ok(None)` when the peer closed the connection before sending a
/// request. Leading empty lines are skipped. Bytes after the blank line that
/// ends the head are left in `reader` for the payload reader.
pub fn read_request_head<R: BufRead>(
    reader: &mut R,
    max_bytes: usize,
) -> Result<Option<RequestHead>, ProtocolError> {
    let Some(raw) = buffer_head(reader, max_bytes)? else {
        return Ok(None);
    };

    let mut slots = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut slots);
    match req.parse(&raw) {
        Ok(httparse::Status::Complete(_)) => {}
        // the buffer always ends with the blank line
        Ok(httparse::Status::Partial) => return Err(ProtocolError::UnexpectedEof),
        Err(e) => return Err(parse_error(e, &raw)),
    }

    let malformed = || ProtocolError::RequestLine(request_line(&raw));
    let (Some(method), Some(target), Some(version)) = (req.method, req.path, req.version) else {
        return Err(malformed());
    };
    let method = Method::from_bytes(method.as_bytes()).map_err(|_| malformed())?;
    if !target.starts_with('/') {
        return Err(malformed());
    }
    let version = match version {
        0 => Version::HTTP_10,
        1 => Version::HTTP_11,
        _ => return Err(malformed()),
    };

    let mut headers = HeaderVec::new();
    for header in req.headers.iter() {
        let value = std::str::from_utf8(header.value)
            .map_err(|_| ProtocolError::HeaderLine(header.name.to_string()))?;
        headers.push((
            Arc::from(header.name.to_ascii_lowercase().as_str()),
            value.trim().to_string(),
        ));
    }

    let content_length = parse_content_length(&headers)?;
    let path = target.split('?').next().unwrap_or("/").to_string();

    debug!(
        method = %method,
        path = %path,
        http_version = ?version,
        headers_count = headers.len(),
        content_length = ?content_length,
        "HTTP request head parsed"
    );

    Ok(Some(RequestHead {
        method,
        target: target.to_string(),
        path,
        version,
        headers,
        content_length,
    }))
}

/// Collect raw head bytes up to and including the blank line.
///
/// Reads line by line so nothing past the head is taken out of `reader`.
fn buffer_head<R: BufRead>(reader: &mut R, max_bytes: usize) -> Result<Option<Vec<u8>>, ProtocolError> {
    let mut raw = Vec::new();
    let mut started = false;
    loop {
        let line_start = raw.len();
        let budget = u64::try_from(max_bytes - raw.len()).unwrap_or(u64::MAX);
        let read = reader.by_ref().take(budget).read_until(b'\n', &mut raw)?;
        let full = raw.len() >= max_bytes;

        if read == 0 || raw.last() != Some(&b'\n') {
            return if full {
                Err(ProtocolError::HeadTooLarge { limit: max_bytes })
            } else if started {
                Err(ProtocolError::UnexpectedEof)
            } else {
                Ok(None)
            };
        }

        let blank = matches!(&raw[line_start..], b"\r\n" | b"\n");
        match (blank, started) {
            (true, true) => return Ok(Some(raw)),
            (true, false) => {}
            (false, _) => started = true,
        }
    }
}

fn parse_error(err: httparse::Error, raw: &[u8]) -> ProtocolError {
    match err {
        httparse::Error::TooManyHeaders => ProtocolError::TooManyHeaders { limit: MAX_HEADERS },
        httparse::Error::HeaderName | httparse::Error::HeaderValue => {
            ProtocolError::HeaderLine(err.to_string())
        }
        _ => ProtocolError::RequestLine(request_line(raw)),
    }
}

/// First non-empty line of the head, for error reporting.
fn request_line(raw: &[u8]) -> String {
    raw.split(|b| *b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .find(|line| !line.is_empty())
        .map(|line| String::from_utf8_lossy(line).into_owned())
        .unwrap_or_default()
}

fn parse_content_length(headers: &HeaderVec) -> Result<Option<usize>, ProtocolError> {
    let mut length = None;
    for (_, value) in headers.iter().filter(|(k, _)| k.as_ref() == "content-length") {
        let parsed = value
            .parse::<usize>()
            .map_err(|_| ProtocolError::ContentLength(value.clone()))?;
        if length.is_some_and(|prev| prev != parsed) {
            return Err(ProtocolError::ContentLength(value.clone()));
        }
        length = Some(parsed);
    }
    Ok(length)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};

    const MAX: usize = 8 * 1024;

    fn parse(raw: &str) -> Result<Option<RequestHead>, ProtocolError> {
        read_request_head(&mut Cursor::new(raw.as_bytes()), MAX)
    }

    #[test]
    fn test_parse_simple_get() {
        let head = parse("GET /sessions/s/items?x=1 HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(head.method, Method::GET);
        assert_eq!(head.target, "/sessions/s/items?x=1");
        assert_eq!(head.path, "/sessions/s/items");
        assert_eq!(head.version, Version::HTTP_11);
        assert_eq!(head.get_header("HOST"), Some("localhost"));
        assert!(!head.has_body());
        assert!(head.wants_keep_alive());
    }

    #[test]
    fn test_body_left_in_reader() {
        let mut cursor = Cursor::new(
            &b"POST /newsession HTTP/1.1\r\nContent-Length: 4\r\nContent-Type: application/json; charset=utf-8\r\n\r\nbody"[..],
        );
        let head = read_request_head(&mut cursor, MAX).unwrap().unwrap();
        assert_eq!(head.content_length(), Some(4));
        assert_eq!(head.media_type().as_deref(), Some("application/json"));
        assert!(head.has_body());

        let mut rest = String::new();
        cursor.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "body");
    }

    #[test]
    fn test_chunked_detection() {
        let head = parse("POST / HTTP/1.1\r\nTransfer-Encoding: Chunked\r\n\r\n")
            .unwrap()
            .unwrap();
        assert!(head.is_chunked());
        assert!(head.has_body());

        let head = parse("POST / HTTP/1.1\r\nTransfer-Encoding: chunked, gzip\r\n\r\n")
            .unwrap()
            .unwrap();
        assert!(!head.is_chunked());
    }

    #[test]
    fn test_keep_alive_rules() {
        let close = parse("GET / HTTP/1.1\r\nConnection: close\r\n\r\n").unwrap().unwrap();
        assert!(!close.wants_keep_alive());

        let http10 = parse("GET / HTTP/1.0\r\n\r\n").unwrap().unwrap();
        assert!(!http10.wants_keep_alive());

        let http10_ka = parse("GET / HTTP/1.0\r\nConnection: Keep-Alive\r\n\r\n")
            .unwrap()
            .unwrap();
        assert!(http10_ka.wants_keep_alive());
    }

    #[test]
    fn test_clean_eof_and_leading_blank_lines() {
        assert!(parse("").unwrap().is_none());
        let head = parse("\r\n\r\nGET /quit HTTP/1.1\r\n\r\n").unwrap().unwrap();
        assert_eq!(head.path, "/quit");
    }

    #[test]
    fn test_malformed_request_lines() {
        for raw in [
            "GET\r\n\r\n",
            "GET /quit\r\n\r\n",
            "GET /quit HTTP/2.0\r\n\r\n",
            "GET quit HTTP/1.1\r\n\r\n",
            "GET /quit HTTP/1.1 extra\r\n\r\n",
            "G(T /quit HTTP/1.1\r\n\r\n",
        ] {
            let err = parse(raw).unwrap_err();
            assert!(matches!(err, ProtocolError::RequestLine(_)), "{raw:?}: {err}");
            assert!(err.is_head_error());
        }
    }

    #[test]
    fn test_malformed_headers() {
        let err = parse("GET / HTTP/1.1\r\nno-colon\r\n\r\n").unwrap_err();
        assert!(matches!(err, ProtocolError::HeaderLine(_)));
        let err = parse("GET / HTTP/1.1\r\nbad name: v\r\n\r\n").unwrap_err();
        assert!(matches!(err, ProtocolError::HeaderLine(_)));
    }

    #[test]
    fn test_invalid_content_length() {
        let err = parse("POST / HTTP/1.1\r\nContent-Length: ten\r\n\r\n").unwrap_err();
        assert!(matches!(err, ProtocolError::ContentLength(_)));
        let err = parse("POST / HTTP/1.1\r\nContent-Length: 1\r\nContent-Length: 2\r\n\r\n")
            .unwrap_err();
        assert!(matches!(err, ProtocolError::ContentLength(_)));
    }

    #[test]
    fn test_head_limits() {
        let huge = format!("GET /{} HTTP/1.1\r\n\r\n", "a".repeat(100));
        let err = read_request_head(&mut Cursor::new(huge.as_bytes()), 32).unwrap_err();
        assert!(matches!(err, ProtocolError::HeadTooLarge { limit: 32 }));

        let mut full = String::from("GET / HTTP/1.1\r\n");
        for i in 0..MAX_HEADERS {
            full.push_str(&format!("x-h{i}: v\r\n"));
        }
        full.push_str("\r\n");
        assert_eq!(parse(&full).unwrap().unwrap().headers.len(), MAX_HEADERS);

        let mut many = String::from("GET / HTTP/1.1\r\n");
        for i in 0..=MAX_HEADERS {
            many.push_str(&format!("x-h{i}: v\r\n"));
        }
        many.push_str("\r\n");
        let err = parse(&many).unwrap_err();
        assert!(matches!(err, ProtocolError::TooManyHeaders { .. }));
    }

    #[test]
    fn test_truncated_head() {
        let err = parse("GET / HTTP/1.1\r\nHost: x\r\n").unwrap_err();
        assert!(matches!(err, ProtocolError::UnexpectedEof));
        assert!(!err.is_head_error());
    }
}
