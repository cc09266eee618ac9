//! Wire-level request type and the blocking read/parse loop.
//!
//! One call to [`read_request`] consumes exactly one HTTP/1.1 message from
//! the stream: the header block is parsed with `httparse`, then
//! `Content-Length` body bytes are read. Bytes past the end of the message
//! stay in the session's buffer for the next cycle on a keep-alive
//! connection.

use crate::dispatcher::HeaderVec;
use crate::router::ParamVec;
use http::Method;
use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;
use tracing::debug;

/// Maximum header count accepted per request. 32 handles modern API
/// gateway/proxy traffic.
pub const MAX_HEADERS: usize = 32;

/// Cap on the header block; a peer that sends more without completing a
/// header block is not speaking HTTP.
const MAX_HEADER_BYTES: usize = 16 * 1024;

/// Cap on the declared body size.
const MAX_BODY_BYTES: usize = 1024 * 1024;

const READ_CHUNK: usize = 4096;

/// One parsed request as it came off the wire.
#[derive(Debug)]
pub struct HttpRequest {
    pub method: Method,
    /// Raw request target, including any query component
    pub path: String,
    /// HTTP/1.x minor version (0 or 1)
    pub version_minor: u8,
    /// Headers with lowercased names
    pub headers: HeaderVec,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Get a header by (lowercase-stored) name, case-insensitively.
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// The request target without its query component.
    #[must_use]
    pub fn path_only(&self) -> &str {
        self.path.split('?').next().unwrap_or("/")
    }

    /// Whether the connection should carry another request after this one.
    ///
    /// HTTP/1.1 defaults to keep-alive unless the request says `close`;
    /// HTTP/1.0 defaults to close unless the request says `keep-alive`.
    #[must_use]
    pub fn keep_alive(&self) -> bool {
        match self.get_header("connection") {
            Some(v) if v.eq_ignore_ascii_case("close") => false,
            Some(v) if v.eq_ignore_ascii_case("keep-alive") => true,
            _ => self.version_minor == 1,
        }
    }

    /// Query string parameters, URL-decoded.
    #[must_use]
    pub fn query_params(&self) -> ParamVec {
        let Some(pos) = self.path.find('?') else {
            return ParamVec::new();
        };
        url::form_urlencoded::parse(self.path[pos + 1..].as_bytes())
            .map(|(k, v)| (Arc::from(k.as_ref()), v.to_string()))
            .collect()
    }

    /// Parse the body as JSON. Returns `None` when the body is empty or not
    /// valid JSON; handlers that require a body respond 400 themselves.
    #[must_use]
    pub fn json_body(&self) -> Option<serde_json::Value> {
        if self.body.is_empty() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }
}

/// What one read cycle produced.
#[derive(Debug)]
pub enum ReadOutcome {
    /// One complete request message.
    Request(HttpRequest),
    /// The peer closed the connection cleanly between requests.
    Eof,
}

/// Why a read cycle failed.
#[derive(Debug)]
pub enum ReadError {
    /// Transport fault, including a mid-message disconnect.
    Io(io::Error),
    /// The bytes on the wire do not form an HTTP/1.1 message.
    Malformed(String),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::Io(e) => write!(f, "read error: {e}"),
            ReadError::Malformed(msg) => write!(f, "malformed request: {msg}"),
        }
    }
}

impl std::error::Error for ReadError {}

/// Parsed header block, copied out of the buffer so the buffer can be
/// drained afterwards.
struct Head {
    header_len: usize,
    method: Method,
    path: String,
    version_minor: u8,
    headers: HeaderVec,
    content_length: usize,
}

/// Read one complete request message from `stream`.
///
/// `buf` persists across calls on the same connection; leftover bytes from a
/// previous read (an eagerly-sent next request) are consumed before the
/// stream is touched again.
pub fn read_request<R: Read>(stream: &mut R, buf: &mut Vec<u8>) -> Result<ReadOutcome, ReadError> {
    let mut chunk = [0u8; READ_CHUNK];

    let head = loop {
        if let Some(head) = parse_head(buf)? {
            break head;
        }
        if buf.len() > MAX_HEADER_BYTES {
            return Err(ReadError::Malformed(format!(
                "header block exceeds {MAX_HEADER_BYTES} bytes"
            )));
        }

        let n = stream.read(&mut chunk).map_err(ReadError::Io)?;
        if n == 0 {
            if buf.is_empty() {
                return Ok(ReadOutcome::Eof);
            }
            // The peer vanished in the middle of a message.
            return Err(ReadError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed mid-request",
            )));
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let total_len = head.header_len + head.content_length;
    while buf.len() < total_len {
        let n = stream.read(&mut chunk).map_err(ReadError::Io)?;
        if n == 0 {
            return Err(ReadError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed mid-body",
            )));
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = buf[head.header_len..total_len].to_vec();
    buf.drain(..total_len);

    debug!(
        method = %head.method,
        path = %head.path,
        body_bytes = body.len(),
        "Request message read"
    );

    Ok(ReadOutcome::Request(HttpRequest {
        method: head.method,
        path: head.path,
        version_minor: head.version_minor,
        headers: head.headers,
        body,
    }))
}

/// Try to parse a complete header block out of `buf`. `Ok(None)` means more
/// bytes are needed.
fn parse_head(buf: &[u8]) -> Result<Option<Head>, ReadError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut parsed = httparse::Request::new(&mut headers);

    let header_len = match parsed.parse(buf) {
        Ok(httparse::Status::Complete(n)) => n,
        Ok(httparse::Status::Partial) => return Ok(None),
        Err(e) => return Err(ReadError::Malformed(e.to_string())),
    };

    let method: Method = parsed
        .method
        .ok_or_else(|| ReadError::Malformed("missing method".to_string()))?
        .parse()
        .map_err(|_| ReadError::Malformed("unrecognized method".to_string()))?;
    let path = parsed
        .path
        .ok_or_else(|| ReadError::Malformed("missing request target".to_string()))?
        .to_string();
    let version_minor = parsed.version.unwrap_or(1);

    let mut header_vec = HeaderVec::new();
    for h in parsed.headers.iter() {
        header_vec.push((
            Arc::from(h.name.to_ascii_lowercase().as_str()),
            String::from_utf8_lossy(h.value).to_string(),
        ));
    }

    if header_vec
        .iter()
        .any(|(k, _)| k.as_ref() == "transfer-encoding")
    {
        return Err(ReadError::Malformed(
            "transfer-encoding is not supported".to_string(),
        ));
    }

    let content_length = match header_vec
        .iter()
        .find(|(k, _)| k.as_ref() == "content-length")
    {
        Some((_, v)) => v
            .trim()
            .parse::<usize>()
            .map_err(|_| ReadError::Malformed("invalid content-length".to_string()))?,
        None => 0,
    };
    if content_length > MAX_BODY_BYTES {
        return Err(ReadError::Malformed(format!(
            "declared body of {content_length} bytes exceeds {MAX_BODY_BYTES}"
        )));
    }

    Ok(Some(Head {
        header_len,
        method,
        path,
        version_minor,
        headers: header_vec,
        content_length,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read_one(raw: &[u8]) -> Result<ReadOutcome, ReadError> {
        let mut stream = Cursor::new(raw.to_vec());
        let mut buf = Vec::new();
        read_request(&mut stream, &mut buf)
    }

    #[test]
    fn parses_request_with_body() {
        let raw = b"POST /users/register HTTP/1.1\r\nHost: x\r\nContent-Length: 2\r\n\r\n{}";
        match read_one(raw) {
            Ok(ReadOutcome::Request(req)) => {
                assert_eq!(req.method, Method::POST);
                assert_eq!(req.path, "/users/register");
                assert_eq!(req.body, b"{}");
                assert!(req.keep_alive());
            }
            other => panic!("expected request, got {other:?}"),
        }
    }

    #[test]
    fn clean_eof_between_requests() {
        assert!(matches!(read_one(b""), Ok(ReadOutcome::Eof)));
    }

    #[test]
    fn eof_mid_message_is_a_transport_error() {
        assert!(matches!(
            read_one(b"GET /part"),
            Err(ReadError::Io(_))
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            read_one(b"\x00\x01\x02garbage\r\n\r\n"),
            Err(ReadError::Malformed(_))
        ));
    }

    #[test]
    fn leftover_bytes_carry_to_the_next_request() {
        let raw = b"GET /a HTTP/1.1\r\n\r\nGET /b HTTP/1.1\r\n\r\n".to_vec();
        let mut stream = Cursor::new(raw);
        let mut buf = Vec::new();
        let first = read_request(&mut stream, &mut buf).expect("first");
        let second = read_request(&mut stream, &mut buf).expect("second");
        match (first, second) {
            (ReadOutcome::Request(a), ReadOutcome::Request(b)) => {
                assert_eq!(a.path, "/a");
                assert_eq!(b.path, "/b");
            }
            other => panic!("expected two requests, got {other:?}"),
        }
    }

    #[test]
    fn connection_close_disables_keep_alive() {
        let raw = b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n";
        match read_one(raw) {
            Ok(ReadOutcome::Request(req)) => assert!(!req.keep_alive()),
            other => panic!("expected request, got {other:?}"),
        }
    }

    #[test]
    fn http_10_defaults_to_close() {
        let raw = b"GET / HTTP/1.0\r\n\r\n";
        match read_one(raw) {
            Ok(ReadOutcome::Request(req)) => assert!(!req.keep_alive()),
            other => panic!("expected request, got {other:?}"),
        }
    }

    #[test]
    fn query_params_are_decoded() {
        let raw = b"GET /songs?limit=10&q=hello%20world HTTP/1.1\r\n\r\n";
        match read_one(raw) {
            Ok(ReadOutcome::Request(req)) => {
                let params = req.query_params();
                assert_eq!(req.path_only(), "/songs");
                assert_eq!(params[0].1, "10");
                assert_eq!(params[1].1, "hello world");
            }
            other => panic!("expected request, got {other:?}"),
        }
    }

    #[test]
    fn oversized_body_declaration_is_rejected() {
        let raw = b"POST / HTTP/1.1\r\nContent-Length: 999999999\r\n\r\n";
        assert!(matches!(read_one(raw), Err(ReadError::Malformed(_))));
    }
}
