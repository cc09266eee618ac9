//! Response serialization onto the session socket.

use crate::dispatcher::HandlerResponse;
use serde_json::Value;
use std::io::{self, Write};

const SERVER_NAME: &str = "tunedeck";

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        409 => "Conflict",
        500 => "Internal Server Error",
        _ => "OK",
    }
}

/// Serialize and flush one response.
///
/// The status line advertises HTTP/1.1; `keep_alive` decides the
/// `Connection` header. Headers the handler set are written as-is, except
/// that framing headers (`content-length`, `connection`) are always owned by
/// this function.
pub fn write_response<W: Write>(
    stream: &mut W,
    response: &HandlerResponse,
    keep_alive: bool,
) -> io::Result<()> {
    let body = match &response.body {
        Value::Null => Vec::new(),
        Value::String(s) => s.clone().into_bytes(),
        other => serde_json::to_vec(other)?,
    };

    let mut head = String::with_capacity(128);
    head.push_str("HTTP/1.1 ");
    head.push_str(&response.status.to_string());
    head.push(' ');
    head.push_str(status_reason(response.status));
    head.push_str("\r\n");

    head.push_str("Server: ");
    head.push_str(SERVER_NAME);
    head.push_str("\r\n");

    let mut wrote_content_type = false;
    for (name, value) in &response.headers {
        if name.as_ref() == "content-length" || name.as_ref() == "connection" {
            continue;
        }
        if name.as_ref() == "content-type" {
            wrote_content_type = true;
        }
        head.push_str(name);
        head.push_str(": ");
        head.push_str(value);
        head.push_str("\r\n");
    }
    if !wrote_content_type && !body.is_empty() {
        head.push_str("Content-Type: application/json\r\n");
    }

    head.push_str("Content-Length: ");
    head.push_str(&body.len().to_string());
    head.push_str("\r\n");
    head.push_str(if keep_alive {
        "Connection: keep-alive\r\n"
    } else {
        "Connection: close\r\n"
    });
    head.push_str("\r\n");

    stream.write_all(head.as_bytes())?;
    stream.write_all(&body)?;
    stream.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(404), "Not Found");
        assert_eq!(status_reason(409), "Conflict");
    }

    #[test]
    fn writes_head_body_and_framing_headers() {
        let response = HandlerResponse::json(200, serde_json::json!({ "ok": true }));
        let mut out = Vec::new();
        write_response(&mut out, &response, true).expect("write");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("content-type: application/json\r\n"));
        assert!(text.contains("Content-Length: 11\r\n"));
        assert!(text.contains("Connection: keep-alive\r\n"));
        assert!(text.ends_with("{\"ok\":true}"));
    }

    #[test]
    fn close_advertises_connection_close() {
        let response = HandlerResponse::error(404, "Not found");
        let mut out = Vec::new();
        write_response(&mut out, &response, false).expect("write");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("Connection: close\r\n"));
    }

    #[test]
    fn null_body_writes_zero_length() {
        let response = HandlerResponse {
            status: 204,
            headers: Default::default(),
            body: Value::Null,
        };
        let mut out = Vec::new();
        write_response(&mut out, &response, true).expect("write");
        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("Content-Length: 0\r\n"));
    }
}
