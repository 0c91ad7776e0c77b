use http::StatusCode;
use std::io::{self, Write};

use crate::dispatcher::{HandlerResponse, ResponseBody};
use crate::ids::RequestId;

/// Media type of JSON response bodies.
pub const JSON_CONTENT_TYPE: &str = "application/json";
/// Media type of plain-text response bodies.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

fn status_reason(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown")
}

/// Serialize `response` as an HTTP/1.1 message.
///
/// Every response carries `Content-Length`, `Connection` and `X-Request-Id`.
/// A `204` has neither `Content-Type` nor body bytes.
pub fn encode_response(
    response: &HandlerResponse,
    request_id: &RequestId,
    keep_alive: bool,
) -> io::Result<Vec<u8>> {
    let (content_type, body) = match &response.body {
        ResponseBody::Json(value) => (Some(JSON_CONTENT_TYPE), serde_json::to_vec(value)?),
        ResponseBody::Text(text) => (Some(TEXT_CONTENT_TYPE), text.as_bytes().to_vec()),
        ResponseBody::Empty => (None, Vec::new()),
    };
    let no_content = response.status == StatusCode::NO_CONTENT;

    let mut out = Vec::with_capacity(body.len() + 160);
    write!(
        out,
        "HTTP/1.1 {} {}\r\n",
        response.status.as_u16(),
        status_reason(response.status)
    )?;
    if let (Some(content_type), false) = (content_type, no_content) {
        write!(out, "Content-Type: {content_type}\r\n")?;
    }
    if !no_content {
        write!(out, "Content-Length: {}\r\n", body.len())?;
    }
    write!(
        out,
        "Connection: {}\r\nX-Request-Id: {request_id}\r\n\r\n",
        if keep_alive { "keep-alive" } else { "close" }
    )?;
    if !no_content {
        out.extend_from_slice(&body);
    }
    Ok(out)
}

/// Write `response` to `writer` and flush.
pub fn write_response<W: Write>(
    writer: &mut W,
    response: &HandlerResponse,
    request_id: &RequestId,
    keep_alive: bool,
) -> io::Result<()> {
    let bytes = encode_response(response, request_id, keep_alive)?;
    writer.write_all(&bytes)?;
    writer.flush()
}
