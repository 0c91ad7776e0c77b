use serde_json::{Map, Value};
use std::io::{BufRead, Read};
use tracing::debug;

use super::chunked::decode_chunked;
use super::error::ProtocolError;
use super::request::RequestHead;

/// Media type required for a `Content-Length` delimited JSON payload.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Decoded JSON object payload.
pub type JsonObject = Map<String, Value>;

/// Lazy reader for the body of a single request.
///
/// Nothing is read from the connection until a handler asks for the payload,
/// so requests rejected before that point leave their body unread. The server
/// checks [`is_consumed`](Self::is_consumed) to decide whether the connection
/// can carry another request.
pub struct RequestBody<'a, R> {
    head: &'a RequestHead,
    reader: &'a mut R,
    limit: usize,
    consumed: bool,
}

impl<'a, R: BufRead> RequestBody<'a, R> {
    pub fn new(head: &'a RequestHead, reader: &'a mut R, limit: usize) -> Self {
        Self {
            consumed: !head.has_body(),
            head,
            reader,
            limit,
        }
    }

    /// Whether every body byte of this request has left the connection.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.consumed
    }

    /// Read the raw body bytes once.
    ///
    /// Chunked bodies are decoded; otherwise exactly `Content-Length` bytes are
    /// read. Returns an empty vector for a request without a body or when the
    /// body was already read.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>, ProtocolError> {
        if self.consumed {
            return Ok(Vec::new());
        }
        let bytes = if self.head.is_chunked() {
            decode_chunked(&mut *self.reader, self.limit)?
        } else {
            let length = self.head.content_length().unwrap_or(0);
            if length > self.limit {
                return Err(ProtocolError::BodyTooLarge { limit: self.limit });
            }
            let mut buf = vec![0u8; length];
            self.reader
                .read_exact(&mut buf)
                .map_err(ProtocolError::from_read)?;
            buf
        };
        self.consumed = true;
        Ok(bytes)
    }

    /// Read the body and decode it as a non-empty JSON object.
    ///
    /// `Ok(None)` means "no usable payload": no body, a `Content-Length` body
    /// whose media type is not `application/json`, unparseable JSON, a JSON
    /// value that is not an object, or `{}`. Framing failures are errors.
    pub fn json(&mut self) -> Result<Option<JsonObject>, ProtocolError> {
        let chunked = self.head.is_chunked();
        let media_type = self.head.media_type();
        let bytes = self.read_bytes()?;

        if !chunked && media_type.as_deref() != Some(JSON_MEDIA_TYPE) {
            debug!(media_type = ?media_type, "Ignoring non-JSON request body");
            return Ok(None);
        }
        if bytes.is_empty() {
            return Ok(None);
        }
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Object(map)) if !map.is_empty() => Ok(Some(map)),
            Ok(_) => {
                debug!("Request body is not a non-empty JSON object");
                Ok(None)
            }
            Err(e) => {
                debug!(error = %e, body_len = bytes.len(), "Request body is not valid JSON");
                Ok(None)
            }
        }
    }
}
