use std::io;
use thiserror::Error;

/// Failures while reading an HTTP request off the wire.
///
/// Head errors ([`is_head_error`](Self::is_head_error)) are answered with a
/// `400` before the connection is closed. Every other variant means the byte
/// stream can no longer be trusted and the connection is dropped without a
/// response.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("connection closed mid-request")]
    UnexpectedEof,

    #[error("malformed request line: {0:?}")]
    RequestLine(String),

    #[error("malformed header line: {0:?}")]
    HeaderLine(String),

    #[error("request head exceeds {limit} bytes")]
    HeadTooLarge { limit: usize },

    #[error("more than {limit} request headers")]
    TooManyHeaders { limit: usize },

    #[error("invalid Content-Length: {0:?}")]
    ContentLength(String),

    #[error("unexpected byte {byte:#04x} in chunk size line")]
    ChunkSize { byte: u8 },

    #[error("chunk size overflows")]
    ChunkSizeOverflow,

    #[error("expected \\r\\n termination in chunked body")]
    ChunkTerminator,

    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },
}

impl ProtocolError {
    /// Whether the error happened while reading the request line or headers.
    #[must_use]
    pub fn is_head_error(&self) -> bool {
        matches!(
            self,
            ProtocolError::RequestLine(_)
                | ProtocolError::HeaderLine(_)
                | ProtocolError::HeadTooLarge { .. }
                | ProtocolError::TooManyHeaders { .. }
                | ProtocolError::ContentLength(_)
        )
    }

    /// Map an I/O error, folding a short read into [`ProtocolError::UnexpectedEof`].
    pub(crate) fn from_read(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            ProtocolError::UnexpectedEof
        } else {
            ProtocolError::Io(err)
        }
    }
}
