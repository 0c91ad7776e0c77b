//! # Server Module
//!
//! HTTP/1.1 transport for the Wax service, running on `may` coroutines.
//!
//! ## Components
//!
//! - [`read_request_head`] parses the request line and headers
//! - [`RequestBody`] reads the payload lazily (`Content-Length` or chunked)
//! - [`decode_chunked`] is the strict chunked-transfer state machine
//! - [`write_response`] serializes a [`HandlerResponse`](crate::dispatcher::HandlerResponse)
//! - [`HttpServer`] runs the accept loop and one coroutine per connection
//! - [`ShutdownSignal`] carries the stop flag and the in-flight counter
//!
//! ## Connection Lifecycle
//!
//! A connection serves requests one after another while the client allows
//! keep-alive. It is closed after `Connection: close`, after a response whose
//! request body was left unread, after a stop request, and after any
//! [`ProtocolError`]. A malformed head is answered with `400` first; a body
//! that cannot be framed gets no response at all.

mod chunked;
mod error;
mod http_server;
mod payload;
mod request;
mod response;
mod shutdown;

pub use chunked::{decode_chunked, ChunkedDecoder};
pub use error::ProtocolError;
pub use http_server::{HttpServer, ServerHandle, DRAIN_TIMEOUT};
pub use payload::{JsonObject, RequestBody, JSON_MEDIA_TYPE};
pub use request::{read_request_head, HeaderVec, RequestHead, MAX_HEADERS, MAX_INLINE_HEADERS};
pub use response::{encode_response, write_response, JSON_CONTENT_TYPE, TEXT_CONTENT_TYPE};
pub use shutdown::{InFlightGuard, ShutdownSignal};
