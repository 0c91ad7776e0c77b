//! # Dispatcher Module
//!
//! Turns a routed request into a repository operation and a
//! [`HandlerResponse`].
//!
//! ## Request Flow
//!
//! 1. The [`Router`](crate::router::Router) resolves the path; no match is `404`
//! 2. A method outside the route's method set is `405`
//! 3. The session (if the route names one) is looked up; unknown is `404`
//! 4. The JSON payload is read lazily, only by handlers that need it
//! 5. The store result is mapped to a status and a JSON body
//!
//! The store never sees HTTP: it reports "absent" with `Option`, and every
//! status code is chosen here.
//!
//! ## Error Bodies
//!
//! Errors are JSON objects carrying the message and the status code:
//!
//! ```json
//! {"message": "Unknown sessionId", "code": 404}
//! ```
//!
//! A body whose framing cannot be decoded is not a client error in this
//! sense; [`Dispatcher::dispatch`] returns the
//! [`ProtocolError`](crate::server::ProtocolError) and the server drops the
//! connection.

mod core;

pub use core::{
    Dispatcher, HandlerResponse, ResponseBody, INSERT_DELAY, LIST_KIND, NEW_SESSION_KIND,
    REMOVE_SESSION_KIND,
};
