//! # Wax Server
//!
//! An in-memory imitation of a small REST API ("Wax") used as a fixture for
//! HTTP client-library tests. Clients create isolated sessions, each seeded
//! with two items, and exercise list, insert, get, patch, update and delete
//! against them over HTTP/1.1 with JSON bodies. Request bodies may arrive with
//! `Content-Length` or `Transfer-Encoding: chunked`.
//!
//! ## Architecture
//!
//! - **[`store`]** - `Item`, `SessionData` and the `Repository` of sessions
//! - **[`router`]** - declarative route table and structural path matching
//! - **[`dispatcher`]** - maps routed requests onto store operations and statuses
//! - **[`server`]** - HTTP/1.1 reader and writer, chunked decoder, accept loop on `may`
//! - **[`cli`]** - the `wax_server` binary's flags and run loop
//! - **[`runtime_config`]** / **[`logging`]** - environment-driven settings
//! - **[`ids`]** - ULID request and node identifiers
//!
//! ## Request Flow
//!
//! ```text
//! TcpStream ─▶ read_request_head ─▶ Router::route ─▶ Dispatcher::dispatch
//!                                                        │  (RequestBody::json, lazily)
//!                                                        ▼
//!                                     SessionData / Repository (Mutex)
//!                                                        │
//! TcpStream ◀─ write_response ◀──── HandlerResponse ◀────┘
//! ```
//!
//! ## Resources
//!
//! | Path | Methods |
//! |---|---|
//! | `/quit` | any; replies `BYE` and stops the server |
//! | `/newsession` | `POST {"sessionName": ..}` |
//! | `/removesession` | `POST {"sessionId": ..}` |
//! | `/sessions/{sessionId}/items` | `GET` list, `POST` insert |
//! | `/sessions/{sessionId}/items/{itemId}` | `GET`, `DELETE`, `PATCH`, `PUT` |
//!
//! ## Embedding
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use wax_server::dispatcher::Dispatcher;
//! use wax_server::runtime_config::RuntimeConfig;
//! use wax_server::server::HttpServer;
//! use wax_server::store::Repository;
//!
//! let dispatcher = Arc::new(Dispatcher::new(Arc::new(Repository::new())));
//! let handle = HttpServer::new(dispatcher, RuntimeConfig::default())
//!     .start("127.0.0.1:0")
//!     .unwrap();
//! handle.wait_ready().unwrap();
//! println!("listening on {}", handle.local_addr());
//! handle.stop();
//! ```

pub mod cli;
pub mod dispatcher;
pub mod ids;
pub mod logging;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod store;

pub use dispatcher::{Dispatcher, HandlerResponse};
pub use router::{RouteMatch, Router, WaxRoute};
pub use server::{HttpServer, ProtocolError, ServerHandle};
pub use store::{Item, Repository, SessionData};
