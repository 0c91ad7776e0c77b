//! # Router Module
//!
//! Maps request paths onto the Wax resources.
//!
//! ## Overview
//!
//! The route table is declarative: each entry is a path pattern, the resource
//! it names, and the methods it accepts.
//!
//! | Pattern | Methods |
//! |---|---|
//! | `/quit` | any |
//! | `/newsession` | `POST` |
//! | `/removesession` | `POST` |
//! | `/sessions/{sessionId}/items` | `GET`, `POST` |
//! | `/sessions/{sessionId}/items/{itemId}` | `GET`, `DELETE`, `PATCH`, `PUT` |
//!
//! Patterns are compiled once into literal and capture segments. Matching
//! splits the request path on `/` and compares segment by segment, so a
//! capture never spans a `/` and trailing slashes do not match.
//!
//! ## Example
//!
//! ```rust
//! use wax_server::router::{Router, WaxRoute};
//! use http::Method;
//!
//! let router = Router::new();
//! let m = router.route("/sessions/s-1/items/C?fields=id").unwrap();
//! assert_eq!(m.route, WaxRoute::Item);
//! assert_eq!(m.get_path_param("sessionId"), Some("s-1"));
//! assert_eq!(m.get_path_param("itemId"), Some("C"));
//! assert!(m.allows(&Method::PATCH));
//! assert!(!m.allows(&Method::POST));
//! ```

mod core;

pub use core::{ParamVec, RouteMatch, Router, WaxRoute, MAX_INLINE_PARAMS};
