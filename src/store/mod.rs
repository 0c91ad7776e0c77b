//! # Store Module
//!
//! In-memory session and item storage backing the Wax endpoints.
//!
//! ## Overview
//!
//! - [`Repository`] maps generated session identifiers to [`SessionData`]
//!   and issues those identifiers.
//! - [`SessionData`] holds the ordered [`Item`]s of one session.
//! - [`Item`] is a schema-free JSON object with an `id` and a stamped `kind`.
//!
//! ## Locking
//!
//! There are two lock scopes: one per repository (session map and sequence
//! counter) and one per session (its item list). They are never nested. The
//! dispatcher takes an `Arc<SessionData>` out of the repository, drops the
//! repository lock, and only then calls into the session.
//!
//! ## Copies
//!
//! Every value crossing the store boundary is an owned [`Item`]. Mutating a
//! returned item or list never changes what the store holds.
//!
//! ```rust
//! use wax_server::store::{Item, Repository, ITEM_KIND};
//!
//! let repo = Repository::new();
//! let id = repo.new_identifier("demo");
//! let session = repo.get_session_data(&id).unwrap();
//!
//! let mut copy = session.get_item_copy("A").unwrap();
//! assert_eq!(copy.kind(), Some(ITEM_KIND));
//! copy.insert("name", "changed".into());
//! assert_eq!(session.get_item_copy("A").unwrap().get("name").unwrap(), "Item A");
//! ```

mod item;
mod repository;
mod session_data;
#[cfg(test)]
mod tests;

pub use item::{Item, ID_FIELD, ITEM_KIND, KIND_FIELD};
pub use repository::Repository;
pub use session_data::SessionData;
