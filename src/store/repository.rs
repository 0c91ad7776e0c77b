use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::info;

use super::session_data::SessionData;
use crate::ids::NodeId;

#[derive(Debug, Default)]
struct Sessions {
    by_id: HashMap<String, Arc<SessionData>>,
    sequence: u64,
}

/// Registry of live sessions, keyed by generated session identifier.
///
/// Identifiers have the form `{basename}-{node_id}-{sequence}`. The sequence
/// only ever grows, so an identifier is never handed out twice by the same
/// repository, even after its session was removed. Sessions live until
/// [`remove_identifier`](Self::remove_identifier) is called.
///
/// One lock guards both the map and the counter. It is never held while a
/// session's own lock is taken.
#[derive(Debug)]
pub struct Repository {
    node_id: NodeId,
    sessions: Mutex<Sessions>,
}

impl Default for Repository {
    fn default() -> Self {
        Self::new()
    }
}

impl Repository {
    /// Create an empty repository with a freshly generated node id.
    #[must_use]
    pub fn new() -> Self {
        Self::with_node_id(NodeId::generate())
    }

    #[must_use]
    pub fn with_node_id(node_id: NodeId) -> Self {
        info!(node_id = %node_id, "Session repository created");
        Self {
            node_id,
            sessions: Mutex::new(Sessions::default()),
        }
    }

    #[must_use]
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    fn lock(&self) -> MutexGuard<'_, Sessions> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new seeded session and return its identifier.
    pub fn new_identifier(&self, basename: &str) -> String {
        let mut sessions = self.lock();
        sessions.sequence += 1;
        let key = format!("{}-{}-{}", basename, self.node_id, sessions.sequence);
        sessions
            .by_id
            .insert(key.clone(), Arc::new(SessionData::new()));
        key
    }

    #[must_use]
    pub fn get_session_data(&self, key: &str) -> Option<Arc<SessionData>> {
        self.lock().by_id.get(key).cloned()
    }

    /// Remove a session, returning its data when it existed.
    pub fn remove_identifier(&self, key: &str) -> Option<Arc<SessionData>> {
        self.lock().by_id.remove(key)
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.lock().by_id.len()
    }
}
