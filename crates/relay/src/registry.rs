//! Session registry
//!
//! Process-wide mapping from call identifier to live session, injected into
//! each coordinator rather than accessed as ambient global state. Entries
//! are inserted on stream start and removed at teardown; concurrent calls
//! use disjoint keys.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::session::CallSession;

/// Registry of active call sessions.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<CallSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session under its call identifier.
    pub fn insert(&self, session: Arc<CallSession>) {
        let mut sessions = self.sessions.write();
        if sessions
            .insert(session.call_id().to_string(), session.clone())
            .is_some()
        {
            tracing::warn!(call_id = %session.call_id(), "replaced existing session in registry");
        } else {
            tracing::info!(call_id = %session.call_id(), "registered session");
        }
    }

    /// Look up a session by call identifier.
    pub fn get(&self, call_id: &str) -> Option<Arc<CallSession>> {
        self.sessions.read().get(call_id).cloned()
    }

    /// Remove a session at teardown.
    pub fn remove(&self, call_id: &str) -> Option<Arc<CallSession>> {
        let removed = self.sessions.write().remove(call_id);
        if removed.is_some() {
            tracing::info!(call_id, "removed session");
        }
        removed
    }

    /// Number of active sessions.
    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Call identifiers of all active sessions.
    pub fn list(&self) -> Vec<String> {
        self.sessions.read().keys().cloned().collect()
    }
}
