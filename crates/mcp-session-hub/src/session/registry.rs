//! Concurrent-safe store mapping session ids to live sessions.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::types::{McpError, McpResult};

use super::id::SessionId;
use super::state::Session;

/// Thread-safe registry of `Active` and `Closing` sessions.
///
/// Cloning is cheap and yields a handle to the same table. The registry only
/// maps ids; releasing a session's resources is the teardown path's job.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<SessionId, Arc<Session>>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a session under its id.
    ///
    /// Fails with [`McpError::DuplicateSessionId`] if the id is already present;
    /// the existing entry is left untouched.
    pub async fn insert(&self, session: Arc<Session>) -> McpResult<()> {
        let id = session.id();
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&id) {
            tracing::error!("Refusing to publish duplicate session id {id}");
            return Err(McpError::DuplicateSessionId(id.to_string()));
        }
        sessions.insert(id, session);
        Ok(())
    }

    /// Look up a session by id.
    pub async fn lookup(&self, id: &SessionId) -> McpResult<Arc<Session>> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| McpError::SessionNotFound(id.to_string()))
    }

    /// Remove a session, returning the entry if it existed. Removing an absent id is a no-op.
    pub async fn remove(&self, id: &SessionId) -> Option<Arc<Session>> {
        self.sessions.write().await.remove(id)
    }

    /// Number of registered sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no sessions are registered.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Ids of all registered sessions.
    pub async fn ids(&self) -> Vec<SessionId> {
        self.sessions.read().await.keys().copied().collect()
    }

    /// Snapshot of all registered sessions.
    pub async fn sessions(&self) -> Vec<Arc<Session>> {
        self.sessions.read().await.values().cloned().collect()
    }
}
