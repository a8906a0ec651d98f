//! Session lifecycle state and the two-phase construction of a session.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::protocol::ProtocolEngine;
use crate::transport::{AdapterConfig, TransportAdapter};
use crate::types::{JsonRpcMessage, McpResult};

use super::id::SessionId;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Handshake in progress; never visible in the registry.
    Pending,
    /// Registered and serving requests.
    Active,
    /// Teardown has started.
    Closing,
    /// Resources released and entry removed.
    Closed,
}

/// A session under construction, owned by a single request flow.
///
/// Nothing outside the creating flow can reach a pending session. It either
/// becomes a [`Session`] through [`activate`](Self::activate) or has its
/// resources released through [`release`](Self::release).
pub struct PendingSession {
    transport: Arc<TransportAdapter>,
    engine: Arc<dyn ProtocolEngine>,
}

impl PendingSession {
    /// Pair a fresh engine with a new transport adapter and attach them.
    pub fn new(engine: Arc<dyn ProtocolEngine>, config: &AdapterConfig) -> Self {
        let transport = Arc::new(TransportAdapter::new(engine.clone(), config));
        engine.attach(transport.push_sender());
        Self { transport, engine }
    }

    /// Always [`SessionState::Pending`]; pending sessions are never registered.
    pub fn state(&self) -> SessionState {
        SessionState::Pending
    }

    /// The adapter bound to this pending session.
    pub fn transport(&self) -> &Arc<TransportAdapter> {
        &self.transport
    }

    /// The engine bound to this pending session.
    pub fn engine(&self) -> &Arc<dyn ProtocolEngine> {
        &self.engine
    }

    /// Deliver a message to the engine through the adapter.
    pub async fn forward(&self, message: JsonRpcMessage) -> McpResult<Option<Value>> {
        self.transport.forward(message).await
    }

    /// Assign the session id and promote to an `Active` session.
    ///
    /// The id becomes visible to the engine (through its push sender) only here.
    pub fn activate(self, id: SessionId) -> McpResult<Session> {
        self.transport.assign_session_id(id)?;
        Ok(Session {
            id,
            created_at: Utc::now(),
            state: Mutex::new(SessionState::Active),
            transport: self.transport,
            engine: self.engine,
        })
    }

    /// Release both resources. Each release is attempted even if the other fails.
    pub async fn release(self) {
        if let Err(e) = self.engine.shutdown().await {
            tracing::warn!("Engine shutdown failed while releasing pending session: {e}");
        }
        if let Err(e) = self.transport.close() {
            tracing::warn!("Transport close failed while releasing pending session: {e}");
        }
    }
}

/// A registered session: one transport and one engine under a unique id.
pub struct Session {
    id: SessionId,
    created_at: DateTime<Utc>,
    state: Mutex<SessionState>,
    transport: Arc<TransportAdapter>,
    engine: Arc<dyn ProtocolEngine>,
}

impl Session {
    /// Session identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// When the handshake completed.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.lock_state()
    }

    /// The session's transport adapter.
    pub fn transport(&self) -> &Arc<TransportAdapter> {
        &self.transport
    }

    /// The session's protocol engine.
    pub fn engine(&self) -> &Arc<dyn ProtocolEngine> {
        &self.engine
    }

    /// Move `Active -> Closing`. Returns `false` if another caller got there first.
    pub(crate) fn begin_closing(&self) -> bool {
        let mut state = self.lock_state();
        if *state != SessionState::Active {
            return false;
        }
        *state = SessionState::Closing;
        true
    }

    pub(crate) fn mark_closed(&self) {
        *self.lock_state() = SessionState::Closed;
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        // State is a plain enum; a poisoned lock still holds a valid value.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
