//! Outbound handle an engine uses to push messages to its session's client.

use std::sync::{Arc, OnceLock};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use crate::session::SessionId;
use crate::types::{JsonRpcMessage, McpError, McpResult};

/// Cloneable sender for server-to-client messages on one session.
///
/// Messages are buffered until the client opens `GET /mcp`. Sending never
/// waits: when the buffer is full the message is dropped.
#[derive(Debug, Clone)]
pub struct PushSender {
    tx: mpsc::Sender<JsonRpcMessage>,
    session_id: Arc<OnceLock<SessionId>>,
    closed: CancellationToken,
}

impl PushSender {
    pub(crate) fn new(
        tx: mpsc::Sender<JsonRpcMessage>,
        session_id: Arc<OnceLock<SessionId>>,
        closed: CancellationToken,
    ) -> Self {
        Self {
            tx,
            session_id,
            closed,
        }
    }

    /// Queue a message for the push stream.
    ///
    /// Returns `Ok(true)` if queued, `Ok(false)` if dropped because the buffer
    /// is full, and [`McpError::SessionClosed`] once the transport is closed.
    pub fn send(&self, message: JsonRpcMessage) -> McpResult<bool> {
        if self.closed.is_cancelled() {
            return Err(McpError::SessionClosed);
        }
        match self.tx.try_send(message) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => {
                tracing::warn!(
                    "Push buffer full for session {}, dropping message",
                    self.session_label()
                );
                Ok(false)
            }
            Err(TrySendError::Closed(_)) => Err(McpError::SessionClosed),
        }
    }

    /// The session id, once the handshake has succeeded.
    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id.get().copied()
    }

    /// Whether the owning transport has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    fn session_label(&self) -> String {
        self.session_id()
            .map(|id| id.to_string())
            .unwrap_or_else(|| "<pending>".to_string())
    }
}
