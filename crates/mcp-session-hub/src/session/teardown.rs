//! Session teardown: the single path from `Active`/`Closing` to `Closed`.

use std::fmt;

use super::registry::SessionRegistry;
use super::state::Session;

/// What triggered a teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Client sent `DELETE /mcp`.
    Deleted,
    /// The push stream's connection went away.
    Disconnected,
    /// Forwarding hit an unrecoverable transport error.
    TransportError,
    /// The server is shutting down.
    Shutdown,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            CloseReason::Deleted => "deleted by client",
            CloseReason::Disconnected => "client disconnected",
            CloseReason::TransportError => "transport error",
            CloseReason::Shutdown => "server shutdown",
        };
        f.write_str(reason)
    }
}

/// Tear a session down exactly once.
///
/// Concurrent or repeated calls are coalesced: only the caller that moves the
/// session from `Active` to `Closing` releases resources, and it returns
/// `true`. New messages are refused first and the one being handled is
/// allowed to finish before the engine is shut down. Engine and transport are
/// released independently; failures are logged and never stop the rest of the
/// teardown.
pub async fn teardown(registry: &SessionRegistry, session: &Session, reason: CloseReason) -> bool {
    let id = session.id();
    if !session.begin_closing() {
        tracing::debug!("Session {id} already closing ({reason}), skipping");
        return false;
    }

    tracing::info!("Closing session {id}: {reason}");

    session.transport().stop_accepting();
    session.transport().drain().await;

    if let Err(e) = session.engine().shutdown().await {
        tracing::warn!("Session {id}: engine shutdown failed: {e}");
    }
    if let Err(e) = session.transport().close() {
        tracing::warn!("Session {id}: transport close failed: {e}");
    }

    registry.remove(&id).await;
    session.mark_closed();

    tracing::info!(
        "Session {id} closed after {}s",
        (chrono::Utc::now() - session.created_at()).num_seconds()
    );
    true
}

/// Tear down every registered session. Returns how many were closed by this call.
pub async fn close_all(registry: &SessionRegistry, reason: CloseReason) -> usize {
    let mut closed = 0;
    for session in registry.sessions().await {
        if teardown(registry, &session, reason).await {
            closed += 1;
        }
    }
    closed
}
