//! Handshake coordination: the only path that publishes new sessions.

use std::sync::Arc;

use serde_json::Value;

use crate::protocol::EngineFactory;
use crate::transport::AdapterConfig;
use crate::types::{error_codes, JsonRpcMessage, McpError};

use super::id::SessionId;
use super::registry::SessionRegistry;
use super::state::{PendingSession, Session};
use super::teardown::{teardown, CloseReason};

/// Why a handshake did not produce a session.
#[derive(Debug, thiserror::Error)]
pub enum HandshakeError {
    /// The message is not an `initialize` request. No resources were created.
    #[error("missing session id and not an initialize request")]
    NotInitialize,

    /// The engine answered `initialize` with a JSON-RPC error.
    #[error("initialize rejected: {message}")]
    Rejected {
        /// The engine's error reply, returned to the client verbatim.
        reply: Value,
        /// Human-readable reason from the reply.
        message: String,
        /// Whether the rejection blames the client's input.
        client_error: bool,
    },

    /// The engine could not be constructed.
    #[error("engine construction failed: {0}")]
    Construction(#[source] McpError),

    /// Delivering `initialize` failed, or produced no reply.
    #[error("initialize failed: {0}")]
    Engine(#[source] McpError),

    /// The session could not be published.
    #[error("session publish failed: {0}")]
    Publish(#[source] McpError),
}

/// A freshly published session together with the engine's initialize reply.
#[derive(Debug)]
pub struct HandshakeOutcome {
    /// The new `Active` session.
    pub session: Arc<Session>,
    /// The initialize result to send back to the client.
    pub reply: Value,
}

/// Validates and executes `initialize`, then publishes the session.
///
/// Concurrent handshakes share nothing but the registry, and touch it only
/// in the final insert.
pub struct HandshakeCoordinator {
    registry: SessionRegistry,
    factory: Arc<dyn EngineFactory>,
    adapter_config: AdapterConfig,
}

impl HandshakeCoordinator {
    /// Create a coordinator publishing into `registry`.
    pub fn new(
        registry: SessionRegistry,
        factory: Arc<dyn EngineFactory>,
        adapter_config: AdapterConfig,
    ) -> Self {
        Self {
            registry,
            factory,
            adapter_config,
        }
    }

    /// Run the handshake for a request that carried no session id.
    pub async fn initialize(
        &self,
        message: JsonRpcMessage,
    ) -> Result<HandshakeOutcome, HandshakeError> {
        if !message.is_initialize_request() {
            return Err(HandshakeError::NotInitialize);
        }

        let engine = self
            .factory
            .create()
            .map_err(HandshakeError::Construction)?;
        let pending = PendingSession::new(engine, &self.adapter_config);

        let reply = match pending.forward(message).await {
            Ok(Some(reply)) => reply,
            Ok(None) => {
                pending.release().await;
                return Err(HandshakeError::Engine(McpError::InternalError(
                    "engine produced no reply to initialize".to_string(),
                )));
            }
            Err(e) => {
                pending.release().await;
                return Err(HandshakeError::Engine(e));
            }
        };

        if let Some(error) = reply.get("error") {
            pending.release().await;
            let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("initialize rejected")
                .to_string();
            tracing::warn!("Engine rejected initialize ({code}): {message}");
            return Err(HandshakeError::Rejected {
                client_error: code == i64::from(error_codes::INVALID_REQUEST)
                    || code == i64::from(error_codes::INVALID_PARAMS),
                reply,
                message,
            });
        }

        let session = self.publish(pending).await?;
        tracing::info!("Session {} created", session.id());

        Ok(HandshakeOutcome { session, reply })
    }

    async fn publish(&self, pending: PendingSession) -> Result<Arc<Session>, HandshakeError> {
        let id = SessionId::random();

        // Keep handles so the pair can still be released if activation fails.
        let transport = pending.transport().clone();
        let engine = pending.engine().clone();

        let session = match pending.activate(id) {
            Ok(session) => Arc::new(session),
            Err(e) => {
                release_pair(&*engine, &transport).await;
                return Err(HandshakeError::Publish(e));
            }
        };

        if let Err(e) = self.registry.insert(session.clone()).await {
            release_pair(session.engine().as_ref(), session.transport()).await;
            session.mark_closed();
            return Err(HandshakeError::Publish(e));
        }

        let registry = self.registry.clone();
        session.transport().on_close(Box::new(move || {
            spawn_teardown(registry, id, CloseReason::Disconnected);
        }));

        Ok(session)
    }
}

async fn release_pair(
    engine: &dyn crate::protocol::ProtocolEngine,
    transport: &crate::transport::TransportAdapter,
) {
    if let Err(e) = engine.shutdown().await {
        tracing::warn!("Engine shutdown failed during handshake rollback: {e}");
    }
    if let Err(e) = transport.close() {
        tracing::warn!("Transport close failed during handshake rollback: {e}");
    }
}

/// Schedule teardown of `id` from a synchronous context such as a drop guard.
pub(crate) fn spawn_teardown(registry: SessionRegistry, id: SessionId, reason: CloseReason) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        tracing::warn!("No runtime available to tear down session {id}");
        return;
    };
    handle.spawn(async move {
        if let Ok(session) = registry.lookup(&id).await {
            teardown(&registry, &session, reason).await;
        }
    });
}
