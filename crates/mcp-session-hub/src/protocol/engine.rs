//! The contract between the session layer and a protocol engine.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::SessionMode;
use crate::transport::PushSender;
use crate::types::{JsonRpcMessage, McpResult};

use super::handler::ProtocolHandler;

/// Request semantics behind one session.
///
/// The session layer treats an engine as a black box: it attaches a push
/// sender once, feeds it inbound messages one at a time, and shuts it down
/// exactly once per teardown (engines must still tolerate repeated calls).
#[async_trait]
pub trait ProtocolEngine: Send + Sync + 'static {
    /// Give the engine its outbound channel to the client.
    fn attach(&self, push: PushSender);

    /// Handle one inbound message.
    ///
    /// `Ok(Some(reply))` is sent back as the HTTP response body, `Ok(None)`
    /// means the message needs no reply. Protocol-level failures belong in the
    /// reply as JSON-RPC errors; `Err` is reserved for engine failures.
    async fn handle(&self, message: JsonRpcMessage) -> McpResult<Option<Value>>;

    /// Release the engine's resources. Idempotent.
    async fn shutdown(&self) -> McpResult<()>;
}

/// Builds a fresh engine for each new session.
pub trait EngineFactory: Send + Sync + 'static {
    /// Construct an engine. Failure aborts the handshake before any session exists.
    fn create(&self) -> McpResult<Arc<dyn ProtocolEngine>>;
}

impl<F> EngineFactory for F
where
    F: Fn() -> McpResult<Arc<dyn ProtocolEngine>> + Send + Sync + 'static,
{
    fn create(&self) -> McpResult<Arc<dyn ProtocolEngine>> {
        self()
    }
}

/// Factory for the built-in [`ProtocolHandler`].
#[derive(Debug, Clone, Copy)]
pub struct DefaultEngineFactory {
    require_initialize: bool,
}

impl DefaultEngineFactory {
    /// Engines that follow the full handshake before serving requests.
    pub fn new() -> Self {
        Self {
            require_initialize: true,
        }
    }

    /// Engines suited to the given session mode. Stateless engines skip the handshake.
    pub fn for_mode(mode: SessionMode) -> Self {
        Self {
            require_initialize: mode == SessionMode::Stateful,
        }
    }
}

impl Default for DefaultEngineFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineFactory for DefaultEngineFactory {
    fn create(&self) -> McpResult<Arc<dyn ProtocolEngine>> {
        let handler = if self.require_initialize {
            ProtocolHandler::new()
        } else {
            ProtocolHandler::stateless()
        };
        Ok(Arc::new(handler))
    }
}
