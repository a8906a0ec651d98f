//! Built-in protocol engine: dispatches JSON-RPC methods to tools and resources.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::resources::ResourceRegistry;
use crate::session::SessionId;
use crate::tools::ToolRegistry;
use crate::transport::PushSender;
use crate::types::{
    CancelledParams, InitializeParams, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, ListParams, LogLevel, LogMessageParams, McpError, McpResult,
    ResourceListResult, ResourceReadParams, SetLevelParams, ToolCallParams, ToolListResult,
};

use super::engine::ProtocolEngine;
use super::negotiation::NegotiatedCapabilities;

/// Per-engine state shared with tools and resources.
#[derive(Debug, Default)]
pub struct EngineState {
    /// Handshake progress and client details.
    pub negotiated: NegotiatedCapabilities,
    /// Minimum level of log notifications pushed to the client.
    pub log_level: LogLevel,
    /// Requests handled so far, including `initialize`.
    pub requests_handled: u64,
    /// Outbound channel, present between attach and shutdown.
    pub push: Option<PushSender>,
}

impl EngineState {
    /// The session id seen through the push sender, once assigned.
    pub fn session_id(&self) -> Option<SessionId> {
        self.push.as_ref().and_then(PushSender::session_id)
    }

    /// Push a `notifications/message` if `level` passes the client's filter.
    ///
    /// Returns whether the notification was queued.
    pub fn push_log(&self, level: LogLevel, logger: &str, data: Value) -> McpResult<bool> {
        if level < self.log_level {
            return Ok(false);
        }
        let push = self.push.as_ref().ok_or(McpError::SessionClosed)?;
        let notification = LogMessageParams {
            level,
            logger: Some(logger.to_string()),
            data,
        }
        .into_notification();
        push.send(JsonRpcMessage::Notification(notification))
    }
}

/// The default [`ProtocolEngine`].
pub struct ProtocolHandler {
    state: Arc<Mutex<EngineState>>,
    require_initialize: bool,
    shut_down: AtomicBool,
}

impl ProtocolHandler {
    /// Engine that serves requests only after the `initialize` handshake.
    pub fn new() -> Self {
        Self::with_handshake(true)
    }

    /// Engine for stateless mode: each request stands alone.
    pub fn stateless() -> Self {
        Self::with_handshake(false)
    }

    fn with_handshake(require_initialize: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(EngineState::default())),
            require_initialize,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Shared state, for tools and tests.
    pub fn state(&self) -> &Arc<Mutex<EngineState>> {
        &self.state
    }

    /// Whether [`shutdown`](ProtocolEngine::shutdown) has run.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Handle any JSON-RPC message, returning the reply for requests.
    pub async fn handle_message(&self, message: JsonRpcMessage) -> Option<Value> {
        match message {
            JsonRpcMessage::Request(request) => Some(self.handle_request(request).await),
            JsonRpcMessage::Notification(notification) => {
                self.handle_notification(notification).await;
                None
            }
            JsonRpcMessage::Response(_) | JsonRpcMessage::Error(_) => {
                tracing::debug!("Ignoring client response; no server requests are outstanding");
                None
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> Value {
        let id = request.id.clone();
        let method = request.method.clone();
        match self.dispatch(request).await {
            Ok(result) => serde_json::to_value(JsonRpcResponse::new(id, result))
                .unwrap_or(Value::Null),
            Err(e) => {
                tracing::debug!("Request {method} failed: {e}");
                e.to_json_rpc_value(id)
            }
        }
    }

    async fn dispatch(&self, request: JsonRpcRequest) -> McpResult<Value> {
        self.state.lock().await.requests_handled += 1;

        match request.method.as_str() {
            "initialize" => self.initialize(request.params).await,
            "ping" => Ok(json!({})),
            method => {
                self.ensure_ready().await?;
                match method {
                    "tools/list" => {
                        let _page: ListParams = parse_optional(request.params)?;
                        Ok(serde_json::to_value(ToolListResult {
                            tools: ToolRegistry::list_tools(),
                            next_cursor: None,
                        })?)
                    }
                    "tools/call" => {
                        let params: ToolCallParams = parse_required(request.params)?;
                        let result =
                            ToolRegistry::call(&params.name, params.arguments, &self.state)
                                .await?;
                        Ok(serde_json::to_value(result)?)
                    }
                    "resources/list" => {
                        let _page: ListParams = parse_optional(request.params)?;
                        Ok(serde_json::to_value(ResourceListResult {
                            resources: ResourceRegistry::list_resources(),
                            next_cursor: None,
                        })?)
                    }
                    "resources/read" => {
                        let params: ResourceReadParams = parse_required(request.params)?;
                        let result = ResourceRegistry::read(&params.uri, &self.state).await?;
                        Ok(serde_json::to_value(result)?)
                    }
                    "logging/setLevel" => {
                        let params: SetLevelParams = parse_required(request.params)?;
                        self.state.lock().await.log_level = params.level;
                        tracing::debug!("Client log level set to {:?}", params.level);
                        Ok(json!({}))
                    }
                    other => Err(McpError::MethodNotFound(other.to_string())),
                }
            }
        }
    }

    async fn initialize(&self, params: Option<Value>) -> McpResult<Value> {
        let params: InitializeParams = parse_optional(params)?;
        let mut state = self.state.lock().await;
        let result = state.negotiated.negotiate(params)?;
        if !self.require_initialize {
            state.negotiated.initialized = true;
        }
        Ok(serde_json::to_value(result)?)
    }

    async fn ensure_ready(&self) -> McpResult<()> {
        if !self.require_initialize {
            return Ok(());
        }
        self.state.lock().await.negotiated.ensure_initialized()
    }

    async fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            "notifications/initialized" | "initialized" => {
                if let Err(e) = self.state.lock().await.negotiated.mark_initialized() {
                    tracing::warn!("{e}");
                }
            }
            "notifications/cancelled" => {
                // Requests complete synchronously within their POST, so there is nothing to cancel.
                match parse_optional::<Option<CancelledParams>>(notification.params) {
                    Ok(Some(params)) => {
                        tracing::debug!("Client cancelled request {}", params.request_id)
                    }
                    Ok(None) => {}
                    Err(e) => tracing::debug!("Malformed cancellation: {e}"),
                }
            }
            other => tracing::debug!("Ignoring notification {other}"),
        }
    }
}

impl Default for ProtocolHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProtocolEngine for ProtocolHandler {
    fn attach(&self, push: PushSender) {
        // Attach happens before the engine is shared, so the lock is uncontended.
        match self.state.try_lock() {
            Ok(mut state) => state.push = Some(push),
            Err(_) => tracing::error!("Engine state busy during attach; push channel not set"),
        }
    }

    async fn handle(&self, message: JsonRpcMessage) -> McpResult<Option<Value>> {
        if self.is_shut_down() {
            return Err(McpError::SessionClosed);
        }
        Ok(self.handle_message(message).await)
    }

    async fn shutdown(&self) -> McpResult<()> {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let mut state = self.state.lock().await;
        state.push = None;
        tracing::debug!(
            "Engine shut down after {} request(s)",
            state.requests_handled
        );
        Ok(())
    }
}

fn parse_optional<T>(params: Option<Value>) -> McpResult<T>
where
    T: serde::de::DeserializeOwned + Default,
{
    match params {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => {
            serde_json::from_value(value).map_err(|e| McpError::InvalidParams(e.to_string()))
        }
    }
}

fn parse_required<T>(params: Option<Value>) -> McpResult<T>
where
    T: serde::de::DeserializeOwned,
{
    let value = params.ok_or_else(|| McpError::InvalidParams("missing params".to_string()))?;
    serde_json::from_value(value).map_err(|e| McpError::InvalidParams(e.to_string()))
}
