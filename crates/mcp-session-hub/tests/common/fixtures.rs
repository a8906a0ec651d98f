//! Test fixtures: scripted protocol engines and HTTP helpers.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use mcp_session_hub::config::ServerConfig;
use mcp_session_hub::protocol::{EngineFactory, ProtocolEngine};
use mcp_session_hub::transport::PushSender;
use mcp_session_hub::types::{JsonRpcMessage, McpError, McpResult};
use mcp_session_hub::{create_router, AppState, SESSION_ID_HEADER};

/// How a [`MockEngine`] answers `initialize` and `shutdown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Script {
    /// Accept everything.
    Accept,
    /// Answer `initialize` with a JSON-RPC error carrying this code.
    RejectInitialize(i32),
    /// Fail every `shutdown` call.
    FailShutdown,
}

/// Engine that records what the session layer does to it.
pub struct MockEngine {
    script: Script,
    delay: Duration,
    pub handled: AtomicUsize,
    pub shutdowns: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub seen: Mutex<Vec<String>>,
    pub push: Mutex<Option<PushSender>>,
}

impl MockEngine {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            delay: Duration::ZERO,
            handled: AtomicUsize::new(0),
            shutdowns: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
            push: Mutex::new(None),
        }
    }

    /// Sleep this long inside every `handle` call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn shutdown_count(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    pub fn push_sender(&self) -> Option<PushSender> {
        self.push.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProtocolEngine for MockEngine {
    fn attach(&self, push: PushSender) {
        *self.push.lock().unwrap() = Some(push);
    }

    async fn handle(&self, message: JsonRpcMessage) -> McpResult<Option<Value>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.handled.fetch_add(1, Ordering::SeqCst);

        let reply = match message {
            JsonRpcMessage::Request(request) => {
                let label = request
                    .params
                    .as_ref()
                    .and_then(|p| p.get("seq"))
                    .map(|seq| format!("{}#{seq}", request.method))
                    .unwrap_or_else(|| request.method.clone());
                self.seen.lock().unwrap().push(label);

                let id = serde_json::to_value(&request.id).unwrap();
                match (request.method.as_str(), self.script) {
                    ("initialize", Script::RejectInitialize(code)) => Some(json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "error": { "code": code, "message": "scripted rejection" }
                    })),
                    ("initialize", _) => Some(json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "result": { "protocolVersion": "2025-03-26", "capabilities": {} }
                    })),
                    (method, _) => Some(json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "result": { "method": method }
                    })),
                }
            }
            JsonRpcMessage::Notification(notification) => {
                self.seen.lock().unwrap().push(notification.method);
                None
            }
            _ => None,
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(reply)
    }

    async fn shutdown(&self) -> McpResult<()> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        if self.script == Script::FailShutdown {
            return Err(McpError::InternalError("scripted shutdown failure".to_string()));
        }
        Ok(())
    }
}

/// Factory handing out [`MockEngine`]s and remembering every one it built.
#[derive(Clone)]
pub struct MockFactory {
    script: Script,
    delay: Duration,
    fail: bool,
    pub created: Arc<Mutex<Vec<Arc<MockEngine>>>>,
}

impl MockFactory {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            delay: Duration::ZERO,
            fail: false,
            created: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A factory whose `create` always fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Script::Accept)
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn engines(&self) -> Vec<Arc<MockEngine>> {
        self.created.lock().unwrap().clone()
    }

    pub fn created_count(&self) -> usize {
        self.created.lock().unwrap().len()
    }
}

impl EngineFactory for MockFactory {
    fn create(&self) -> McpResult<Arc<dyn ProtocolEngine>> {
        if self.fail {
            return Err(McpError::InternalError("scripted construction failure".to_string()));
        }
        let engine = Arc::new(MockEngine::new(self.script).with_delay(self.delay));
        self.created.lock().unwrap().push(engine.clone());
        Ok(engine)
    }
}

/// App state over a mock factory.
pub fn mock_state(factory: &MockFactory) -> AppState {
    AppState::new(ServerConfig::default(), Arc::new(factory.clone()))
}

/// App state over the built-in engine.
pub fn default_state() -> AppState {
    AppState::with_default_engine(ServerConfig::default())
}

/// Router plus the state behind it, for inspecting the registry.
pub fn router_with(state: &AppState) -> Router {
    create_router(state.clone())
}

/// A full `initialize` request body.
pub fn initialize_body(id: i64) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "initialize",
        "params": {
            "protocolVersion": "2025-03-26",
            "capabilities": {},
            "clientInfo": { "name": "fixture-client", "version": "1.0.0" }
        }
    })
}

pub fn request_body(id: i64, method: &str, params: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params })
}

pub fn notification_body(method: &str) -> Value {
    json!({ "jsonrpc": "2.0", "method": method })
}

pub async fn post(app: &Router, session: Option<&str>, body: &Value) -> Response {
    post_raw(app, session, body.to_string()).await
}

pub async fn post_raw(app: &Router, session: Option<&str>, body: String) -> Response {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .header("accept", "application/json, text/event-stream");
    if let Some(id) = session {
        builder = builder.header(SESSION_ID_HEADER, id);
    }
    app.clone()
        .oneshot(builder.body(Body::from(body)).unwrap())
        .await
        .unwrap()
}

pub async fn get(app: &Router, session: Option<&str>) -> Response {
    send_empty(app, "GET", session).await
}

pub async fn delete(app: &Router, session: Option<&str>) -> Response {
    send_empty(app, "DELETE", session).await
}

async fn send_empty(app: &Router, method: &str, session: Option<&str>) -> Response {
    let mut builder = Request::builder().method(method).uri("/mcp");
    if let Some(id) = session {
        builder = builder.header(SESSION_ID_HEADER, id);
    }
    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn body_json(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn session_header(response: &Response) -> Option<String> {
    response
        .headers()
        .get(SESSION_ID_HEADER)
        .map(|v| v.to_str().unwrap().to_string())
}

/// Run `initialize` and return the issued session id.
pub async fn open_session(app: &Router) -> String {
    let response = post(app, None, &initialize_body(1)).await;
    assert_eq!(response.status(), StatusCode::OK);
    session_header(&response).expect("initialize response carries a session id")
}

/// Open a session on the built-in engine and complete the handshake.
pub async fn open_ready_session(app: &Router) -> String {
    let id = open_session(app).await;
    let response = post(app, Some(&id), &notification_body("notifications/initialized")).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    id
}

/// Poll until `check` holds, failing after two seconds.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !check().await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
