//! Streamable HTTP transport: routes `/mcp` requests to sessions.
//!
//! | Verb   | `Mcp-Session-Id` | Behavior                                          |
//! |--------|------------------|---------------------------------------------------|
//! | POST   | present          | forward to the session, return its reply          |
//! | POST   | absent           | `initialize` opens a session, anything else 400   |
//! | GET    | present          | open the session's SSE push stream                |
//! | DELETE | present          | tear the session down                             |
//!
//! GET and DELETE without the header are rejected with 400; unknown ids get 404.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, HeaderName, Method, StatusCode},
    response::{
        sse::{KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{ServerConfig, SessionMode};
use crate::protocol::{validator, DefaultEngineFactory, EngineFactory};
use crate::session::{
    close_all, teardown, CloseReason, HandshakeCoordinator, HandshakeError, Session, SessionId,
    SessionRegistry,
};
use crate::types::{McpError, McpResult, SERVER_NAME, SERVER_VERSION};

use super::error::HttpError;
use super::stateless;

/// Header carrying the session id. Header names are case-insensitive.
pub const SESSION_ID_HEADER: &str = "mcp-session-id";

/// Path of the protocol endpoint.
pub const MCP_PATH: &str = "/mcp";

/// Shared state for request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live sessions.
    pub registry: SessionRegistry,
    /// Publishes new sessions.
    pub coordinator: Arc<HandshakeCoordinator>,
    /// Builds engines (used directly in stateless mode).
    pub factory: Arc<dyn EngineFactory>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Build state around an engine factory.
    pub fn new(config: ServerConfig, factory: Arc<dyn EngineFactory>) -> Self {
        let registry = SessionRegistry::new();
        let coordinator = Arc::new(HandshakeCoordinator::new(
            registry.clone(),
            factory.clone(),
            config.adapter_config(),
        ));
        Self {
            registry,
            coordinator,
            factory,
            config: Arc::new(config),
        }
    }

    /// Build state serving the built-in protocol engine.
    pub fn with_default_engine(config: ServerConfig) -> Self {
        let factory = Arc::new(DefaultEngineFactory::for_mode(config.session_mode));
        Self::new(config, factory)
    }
}

/// Build the router for the given state.
pub fn create_router(state: AppState) -> Router {
    let mcp = match state.config.session_mode {
        SessionMode::Stateful => post(handle_post).get(handle_get).delete(handle_delete),
        SessionMode::Stateless => post(stateless::handle_post)
            .get(stateless::reject_session_verb)
            .delete(stateless::reject_session_verb),
    };

    Router::new()
        .route("/", get(liveness))
        .route("/health", get(|| async { "ok" }))
        .route(MCP_PATH, mcp)
        .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS policy: browser clients must be able to send and read the session header.
fn cors_layer() -> CorsLayer {
    let session_header = HeaderName::from_static(SESSION_ID_HEADER);
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, session_header.clone()])
        .expose_headers([session_header])
}

/// HTTP server hosting the session layer.
pub struct HttpTransport {
    state: AppState,
}

impl HttpTransport {
    /// Create a new HTTP transport.
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Shared state, for inspection.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server on the given address until Ctrl-C.
    pub async fn run(&self, addr: &str) -> McpResult<()> {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(McpError::Io)?;

        tracing::info!(
            "HTTP transport listening on {addr} ({:?} mode)",
            self.state.config.session_mode
        );

        self.run_with_listener(listener).await
    }

    /// Run the server on an already bound listener until Ctrl-C.
    pub async fn run_with_listener(&self, listener: tokio::net::TcpListener) -> McpResult<()> {
        let registry = self.state.registry.clone();
        let app = create_router(self.state.clone());

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for shutdown signal: {e}");
                }
                // Push streams never finish on their own; close them so the server can drain.
                let closed = close_all(&registry, CloseReason::Shutdown).await;
                tracing::info!("Shutting down, closed {closed} session(s)");
            })
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;

        Ok(())
    }
}

async fn liveness(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "server": SERVER_NAME,
        "version": SERVER_VERSION,
        "mode": state.config.session_mode,
        "sessions": state.registry.len().await,
    }))
}

/// Raw session id header value, if present and non-empty.
fn session_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(SESSION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Resolve the session named by the request headers.
async fn resolve_session(state: &AppState, headers: &HeaderMap) -> Result<Arc<Session>, HttpError> {
    let raw = session_header(headers).ok_or_else(HttpError::missing_session)?;
    // Malformed ids cannot name a session; treat them as unknown.
    let id = SessionId::parse(raw).ok_or_else(HttpError::session_not_found)?;
    state
        .registry
        .lookup(&id)
        .await
        .map_err(|_| HttpError::session_not_found())
}

fn with_session_header(id: SessionId, response: impl IntoResponse) -> Response {
    ([(SESSION_ID_HEADER, id.to_string())], response).into_response()
}

async fn handle_post(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if session_header(&headers).is_none() {
        return handle_initialize(&state, &body).await;
    }

    let session = match resolve_session(&state, &headers).await {
        Ok(session) => session,
        Err(e) => return e.into_response(),
    };
    let id = session.id();

    let message = match validator::parse_message(&body) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!("Session {id}: rejecting malformed message: {e}");
            return with_session_header(id, HttpError::from(e));
        }
    };

    tracing::debug!(
        "Session {id}: forwarding {}",
        message.method().unwrap_or("<response>")
    );

    match session.transport().forward(message).await {
        Ok(Some(reply)) => with_session_header(id, Json(reply)),
        Ok(None) => with_session_header(id, StatusCode::ACCEPTED),
        Err(e) if e.is_fatal_for_transport() => {
            // Usually a no-op: a closed adapter means teardown already ran.
            teardown(&state.registry, &session, CloseReason::TransportError).await;
            match e {
                McpError::SessionClosed => HttpError::session_not_found().into_response(),
                e => {
                    tracing::error!("Session {id}: transport failed: {e}");
                    HttpError::internal(e.to_string()).into_response()
                }
            }
        }
        Err(e) => {
            // A processing error leaves the session usable for later requests.
            tracing::error!("Session {id}: failed to process message: {e}");
            with_session_header(id, HttpError::internal(e.to_string()))
        }
    }
}

async fn handle_initialize(state: &AppState, body: &Bytes) -> Response {
    let message = match validator::parse_message(body) {
        Ok(message) if message.is_initialize_request() => message,
        Ok(_) | Err(_) => {
            tracing::warn!("Rejecting POST without session id: not an initialize request");
            return HttpError::not_initialize().into_response();
        }
    };

    match state.coordinator.initialize(message).await {
        Ok(outcome) => with_session_header(outcome.session.id(), Json(outcome.reply)),
        Err(HandshakeError::NotInitialize) => HttpError::not_initialize().into_response(),
        Err(HandshakeError::Rejected {
            reply,
            client_error,
            ..
        }) => {
            let status = if client_error {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            };
            (status, Json(reply)).into_response()
        }
        Err(e) => {
            tracing::error!("Handshake failed: {e}");
            HttpError::internal(e.to_string()).into_response()
        }
    }
}

async fn handle_get(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = match resolve_session(&state, &headers).await {
        Ok(session) => session,
        Err(e) => return e.into_response(),
    };
    let id = session.id();

    match session.transport().open_stream() {
        Ok(stream) => {
            tracing::info!("Session {id}: push stream opened");
            let keep_alive = KeepAlive::new().interval(session.transport().keep_alive());
            with_session_header(id, Sse::new(stream).keep_alive(keep_alive))
        }
        Err(e) => {
            tracing::warn!("Session {id}: cannot open push stream: {e}");
            HttpError::from(e).into_response()
        }
    }
}

async fn handle_delete(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let session = match resolve_session(&state, &headers).await {
        Ok(session) => session,
        Err(e) => return e.into_response(),
    };

    teardown(&state.registry, &session, CloseReason::Deleted).await;
    StatusCode::NO_CONTENT.into_response()
}
