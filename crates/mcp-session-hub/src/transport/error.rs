//! HTTP-facing errors for the session layer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::types::McpError;

/// Message returned when a POST carries no session id and is not `initialize`.
pub const NOT_INITIALIZE_MESSAGE: &str = "missing session id and not an initialize request";

/// Message returned when a session-scoped request carries no session id.
pub const MISSING_SESSION_MESSAGE: &str = "missing session id";

/// Message returned when the session id is unknown.
pub const SESSION_NOT_FOUND_MESSAGE: &str = "Session not found";

/// An error response rendered as `{"error":{"message":...}}`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{status}: {message}")]
pub struct HttpError {
    status: StatusCode,
    message: String,
}

impl HttpError {
    /// Build an error with an explicit status.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400: POST without a session id whose body is not `initialize`.
    pub fn not_initialize() -> Self {
        Self::new(StatusCode::BAD_REQUEST, NOT_INITIALIZE_MESSAGE)
    }

    /// 400: session-scoped request without a session id.
    pub fn missing_session() -> Self {
        Self::new(StatusCode::BAD_REQUEST, MISSING_SESSION_MESSAGE)
    }

    /// 404: unknown or already closed session.
    pub fn session_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, SESSION_NOT_FOUND_MESSAGE)
    }

    /// 400 with a custom message.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 500 with a custom message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Status code of this error.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Message of this error.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<McpError> for HttpError {
    fn from(e: McpError) -> Self {
        match e {
            McpError::SessionNotFound(_) | McpError::SessionClosed => Self::session_not_found(),
            McpError::StreamAlreadyOpen => Self::new(StatusCode::CONFLICT, e.to_string()),
            ref other if other.is_client_error() => Self::bad_request(other.to_string()),
            other => Self::internal(other.to_string()),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "error": { "message": self.message } })),
        )
            .into_response()
    }
}
