//! Stateless mode: every POST gets its own short-lived engine.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::protocol::validator;
use crate::session::PendingSession;

use super::error::HttpError;
use super::http::AppState;

/// Handle `POST /mcp` without sessions.
///
/// The engine and adapter live for this request only and are released before
/// the response is sent. No session id is issued and the registry is not used.
pub async fn handle_post(State(state): State<AppState>, body: Bytes) -> Response {
    let message = match validator::parse_message(&body) {
        Ok(message) => message,
        Err(e) => return HttpError::from(e).into_response(),
    };

    let engine = match state.factory.create() {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!("Failed to construct engine: {e}");
            return HttpError::internal(e.to_string()).into_response();
        }
    };

    let pair = PendingSession::new(engine, &state.config.adapter_config());
    let result = pair.forward(message).await;
    pair.release().await;

    match result {
        Ok(Some(reply)) => Json(reply).into_response(),
        Ok(None) => StatusCode::ACCEPTED.into_response(),
        Err(e) => {
            tracing::error!("Stateless request failed: {e}");
            HttpError::internal(e.to_string()).into_response()
        }
    }
}

/// `GET` and `DELETE` address sessions, which do not exist in stateless mode.
pub async fn reject_session_verb() -> HttpError {
    HttpError::new(
        StatusCode::METHOD_NOT_ALLOWED,
        "sessions are disabled in stateless mode",
    )
}
