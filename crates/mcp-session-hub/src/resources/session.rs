//! Resource handler for `session://current`.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::protocol::EngineState;
use crate::tools::session_info;
use crate::types::{McpResult, ReadResourceResult};

use super::templates::SESSION_URI;

/// Read the current session's details.
pub async fn read_current(state: &Arc<Mutex<EngineState>>) -> McpResult<ReadResourceResult> {
    let state = state.lock().await;
    Ok(ReadResourceResult::json(
        SESSION_URI,
        &session_info::describe(&state),
    ))
}
