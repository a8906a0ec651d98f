//! Tool `session_info`: Describe the session this engine serves.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde_json::{json, Value};

use crate::protocol::EngineState;
use crate::types::{McpResult, ToolCallResult, ToolDefinition};

/// Return the tool definition for session_info.
pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "session_info".to_string(),
        description: Some(
            "Show the current session id, negotiated protocol version and request count"
                .to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {}
        }),
    }
}

/// Session details as JSON, shared with the `session://current` resource.
pub fn describe(state: &EngineState) -> Value {
    json!({
        "session_id": state.session_id().map(|id| id.to_string()),
        "protocol_version": state.negotiated.protocol_version,
        "client": state.negotiated.client_info,
        "initialized": state.negotiated.initialized,
        "requests_handled": state.requests_handled,
        "log_level": state.log_level,
    })
}

/// Execute the session_info tool.
pub async fn execute(_args: Value, state: &Arc<Mutex<EngineState>>) -> McpResult<ToolCallResult> {
    let state = state.lock().await;
    Ok(ToolCallResult::json(&describe(&state)))
}
