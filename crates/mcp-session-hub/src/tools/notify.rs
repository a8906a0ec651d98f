//! Tool `notify`: Push a log notification to the session's event stream.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::protocol::EngineState;
use crate::types::{LogLevel, McpError, McpResult, ToolCallResult, ToolDefinition};

#[derive(Debug, Deserialize)]
struct NotifyParams {
    message: String,
    #[serde(default)]
    level: LogLevel,
}

/// Return the tool definition for notify.
pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "notify".to_string(),
        description: Some(
            "Send a notifications/message to this session's push stream (GET /mcp)".to_string(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "message": { "type": "string", "description": "Message to push" },
                "level": {
                    "type": "string",
                    "enum": ["debug", "info", "notice", "warning", "error"],
                    "default": "info"
                }
            },
            "required": ["message"]
        }),
    }
}

/// Execute the notify tool.
pub async fn execute(args: Value, state: &Arc<Mutex<EngineState>>) -> McpResult<ToolCallResult> {
    let params: NotifyParams =
        serde_json::from_value(args).map_err(|e| McpError::InvalidParams(e.to_string()))?;

    let state = state.lock().await;
    let queued = state.push_log(params.level, "notify", json!(params.message))?;

    Ok(ToolCallResult::json(&json!({
        "queued": queued,
        "level": params.level,
    })))
}
