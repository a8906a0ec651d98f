//! Tool registration and dispatch.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde_json::Value;

use crate::protocol::EngineState;
use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

use super::{echo, notify, session_info};

/// Registry of all available MCP tools.
pub struct ToolRegistry;

impl ToolRegistry {
    /// List all tool definitions.
    pub fn list_tools() -> Vec<ToolDefinition> {
        vec![
            echo::definition(),
            session_info::definition(),
            notify::definition(),
        ]
    }

    /// Call a tool by name.
    ///
    /// Unknown tools and malformed arguments are protocol errors. Failures
    /// while the tool runs are reported in the result with `isError` set.
    pub async fn call(
        name: &str,
        arguments: Option<Value>,
        state: &Arc<Mutex<EngineState>>,
    ) -> McpResult<ToolCallResult> {
        let args = arguments.unwrap_or(Value::Object(serde_json::Map::new()));

        let result = match name {
            "echo" => echo::execute(args).await,
            "session_info" => session_info::execute(args, state).await,
            "notify" => notify::execute(args, state).await,
            _ => return Err(McpError::ToolNotFound(name.to_string())),
        };

        match result {
            Ok(result) => Ok(result),
            Err(e @ McpError::InvalidParams(_)) => Err(e),
            Err(e) => {
                tracing::warn!("Tool {name} failed: {e}");
                Ok(ToolCallResult::error(e.to_string()))
            }
        }
    }
}
