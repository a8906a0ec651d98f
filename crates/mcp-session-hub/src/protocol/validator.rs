//! Decoding and validation of inbound JSON-RPC messages.

use serde_json::Value;

use crate::types::{JsonRpcMessage, JsonRpcRequest, McpError, McpResult, RequestId, JSONRPC_VERSION};

/// Decode an HTTP request body into a single JSON-RPC message.
pub fn parse_message(body: &[u8]) -> McpResult<JsonRpcMessage> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(McpError::InvalidRequest("empty request body".to_string()));
    }

    let value: Value =
        serde_json::from_slice(body).map_err(|e| McpError::ParseError(e.to_string()))?;

    if value.is_array() {
        return Err(McpError::InvalidRequest(
            "batch messages are not supported".to_string(),
        ));
    }

    let message: JsonRpcMessage = serde_json::from_value(value)
        .map_err(|e| McpError::InvalidRequest(format!("not a JSON-RPC message: {e}")))?;

    let message = normalize(message);
    validate(&message)?;
    Ok(message)
}

/// Check protocol version and method name.
pub fn validate(message: &JsonRpcMessage) -> McpResult<()> {
    let version = match message {
        JsonRpcMessage::Request(req) => &req.jsonrpc,
        JsonRpcMessage::Notification(notif) => &notif.jsonrpc,
        JsonRpcMessage::Response(resp) => &resp.jsonrpc,
        JsonRpcMessage::Error(err) => &err.jsonrpc,
    };
    if version != JSONRPC_VERSION {
        return Err(McpError::InvalidRequest(format!(
            "unsupported jsonrpc version: {version}"
        )));
    }

    if let Some(method) = message.method() {
        if method.trim().is_empty() {
            return Err(McpError::InvalidRequest("method must not be empty".to_string()));
        }
    }
    Ok(())
}

/// An `initialize` sent without an id is still a handshake; answer it with a null id.
fn normalize(message: JsonRpcMessage) -> JsonRpcMessage {
    match message {
        JsonRpcMessage::Notification(notif) if notif.method == "initialize" => {
            JsonRpcMessage::Request(JsonRpcRequest {
                jsonrpc: notif.jsonrpc,
                id: RequestId::Null,
                method: notif.method,
                params: notif.params,
            })
        }
        other => other,
    }
}
