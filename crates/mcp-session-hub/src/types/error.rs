//! Error types and JSON-RPC error codes.

use serde_json::Value;

use super::message::{JsonRpcError, RequestId};

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    /// Invalid JSON was received.
    pub const PARSE_ERROR: i32 = -32700;
    /// The JSON sent is not a valid request object.
    pub const INVALID_REQUEST: i32 = -32600;
    /// The method does not exist or is not available.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid method parameters.
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// Server-defined error codes (-32000 to -32099).
pub mod mcp_error_codes {
    /// Named tool does not exist.
    pub const TOOL_NOT_FOUND: i32 = -32001;
    /// Named resource does not exist.
    pub const RESOURCE_NOT_FOUND: i32 = -32002;
    /// Session is unknown or already closed.
    pub const SESSION_NOT_FOUND: i32 = -32003;
    /// Transport failure.
    pub const TRANSPORT_ERROR: i32 = -32004;
}

/// Errors produced by the session layer and the protocol engine.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// Malformed JSON.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Structurally valid JSON that is not an acceptable request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Unknown method.
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Parameters failed validation.
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// Unexpected internal failure.
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Unknown tool name.
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Unknown resource URI.
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// No session with this id is registered.
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// A session id was published twice. Never expected in practice.
    #[error("Duplicate session id: {0}")]
    DuplicateSessionId(String),

    /// The session's transport has been closed; it cannot carry more messages.
    #[error("Session closed")]
    SessionClosed,

    /// A push stream is already attached to the session.
    #[error("Push stream already open")]
    StreamAlreadyOpen,

    /// Transport-level failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(String),

    /// I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias used across the crate.
pub type McpResult<T> = Result<T, McpError>;

impl McpError {
    /// JSON-RPC error code for this error.
    pub fn code(&self) -> i32 {
        match self {
            McpError::ParseError(_) => error_codes::PARSE_ERROR,
            McpError::InvalidRequest(_) => error_codes::INVALID_REQUEST,
            McpError::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            McpError::InvalidParams(_) => error_codes::INVALID_PARAMS,
            McpError::ToolNotFound(_) => mcp_error_codes::TOOL_NOT_FOUND,
            McpError::ResourceNotFound(_) => mcp_error_codes::RESOURCE_NOT_FOUND,
            McpError::SessionNotFound(_) | McpError::SessionClosed => {
                mcp_error_codes::SESSION_NOT_FOUND
            }
            McpError::Transport(_) | McpError::StreamAlreadyOpen => {
                mcp_error_codes::TRANSPORT_ERROR
            }
            McpError::InternalError(_)
            | McpError::Json(_)
            | McpError::DuplicateSessionId(_)
            | McpError::Config(_)
            | McpError::Io(_) => error_codes::INTERNAL_ERROR,
        }
    }

    /// Whether the session's transport can no longer be used after this error.
    pub fn is_fatal_for_transport(&self) -> bool {
        matches!(self, McpError::SessionClosed | McpError::Transport(_))
    }

    /// Whether the error was caused by the client's input rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.code(),
            error_codes::PARSE_ERROR | error_codes::INVALID_REQUEST | error_codes::INVALID_PARAMS
        )
    }

    /// Build a JSON-RPC error reply for the given request id.
    pub fn to_json_rpc_error(&self, id: RequestId) -> JsonRpcError {
        JsonRpcError::new(id, self.code(), self.to_string())
    }

    /// Build a JSON-RPC error reply as a JSON value.
    pub fn to_json_rpc_value(&self, id: RequestId) -> Value {
        serde_json::to_value(self.to_json_rpc_error(id)).unwrap_or(Value::Null)
    }
}
