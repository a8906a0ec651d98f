//! MCP notification types pushed from server to client.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::message::JsonRpcNotification;

/// Method name for log message notifications.
pub const LOG_MESSAGE_METHOD: &str = "notifications/message";

/// Log message notification params (server → client).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogMessageParams {
    /// Log level.
    pub level: LogLevel,
    /// Optional logger name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logger: Option<String>,
    /// Log message data.
    pub data: Value,
}

/// Log levels for MCP logging, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Notice level.
    Notice,
    /// Warning level.
    Warning,
    /// Error level.
    Error,
}

impl LogMessageParams {
    /// Wrap these params into a `notifications/message` notification.
    pub fn into_notification(self) -> JsonRpcNotification {
        JsonRpcNotification::new(
            LOG_MESSAGE_METHOD.to_string(),
            Some(serde_json::to_value(self).unwrap_or_default()),
        )
    }
}
