//! Resource registration and dispatch for MCP resources.

use std::sync::Arc;
use tokio::sync::Mutex;

use crate::protocol::EngineState;
use crate::types::{McpError, McpResult, ReadResourceResult, ResourceDefinition};

use super::templates::{CAPABILITIES_URI, SESSION_URI};
use super::{server, session, templates};

/// Registry of all available MCP resources.
pub struct ResourceRegistry;

impl ResourceRegistry {
    /// List all concrete resources.
    pub fn list_resources() -> Vec<ResourceDefinition> {
        templates::list_resources()
    }

    /// Read a resource by URI, dispatching to the appropriate handler.
    pub async fn read(
        uri: &str,
        state: &Arc<Mutex<EngineState>>,
    ) -> McpResult<ReadResourceResult> {
        match uri {
            SESSION_URI => session::read_current(state).await,
            CAPABILITIES_URI => server::read_capabilities(),
            _ => Err(McpError::ResourceNotFound(uri.to_string())),
        }
    }
}
