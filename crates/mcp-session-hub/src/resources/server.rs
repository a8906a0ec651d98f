//! Resource handler for `server://capabilities`.

use crate::types::{InitializeResult, McpResult, ReadResourceResult};

use super::templates::CAPABILITIES_URI;

/// Read the advertised capabilities.
pub fn read_capabilities() -> McpResult<ReadResourceResult> {
    Ok(ReadResourceResult::json(
        CAPABILITIES_URI,
        &InitializeResult::default_result(),
    ))
}
