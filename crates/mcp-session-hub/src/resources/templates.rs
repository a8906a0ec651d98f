//! Resource definitions.

use crate::types::ResourceDefinition;

/// URI of the current session resource.
pub const SESSION_URI: &str = "session://current";

/// URI of the server capabilities resource.
pub const CAPABILITIES_URI: &str = "server://capabilities";

/// Return all concrete resource definitions.
pub fn list_resources() -> Vec<ResourceDefinition> {
    vec![
        ResourceDefinition {
            uri: SESSION_URI.to_string(),
            name: "Current Session".to_string(),
            description: Some("Id, client and request count of this session".to_string()),
            mime_type: Some("application/json".to_string()),
        },
        ResourceDefinition {
            uri: CAPABILITIES_URI.to_string(),
            name: "Server Capabilities".to_string(),
            description: Some("The initialize result this server advertises".to_string()),
            mime_type: Some("application/json".to_string()),
        },
    ]
}
