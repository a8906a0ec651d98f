//! MCP resources: read-only views of the session and server.

pub mod registry;
pub mod server;
pub mod session;
pub mod templates;

pub use registry::ResourceRegistry;
