//! MCP tools exposed by the built-in engine.

pub mod echo;
pub mod notify;
pub mod registry;
pub mod session_info;

pub use registry::ToolRegistry;
