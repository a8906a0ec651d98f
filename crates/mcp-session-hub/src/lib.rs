//! mcp-session-hub: many independent MCP sessions over plain HTTP in one process.
//!
//! A client opens a session with `POST /mcp` carrying `initialize`; the
//! response's `Mcp-Session-Id` header addresses that session from then on.
//! `GET /mcp` opens the session's server-push stream and `DELETE /mcp` ends it.
//! Each session owns its own protocol engine and transport adapter.

pub mod config;
pub mod protocol;
pub mod resources;
pub mod session;
pub mod tools;
pub mod transport;
pub mod types;

pub use config::ServerConfig;
pub use protocol::{EngineFactory, ProtocolEngine, ProtocolHandler};
pub use session::{SessionId, SessionRegistry};
pub use transport::{create_router, AppState, HttpTransport, SESSION_ID_HEADER};
