//! Transport layer: per-session adapters and the HTTP surface.

pub mod adapter;
pub mod error;
pub mod http;
pub mod push;
pub mod stateless;

pub use adapter::{AdapterConfig, CloseHook, TransportAdapter};
pub use error::HttpError;
pub use http::{create_router, AppState, HttpTransport, MCP_PATH, SESSION_ID_HEADER};
pub use push::PushSender;
