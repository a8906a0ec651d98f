//! MCP protocol layer: the engine contract, the built-in handler, validation and negotiation.

pub mod engine;
pub mod handler;
pub mod negotiation;
pub mod validator;

pub use engine::{DefaultEngineFactory, EngineFactory, ProtocolEngine};
pub use handler::{EngineState, ProtocolHandler};
