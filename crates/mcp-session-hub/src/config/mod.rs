//! Configuration loading and resolution.

pub mod loader;

pub use loader::{load_config, ServerConfig, SessionMode};
