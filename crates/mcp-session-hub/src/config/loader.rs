//! Server configuration: defaults, TOML file, then environment overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::transport::adapter::{AdapterConfig, DEFAULT_KEEP_ALIVE_SECS, DEFAULT_PUSH_BUFFER};
use crate::types::{McpError, McpResult};

/// Environment variable overriding the listen port.
pub const PORT_ENV: &str = "PORT";

/// Default listen host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default request body limit (4 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// How the server maps clients to engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// One engine per session, addressed by `Mcp-Session-Id`.
    #[default]
    Stateful,
    /// One engine per request; no session ids.
    Stateless,
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen host.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Stateful or stateless session handling.
    pub session_mode: SessionMode,
    /// Outbound messages buffered per session before new ones are dropped.
    pub push_buffer: usize,
    /// Seconds between SSE keep-alive comments.
    pub keep_alive_secs: u64,
    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            session_mode: SessionMode::default(),
            push_buffer: DEFAULT_PUSH_BUFFER,
            keep_alive_secs: DEFAULT_KEEP_ALIVE_SECS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ServerConfig {
    /// `host:port` to bind.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Per-session transport tuning derived from this config.
    pub fn adapter_config(&self) -> AdapterConfig {
        AdapterConfig {
            push_buffer: self.push_buffer,
            keep_alive: Duration::from_secs(self.keep_alive_secs.max(1)),
        }
    }

    /// Apply a `PORT` value, as read from the environment.
    pub fn apply_port_override(&mut self, value: Option<&str>) -> McpResult<()> {
        if let Some(raw) = value {
            self.port = raw
                .trim()
                .parse()
                .map_err(|_| McpError::Config(format!("invalid {PORT_ENV} value: {raw:?}")))?;
        }
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> McpResult<()> {
        let port = std::env::var(PORT_ENV).ok();
        self.apply_port_override(port.as_deref())
    }
}

/// Load configuration from an optional TOML file, then apply environment overrides.
///
/// With no path the defaults are used. A path that cannot be read or parsed is an error.
pub fn load_config(path: Option<&str>) -> McpResult<ServerConfig> {
    let mut config = match path {
        Some(path) => read_config_file(Path::new(path))?,
        None => ServerConfig::default(),
    };
    config.apply_env()?;
    Ok(config)
}

fn read_config_file(path: &Path) -> McpResult<ServerConfig> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        McpError::Config(format!("failed to read config {}: {e}", path.display()))
    })?;
    let config: ServerConfig = toml::from_str(&raw).map_err(|e| {
        McpError::Config(format!("failed to parse config {}: {e}", path.display()))
    })?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(config)
}
