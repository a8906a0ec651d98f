//! mcp-session-hub entry point.

use clap::{Parser, Subcommand};

use mcp_session_hub::config::{load_config, SessionMode};
use mcp_session_hub::tools::ToolRegistry;
use mcp_session_hub::transport::{AppState, HttpTransport};

#[derive(Parser)]
#[command(
    name = "mcp-session-hub",
    about = "Serve stateful MCP sessions over streamable HTTP",
    version
)]
struct Cli {
    /// Configuration file path.
    #[arg(short, long)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default).
    Serve {
        /// Listen host.
        #[arg(long)]
        host: Option<String>,

        /// Listen port (overrides config and PORT).
        #[arg(short, long)]
        port: Option<u16>,

        /// Session handling mode.
        #[arg(long, value_enum)]
        mode: Option<SessionMode>,

        /// Configuration file path.
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Print server capabilities as JSON.
    Info,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
        mode: None,
        config: None,
    }) {
        Commands::Serve {
            host,
            port,
            mode,
            config,
        } => {
            let config_path = config.or(cli.config);
            let mut server_config = load_config(config_path.as_deref())?;
            if let Some(host) = host {
                server_config.host = host;
            }
            if let Some(port) = port {
                server_config.port = port;
            }
            if let Some(mode) = mode {
                server_config.session_mode = mode;
            }

            let addr = server_config.addr();
            let transport = HttpTransport::new(AppState::with_default_engine(server_config));
            transport.run(&addr).await?;
        }

        Commands::Info => {
            let capabilities = mcp_session_hub::types::InitializeResult::default_result();
            let tools = ToolRegistry::list_tools();
            let info = serde_json::json!({
                "server": capabilities.server_info,
                "protocol_version": capabilities.protocol_version,
                "capabilities": capabilities.capabilities,
                "tools": tools.iter().map(|t| &t.name).collect::<Vec<_>>(),
                "tool_count": tools.len(),
            });
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
    }

    Ok(())
}
