use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use notes_core::{
    config::NotesConfig,
    mcp_server::{JsonRpcHandler, McpServer},
    transport::StdioTransport,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (config, warnings) = NotesConfig::load_with_warnings()?;

    // stdout carries protocol frames, so logs go to stderr.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.filter_directive()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    for warning in &warnings {
        warn!("Ignoring {}", warning);
    }
    info!(
        version = env!("CARGO_PKG_VERSION"),
        default_account = ?config.default_account,
        "Starting Apple Notes MCP server"
    );

    let connector = notes_core::build_connector(&config);
    let server = McpServer::new(connector);
    let handler = JsonRpcHandler::new(server);
    let transport = StdioTransport::new(handler);

    info!("MCP Server ready, listening on stdio");

    tokio::select! {
        result = transport.run() => {
            if let Err(e) = result {
                error!("Transport error: {}", e);
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
        }
    }

    Ok(())
}
