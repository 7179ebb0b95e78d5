//! MCP Score Server Binary
//!
//! This binary runs the MCP server that drives a notation editor over its
//! WebSocket command API. It communicates via stdio and is configured
//! through environment variables.
//!
//! Environment variables:
//! - SCOREBRIDGE_EDITOR_HOST: Host the editor listens on (default: localhost)
//! - SCOREBRIDGE_EDITOR_PORT: Port of the editor's WebSocket API (default: 8765)

use anyhow::Result;
use mcp_score::{ScoreService, ScoreServiceConfig};
use notation::EditorClient;
use rmcp::{transport::stdio, ServiceExt};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (log to stderr to not interfere with stdio)
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Load configuration from environment
    let config = ScoreServiceConfig::from_env()?;

    let client = EditorClient::new(&config.host, config.port);
    info!(uri = %client.uri(), "Starting MCP Score Server");

    // The connection itself is established lazily on the first command.
    let service = ScoreService::new(client);

    // Start serving
    let server = service.serve(stdio()).await?;

    info!("MCP Score Server running");

    // Wait for the server to finish (client disconnects)
    server.waiting().await?;

    info!("MCP Score Server shutting down");

    Ok(())
}
