//! nas-mcp — serves the TrueNAS tool catalog over MCP stdio.

use anyhow::{anyhow, Context, Result};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use nas_mcp::config::{self, LogFormat, ServerConfig};
use nas_mcp::server::StdioServer;

/// Logs go to stderr; stdout carries protocol frames only.
fn init_logging(config: &ServerConfig) -> Result<()> {
    let default_level = if config.debug_mode { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("Invalid log filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true);

    match config.log_format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|e| anyhow!("Failed to set tracing subscriber: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config::config_path();
    let config = config::load_config(&config_path)?;
    init_logging(&config)?;

    if !config_path.exists() {
        warn!("Config file not found at {}, using defaults", config_path.display());
    }
    info!(
        "nas-mcp {} starting (backend: {})",
        env!("CARGO_PKG_VERSION"),
        if config.mock_truenas { "mock" } else { "truenas" }
    );
    debug!(?config, "Effective configuration");

    let server = StdioServer::from_config(&config);
    server.run().await
}
