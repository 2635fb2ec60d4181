//! # Provenance Ledger Node
//!
//! Boots the node from the environment and serves newline-delimited JSON
//! commands on stdin until the stream ends or Ctrl+C arrives.

use anyhow::{Context, Result};
use node_runtime::{Node, NodeConfig};
use tokio::io::BufReader;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();

    let config = NodeConfig::from_env().context("failed to load configuration")?;
    let node = Node::boot(config).await?;

    info!("Reading commands from stdin. Press Ctrl+C to stop.");
    let stdin = BufReader::new(tokio::io::stdin());
    tokio::select! {
        result = node.serve(stdin, tokio::io::stdout()) => match result {
            Ok(handled) => info!(handled, "Input closed"),
            Err(e) => error!(error = %format!("{e:#}"), "Command loop failed"),
        },
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl+C")?;
            info!("Shutdown requested");
        }
    }

    node.shutdown().await;
    Ok(())
}
