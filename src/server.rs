//! MCP server initialization over stdio.
//!
//! [`serve_stdio`] wires the store and embedder into the tool handler and
//! blocks until the client disconnects. Logging goes to stderr so stdout
//! stays clean for JSON-RPC.

use anyhow::Result;
use rmcp::ServiceExt;
use std::sync::{Arc, Mutex};

use crate::cli;
use crate::config::MemelordConfig;
use crate::tools::MemelordTools;

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: MemelordConfig) -> Result<()> {
    tracing::info!("starting memelord MCP server on stdio");

    let store = cli::open_store(&config)?;
    tracing::info!(
        db = %config.db_path().display(),
        session = store.session_id(),
        "memory store ready"
    );

    let tools = MemelordTools::new(Arc::new(Mutex::new(store)));
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running — waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}
