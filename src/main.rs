use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use memelord::{cli, config, server};

#[derive(Parser)]
#[command(
    name = "memelord",
    version,
    about = "Per-project persistent memory layer for coding agents"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the MCP server (stdio transport)
    Serve,
    /// Show store statistics
    Stats,
    /// Show the highest-weighted memories
    Top {
        /// How many memories to show
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,
    },
    /// Apply one time-decay pass and prune exhausted memories
    Decay,
    /// Delete every memory below a weight threshold
    Purge {
        /// Weight threshold
        threshold: f64,
    },
    /// Embed pending memories stored by hooks
    EmbedPending,
    /// Check database health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::MemelordConfig::load()?;

    // Log to stderr so stdout stays clean for MCP JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => {
            server::serve_stdio(config).await?;
        }
        Command::Stats => {
            cli::stats::stats(&config)?;
        }
        Command::Top { count } => {
            cli::stats::top(&config, count)?;
        }
        Command::Decay => {
            cli::maintenance::decay(&config)?;
        }
        Command::Purge { threshold } => {
            cli::maintenance::purge(&config, threshold)?;
        }
        Command::EmbedPending => {
            cli::maintenance::embed_pending(&config)?;
        }
        Command::Doctor => {
            cli::doctor::doctor(&config)?;
        }
    }

    Ok(())
}
