//! Roster gateway binary.
//!
//! Serves the user REST API from an in-memory store.
//!
//! Settings come from `ROSTER_BIND_ADDR` / `ROSTER_API_TOKEN`, and the
//! command-line flags override them.

use clap::Parser;
use roster_server::{RosterServer, ServerConfig};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

/// Roster REST gateway.
#[derive(Parser)]
#[command(name = "roster-server")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Bearer token required on /api routes
    #[arg(short, long)]
    token: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = ServerConfig::from_env();
    if let Some(bind) = cli.bind {
        config = config.with_bind_addr(bind);
    }
    if let Some(token) = cli.token {
        config = config.with_api_token(token);
    }

    RosterServer::new(config).run().await?;
    Ok(())
}
