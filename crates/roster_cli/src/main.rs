//! Roster CLI
//!
//! Command-line client for the Roster user API.
//!
//! # Commands
//!
//! - `list` - Synchronize and print the user list
//! - `add` - Create a user, then print the refreshed list
//! - `show` - Print a single user
//! - `update` - Change a user's name or email
//! - `delete` - Remove a user

mod commands;
mod render;

use clap::{Parser, Subcommand};
use render::Format;
use roster_sync::UserId;
use tracing_subscriber::EnvFilter;

/// Roster user API client.
#[derive(Parser)]
#[command(name = "roster")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Gateway origin
    #[arg(global = true, short, long, env = "ROSTER_URL", default_value = "http://127.0.0.1:3000")]
    url: String,

    /// Bearer token presented to the gateway
    #[arg(global = true, short, long, env = "ROSTER_API_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Output format (text, json)
    #[arg(global = true, short, long, value_enum, default_value = "text")]
    format: Format,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synchronize and print the user list
    List,

    /// Create a user
    Add {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Contact email
        #[arg(short, long)]
        email: String,
    },

    /// Print a single user
    Show {
        /// User id
        id: UserId,
    },

    /// Change a user's name or email
    Update {
        /// User id
        id: UserId,

        /// New display name
        #[arg(short, long)]
        name: Option<String>,

        /// New contact email
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Remove a user
    Delete {
        /// User id
        id: UserId,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let session = commands::Session::connect(&cli.url, cli.token)?;

    match cli.command {
        Commands::List => commands::list::run(&session, cli.format).await?,
        Commands::Add { name, email } => {
            commands::add::run(&session, name, email, cli.format).await?;
        }
        Commands::Show { id } => commands::item::show(&session, id, cli.format).await?,
        Commands::Update { id, name, email } => {
            commands::item::update(&session, id, name, email, cli.format).await?;
        }
        Commands::Delete { id } => commands::item::delete(&session, id).await?,
    }

    Ok(())
}
