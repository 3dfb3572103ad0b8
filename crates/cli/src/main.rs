//! FileChat CLI — the main entry point.
//!
//! Commands:
//! - `serve`    — Start the web chat (HTTP gateway + embedded frontend)
//! - `chat`     — Terminal chat, single-message or interactive
//! - `onboard`  — Write the default config and secret store
//! - `doctor`   — Check config, API key and provider reachability

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "filechat",
    about = "FileChat — chat with an LLM about the files you upload",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web chat server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat in the terminal
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Attach a file before the first message (repeatable)
        #[arg(short, long = "attach", value_name = "FILE")]
        attach: Vec<PathBuf>,

        /// Select a topic for the system instruction
        #[arg(short, long)]
        topic: Option<String>,
    },

    /// Initialize configuration and the secret store
    Onboard,

    /// Diagnose configuration and provider health
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Chat {
            message,
            attach,
            topic,
        } => commands::chat::run(message, attach, topic).await?,
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
