//! cqa-rs CLI — the main entry point.
//!
//! Commands:
//! - `query` — Ask a question about a comparison (blocking or streaming)
//! - `serve` — Start the HTTP/WebSocket query service

use clap::Parser;

use cqa_rs::cli::{Cli, Commands, commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Log to stderr; stdout is reserved for answers and event frames.
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
        Commands::Query {
            comparison_id,
            question,
            agent,
            stream,
        } => commands::run_query(&comparison_id, &question, &agent, stream).await,
        Commands::Serve { host, port } => commands::run_serve(&host, port).await,
    }
}
