//! clevertime-cli - configuration assistants from the terminal
//!
//! Runs the cache calculator, model advisor, SQL formatter and scan
//! metrics visualizer without the HTTP server.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so JSON output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = cli.run().await {
        output::print_error(&e);
        std::process::exit(1);
    }

    Ok(())
}
