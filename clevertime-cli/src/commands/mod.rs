//! CLI commands.

mod advise;
mod cache;
mod convert;
mod panels;
mod viz;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::Path;

use crate::output::OutputFormat;

/// Clevertime - configuration assistants for time-series databases.
#[derive(Debug, Parser)]
#[command(name = "clevertime-cli")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (table or json).
    #[arg(long, global = true, default_value = "table", env = "CLEVERTIME_FORMAT")]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the available tools.
    Panels,

    /// Split memory and disk between caches and emit a config snippet.
    Cache(cache::CacheCommand),

    /// Review a CREATE TABLE statement.
    Advise(advise::AdviseCommand),

    /// Convert SQL identifier quoting between dialects.
    Convert(convert::ConvertCommand),

    /// Render scan metrics from an EXPLAIN ANALYZE VERBOSE output.
    Viz(viz::VizCommand),
}

impl Cli {
    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        let ctx = CommandContext {
            format: OutputFormat::from_flag(&self.format),
        };

        match self.command {
            Commands::Panels => panels::run(&ctx),
            Commands::Cache(cmd) => cmd.run(&ctx),
            Commands::Advise(cmd) => cmd.run(&ctx).await,
            Commands::Convert(cmd) => cmd.run(&ctx),
            Commands::Viz(cmd) => cmd.run(&ctx),
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub format: OutputFormat,
}

/// Read a file, or stdin when no path is given.
pub(crate) fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

/// Split `KEY=VALUE`, trimming both sides.
pub(crate) fn split_assignment(spec: &str) -> Result<(&str, &str)> {
    let (key, value) = spec
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Invalid assignment '{}'. Use KEY=VALUE.", spec))?;
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("Invalid assignment '{}'. Key cannot be empty.", spec);
    }
    Ok((key, value.trim()))
}
