//! Convert command (SQL dialect quoting).

use anyhow::Result;
use clap::Args;
use clevertime_core::dialect::{convert, Dialect};
use serde::Serialize;
use std::path::PathBuf;

use crate::output::{print_single, OutputFormat};

use super::{read_input, CommandContext};

/// Convert command - swap identifier quoting between dialects.
#[derive(Debug, Args)]
pub struct ConvertCommand {
    /// File with the SQL to convert; reads stdin when omitted.
    file: Option<PathBuf>,

    /// Source dialect (postgresql or mysql).
    #[arg(long, default_value = "postgresql")]
    from: Dialect,

    /// Target dialect (postgresql or mysql).
    #[arg(long, default_value = "mysql")]
    to: Dialect,
}

#[derive(Debug, Serialize)]
struct ConvertOutput {
    from: Dialect,
    to: Dialect,
    sql: String,
}

impl ConvertCommand {
    pub fn run(self, ctx: &CommandContext) -> Result<()> {
        let input = read_input(self.file.as_deref())?;
        let sql = convert(input.trim_end(), self.from, self.to);

        match ctx.format {
            OutputFormat::Json => print_single(&ConvertOutput {
                from: self.from,
                to: self.to,
                sql,
            }),
            OutputFormat::Table => println!("{}", sql),
        }
        Ok(())
    }
}
