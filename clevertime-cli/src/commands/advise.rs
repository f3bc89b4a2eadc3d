//! Advise command (table model review).

use anyhow::{Context, Result};
use clap::Args;
use clevertime_core::advisor::{
    generate_suggestions, parse_create_table, Column, GlobalData, RemoteParser, Suggestion,
};
use serde::Serialize;
use std::path::PathBuf;
use tabled::Tabled;

use crate::output::{print_heading, print_output, print_single, OutputFormat};

use super::{read_input, split_assignment, CommandContext};

/// Advise command - parse a CREATE TABLE statement and suggest improvements.
#[derive(Debug, Args)]
pub struct AdviseCommand {
    /// File with the CREATE TABLE statement; reads stdin when omitted.
    file: Option<PathBuf>,

    /// Parse on a running server (host:port) instead of locally.
    #[arg(long)]
    server: Option<String>,

    /// Ingest throughput in rows per second.
    #[arg(long)]
    ingest: Option<u64>,

    /// The data contains duplicate rows that should be kept.
    #[arg(long)]
    duplicates: bool,

    /// Estimated distinct values of a column, in format COLUMN=COUNT.
    /// Can be specified multiple times.
    #[arg(long)]
    cardinality: Vec<String>,
}

#[derive(Debug, Serialize, Tabled)]
struct ColumnRow {
    #[tabled(rename = "Column")]
    name: String,
    #[tabled(rename = "Type")]
    data_type: String,
    #[tabled(rename = "Semantic")]
    semantic_type: String,
    #[tabled(rename = "Index")]
    index: String,
    #[tabled(rename = "Nullable")]
    nullable: bool,
    #[tabled(rename = "Cardinality")]
    cardinality: String,
}

impl From<&Column> for ColumnRow {
    fn from(col: &Column) -> Self {
        Self {
            name: col.name.clone(),
            data_type: col.data_type.clone(),
            semantic_type: format!("{:?}", col.semantic_type).to_lowercase(),
            index: col.index.map(|i| i.to_string()).unwrap_or_else(|| "-".into()),
            nullable: col.nullable,
            cardinality: col
                .cardinality
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".into()),
        }
    }
}

#[derive(Debug, Serialize)]
struct AdviseOutput {
    columns: Vec<Column>,
    suggestions: Vec<Suggestion>,
}

impl AdviseCommand {
    pub async fn run(self, ctx: &CommandContext) -> Result<()> {
        let sql = read_input(self.file.as_deref())?;

        let mut columns = match &self.server {
            Some(server) => RemoteParser::new(server.as_str())?.parse(&sql).await?,
            None => parse_create_table(&sql)?,
        };
        apply_cardinality(&mut columns, &self.cardinality)?;

        let global = GlobalData {
            ingest_throughput: self.ingest,
            has_duplicates: self.duplicates,
        };
        let mut suggestions = generate_suggestions(&columns, &global);
        if suggestions.is_empty() {
            suggestions.push(Suggestion::all_good());
        }

        match ctx.format {
            OutputFormat::Json => print_single(&AdviseOutput {
                columns,
                suggestions,
            }),
            OutputFormat::Table => {
                let rows: Vec<ColumnRow> = columns.iter().map(ColumnRow::from).collect();
                print_output(&rows, ctx.format);
                print_heading("Suggestions:");
                for suggestion in &suggestions {
                    print_suggestion(suggestion);
                }
            }
        }
        Ok(())
    }
}

/// Attach `COLUMN=COUNT` estimates to the parsed columns.
fn apply_cardinality(columns: &mut [Column], specs: &[String]) -> Result<()> {
    for spec in specs {
        let (name, count) = split_assignment(spec)?;
        let count: u64 = count
            .parse()
            .with_context(|| format!("Invalid cardinality '{}' for column '{}'", count, name))?;
        let column = columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| anyhow::anyhow!("Unknown column '{}'", name))?;
        column.cardinality = Some(count);
    }
    Ok(())
}

fn print_suggestion(suggestion: &Suggestion) {
    println!("\n* {}", suggestion.title);
    println!("  {}", suggestion.explanation);
    if let Some(sql) = &suggestion.sql {
        for line in sql.lines() {
            println!("    {}", line);
        }
    }
}
