//! Viz command (scan metrics tables).

use anyhow::{Context, Result};
use clap::Args;
use clevertime_core::mitoviz::{FileSort, PartitionFilter, ScanMetrics, ScanView};
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use tabled::Tabled;

use crate::output::{print_heading, print_output, print_single, OutputFormat};

use super::{read_input, CommandContext};

/// Viz command - summarize the metrics JSON of a region scan.
#[derive(Debug, Args)]
pub struct VizCommand {
    /// File with the scan metrics JSON; reads stdin when omitted.
    file: Option<PathBuf>,

    /// File ordering: default, start_time, end_time, rows, size, index_size, time_span.
    #[arg(long, default_value = "default")]
    sort: FileSort,

    /// Only include these partitions. Can be specified multiple times.
    #[arg(long = "partition")]
    partitions: Vec<u64>,

    /// Only include partitions whose metrics contain this text.
    #[arg(long, default_value = "")]
    search: String,
}

#[derive(Debug, Serialize, Tabled)]
struct FieldRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Debug, Serialize, Tabled)]
struct FileTableRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "File")]
    short_id: String,
    #[tabled(rename = "Start")]
    start_time: String,
    #[tabled(rename = "End")]
    end_time: String,
    #[tabled(rename = "Span")]
    time_span: String,
    #[tabled(rename = "Rows")]
    rows: u64,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Index")]
    index_size: String,
}

#[derive(Debug, Serialize, Tabled)]
struct SummaryTableRow {
    #[tabled(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Total")]
    value: String,
}

impl VizCommand {
    pub fn run(self, ctx: &CommandContext) -> Result<()> {
        let input = read_input(self.file.as_deref())?;
        let metrics = ScanMetrics::from_json(&input).context("Invalid scan metrics")?;

        let filter = PartitionFilter {
            selected: (!self.partitions.is_empty())
                .then(|| self.partitions.iter().copied().collect::<HashSet<u64>>()),
            search: self.search,
        };
        let view = metrics.render(self.sort, &filter);

        match ctx.format {
            OutputFormat::Json => print_single(&view),
            OutputFormat::Table => print_tables(&view),
        }
        Ok(())
    }
}

fn print_tables(view: &ScanView) {
    let fields: Vec<FieldRow> = view
        .top_level
        .iter()
        .map(|r| FieldRow {
            key: r.field.clone(),
            value: r.value.clone(),
        })
        .chain((!view.projection.is_empty()).then(|| FieldRow {
            key: "projection".into(),
            value: view.projection.join(", "),
        }))
        .collect();
    print_output(&fields, OutputFormat::Table);

    print_heading(&format!("Files ({}):", view.files.len()));
    let files: Vec<FileTableRow> = view
        .files
        .iter()
        .map(|f| FileTableRow {
            index: f.index,
            short_id: f.short_id.clone(),
            start_time: f.start_time.clone(),
            end_time: f.end_time.clone(),
            time_span: f.time_span.clone(),
            rows: f.rows,
            size: f.size.clone(),
            index_size: f.index_size.clone(),
        })
        .collect();
    print_output(&files, OutputFormat::Table);

    print_heading(&format!("Partitions: {}", view.partitions.len()));
    let summary: Vec<SummaryTableRow> = view
        .summary
        .iter()
        .map(|s| SummaryTableRow {
            metric: s.metric.clone(),
            value: s.value.clone(),
        })
        .collect();
    print_output(&summary, OutputFormat::Table);
}
