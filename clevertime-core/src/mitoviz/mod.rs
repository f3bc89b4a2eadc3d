//! Region scan metrics visualizer
//!
//! Reads the JSON a region scan reports (files touched, per-partition
//! metrics) and derives the tables and timeline shown to the user.

mod chart;
mod format;

pub use chart::{
    chart_bars, chart_dimensions, color_for_value, metric_color, metric_stats, ChartBar,
    ChartDimensions, MetricStats,
};
pub use format::{
    format_field_name, format_file_size, format_nanos, format_timestamp, is_duration,
    parse_duration_nanos, parse_timestamp, shorten_file_id,
};

use crate::{AdvisorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Partition and range counts of a scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionCount {
    pub count: u64,
    pub mem_ranges: u64,
    pub files: u64,
    pub file_ranges: u64,
}

/// One SST file read by the scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileData {
    pub file_id: String,
    pub time_range_start: String,
    pub time_range_end: String,
    pub rows: u64,
    pub size: u64,
    pub index_size: u64,
}

impl FileData {
    /// Time covered by the file, in milliseconds
    pub fn time_span(&self) -> i64 {
        parse_timestamp(&self.time_range_end).saturating_sub(parse_timestamp(&self.time_range_start))
    }
}

/// A metric is either a number or a string such as `272.571µs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl MetricValue {
    /// Value in a comparable unit: raw numbers, durations in nanoseconds
    pub fn as_f64(&self) -> f64 {
        match self {
            MetricValue::Number(n) => *n,
            MetricValue::Text(s) => parse_duration_nanos(s),
            MetricValue::Other(_) => 0.0,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            MetricValue::Number(n) => write!(f, "{}", n),
            MetricValue::Text(s) => write!(f, "{}", s),
            MetricValue::Other(v) => write!(f, "{}", v),
        }
    }
}

/// Metrics of one scan partition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionMetrics {
    pub partition: u64,
    pub metrics: BTreeMap<String, MetricValue>,
}

/// Everything a scan reports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanMetrics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition_count: Option<PartitionCount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_mem_ranges: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_files: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_file_ranges: Option<u64>,
    #[serde(default)]
    pub projection: Vec<String>,
    #[serde(default)]
    pub files: Vec<FileData>,
    #[serde(default)]
    pub metrics_per_partition: Vec<PartitionMetrics>,
    /// Any other top-level entries
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Ordering of the file table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileSort {
    /// As reported
    #[default]
    Default,
    StartTime,
    EndTime,
    Rows,
    Size,
    IndexSize,
    TimeSpan,
}

impl FromStr for FileSort {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "default" => Ok(FileSort::Default),
            "start_time" => Ok(FileSort::StartTime),
            "end_time" => Ok(FileSort::EndTime),
            "rows" => Ok(FileSort::Rows),
            "size" => Ok(FileSort::Size),
            "index_size" => Ok(FileSort::IndexSize),
            "time_span" => Ok(FileSort::TimeSpan),
            other => Err(AdvisorError::InvalidInput(format!("unknown sort key: {}", other))),
        }
    }
}

/// Which partitions to include in tables and summaries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartitionFilter {
    /// Selected partition numbers; `None` selects all
    #[serde(default)]
    pub selected: Option<HashSet<u64>>,
    /// Case-insensitive substring matched against the serialized metrics
    #[serde(default)]
    pub search: String,
}

/// Row of the top-level table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopLevelRow {
    pub key: String,
    pub field: String,
    pub value: String,
}

/// Row of the file table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRow {
    pub index: usize,
    pub file_id: String,
    pub short_id: String,
    pub start_time: String,
    pub end_time: String,
    pub time_span: String,
    pub rows: u64,
    pub size: String,
    pub index_size: String,
}

/// Row of the summary table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    pub metric: String,
    pub value: String,
    pub total: f64,
}

/// Rendered partition cell with its heat color
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricCell {
    pub value: String,
    pub color: String,
}

/// Rendered partition row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionRow {
    pub partition: u64,
    pub metrics: BTreeMap<String, MetricCell>,
}

/// Everything the visualizer shows for one input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanView {
    pub top_level: Vec<TopLevelRow>,
    pub projection: Vec<String>,
    pub files: Vec<FileRow>,
    pub chart: Option<ChartDimensions>,
    pub bars: Vec<ChartBar>,
    pub partitions: Vec<PartitionRow>,
    pub summary: Vec<SummaryRow>,
}

impl ScanMetrics {
    /// Parse pasted JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let metrics: ScanMetrics = serde_json::from_str(json)?;
        debug!(
            "Loaded scan metrics: {} files, {} partitions",
            metrics.files.len(),
            metrics.metrics_per_partition.len()
        );
        Ok(metrics)
    }

    /// Files in the requested order
    pub fn sorted_files(&self, sort: FileSort) -> Vec<&FileData> {
        let mut files: Vec<&FileData> = self.files.iter().collect();
        match sort {
            FileSort::Default => {}
            FileSort::StartTime => files.sort_by_key(|f| parse_timestamp(&f.time_range_start)),
            FileSort::EndTime => files.sort_by_key(|f| parse_timestamp(&f.time_range_end)),
            FileSort::Rows => files.sort_by(|a, b| b.rows.cmp(&a.rows)),
            FileSort::Size => files.sort_by(|a, b| b.size.cmp(&a.size)),
            FileSort::IndexSize => files.sort_by(|a, b| b.index_size.cmp(&a.index_size)),
            FileSort::TimeSpan => files.sort_by(|a, b| b.time_span().cmp(&a.time_span())),
        }
        files
    }

    /// Partitions passing the filter
    pub fn filter_partitions(&self, filter: &PartitionFilter) -> Vec<&PartitionMetrics> {
        let needle = filter.search.to_lowercase();
        self.metrics_per_partition
            .iter()
            .filter(|p| {
                filter
                    .selected
                    .as_ref()
                    .map(|s| s.contains(&p.partition))
                    .unwrap_or(true)
            })
            .filter(|p| {
                needle.is_empty()
                    || serde_json::to_string(&p.metrics)
                        .map(|s| s.to_lowercase().contains(&needle))
                        .unwrap_or(false)
            })
            .collect()
    }

    /// Top-level entries other than projection, files and partitions
    pub fn top_level_rows(&self) -> Vec<TopLevelRow> {
        let mut rows = Vec::new();
        let mut push = |key: &str, value: String| {
            rows.push(TopLevelRow {
                key: key.to_string(),
                field: format_field_name(key),
                value,
            });
        };

        if let Some(count) = &self.partition_count {
            let value = [
                ("count", count.count),
                ("mem_ranges", count.mem_ranges),
                ("files", count.files),
                ("file_ranges", count.file_ranges),
            ]
            .iter()
            .map(|(k, v)| format!("{}: {}", format_field_name(k), v))
            .collect::<Vec<_>>()
            .join(", ");
            push("partition_count", value);
        }
        for (key, value) in [
            ("num_mem_ranges", self.num_mem_ranges),
            ("num_files", self.num_files),
            ("num_file_ranges", self.num_file_ranges),
        ] {
            if let Some(v) = value {
                push(key, v.to_string());
            }
        }
        for (key, value) in &self.extra {
            let value = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            push(key, value);
        }

        rows
    }

    /// Render every table for the given options
    pub fn render(&self, sort: FileSort, filter: &PartitionFilter) -> ScanView {
        let files = self
            .sorted_files(sort)
            .into_iter()
            .enumerate()
            .map(|(index, f)| FileRow {
                index: index + 1,
                file_id: f.file_id.clone(),
                short_id: shorten_file_id(&f.file_id),
                start_time: format_timestamp(&f.time_range_start),
                end_time: format_timestamp(&f.time_range_end),
                time_span: format!("{:.1}s", f.time_span() as f64 / 1000.0),
                rows: f.rows,
                size: format_file_size(f.size),
                index_size: format_file_size(f.index_size),
            })
            .collect();

        let chart = chart_dimensions(&self.files);
        let bars = chart
            .map(|dims| chart_bars(&self.files, &dims))
            .unwrap_or_default();

        let partitions = self.filter_partitions(filter);
        let stats = metric_stats(&partitions);
        let rows = partitions
            .iter()
            .map(|p| PartitionRow {
                partition: p.partition,
                metrics: p
                    .metrics
                    .iter()
                    .map(|(k, v)| {
                        let cell = MetricCell {
                            value: v.to_string(),
                            color: metric_color(v, stats.get(k)),
                        };
                        (k.clone(), cell)
                    })
                    .collect(),
            })
            .collect();

        let summary = summarize(&partitions)
            .into_iter()
            .map(|(metric, total)| {
                let is_time = stats.get(&metric).map(|s| s.is_time).unwrap_or(false);
                let value = if is_time {
                    format_nanos(total)
                } else {
                    MetricValue::Number(total).to_string()
                };
                SummaryRow {
                    metric,
                    value,
                    total,
                }
            })
            .collect();

        ScanView {
            top_level: self.top_level_rows(),
            projection: self.projection.clone(),
            files,
            chart,
            bars,
            partitions: rows,
            summary,
        }
    }
}

/// Per-metric totals; durations are summed in nanoseconds
pub fn summarize(partitions: &[&PartitionMetrics]) -> BTreeMap<String, f64> {
    let mut summary: BTreeMap<String, f64> = BTreeMap::new();
    for partition in partitions {
        for (key, value) in &partition.metrics {
            *summary.entry(key.clone()).or_insert(0.0) += value.as_f64();
        }
    }
    summary
}
