//! File timeline chart and metric heat coloring

use super::format::{is_duration, parse_duration_nanos, parse_timestamp};
use super::{FileData, MetricValue, PartitionMetrics};
use crate::config::{CHART_HEIGHT, CHART_LINE_SPACING, CHART_TOP_MARGIN};
use serde::Serialize;
use std::collections::BTreeMap;

/// Extent of the file timeline
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartDimensions {
    pub min_time: i64,
    pub max_time: i64,
    pub time_range: i64,
    pub chart_height: f64,
    pub line_spacing: f64,
}

/// One horizontal bar of the file timeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartBar {
    pub file_id: String,
    pub left_percent: f64,
    pub width_percent: f64,
    pub top: f64,
}

/// Timeline extent, `None` when there are no files or they span no time
pub fn chart_dimensions(files: &[FileData]) -> Option<ChartDimensions> {
    let min_time = files.iter().map(|f| parse_timestamp(&f.time_range_start)).min()?;
    let max_time = files.iter().map(|f| parse_timestamp(&f.time_range_end)).max()?;

    let time_range = max_time.saturating_sub(min_time);
    if time_range == 0 {
        return None;
    }

    Some(ChartDimensions {
        min_time,
        max_time,
        time_range,
        chart_height: CHART_HEIGHT,
        line_spacing: CHART_LINE_SPACING.min(CHART_HEIGHT / files.len() as f64),
    })
}

/// Bars ordered by end time, then start time
pub fn chart_bars(files: &[FileData], dimensions: &ChartDimensions) -> Vec<ChartBar> {
    let mut sorted: Vec<&FileData> = files.iter().collect();
    sorted.sort_by_key(|f| {
        (
            parse_timestamp(&f.time_range_end),
            parse_timestamp(&f.time_range_start),
        )
    });

    let range = dimensions.time_range as f64;
    sorted
        .into_iter()
        .enumerate()
        .map(|(index, file)| {
            let start = parse_timestamp(&file.time_range_start);
            let end = parse_timestamp(&file.time_range_end);
            ChartBar {
                file_id: file.file_id.clone(),
                left_percent: start.saturating_sub(dimensions.min_time) as f64 / range * 100.0,
                width_percent: end.saturating_sub(start) as f64 / range * 100.0,
                top: index as f64 * dimensions.line_spacing + CHART_TOP_MARGIN,
            }
        })
        .collect()
}

/// Range of one metric across partitions
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricStats {
    /// Smallest positive value seen
    pub min: f64,
    /// Largest positive value seen
    pub max: f64,
    pub is_time: bool,
    pub is_numeric: bool,
}

impl Default for MetricStats {
    fn default() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            is_time: false,
            is_numeric: true,
        }
    }
}

/// Per-metric min/max over positive values
pub fn metric_stats(partitions: &[&PartitionMetrics]) -> BTreeMap<String, MetricStats> {
    let mut stats: BTreeMap<String, MetricStats> = BTreeMap::new();

    for partition in partitions {
        for (key, value) in &partition.metrics {
            let stat = stats.entry(key.clone()).or_default();
            match value {
                MetricValue::Text(s) if is_duration(s) => {
                    let ns = parse_duration_nanos(s);
                    if ns > 0.0 {
                        stat.min = stat.min.min(ns);
                        stat.max = stat.max.max(ns);
                    }
                    stat.is_time = true;
                }
                MetricValue::Number(n) => {
                    if *n > 0.0 {
                        stat.min = stat.min.min(*n);
                        stat.max = stat.max.max(*n);
                    }
                }
                _ => stat.is_numeric = false,
            }
        }
    }

    stats
}

/// Green (low) to red (high) in HSL, or `inherit` when there is no scale
pub fn color_for_value(value: f64, min: f64, max: f64) -> String {
    if value == 0.0 || max == min || !min.is_finite() || !max.is_finite() {
        return "inherit".to_string();
    }
    let hue = 120.0 * (1.0 - (value - min) / (max - min));
    format!("hsl({}, 80%, 60%)", hue)
}

/// Heat color of a metric cell
pub fn metric_color(value: &MetricValue, stats: Option<&MetricStats>) -> String {
    let Some(stats) = stats.filter(|s| s.is_numeric) else {
        return "inherit".to_string();
    };

    let numeric = match value {
        MetricValue::Number(n) => *n,
        MetricValue::Text(s) if stats.is_time => parse_duration_nanos(s),
        _ => 0.0,
    };
    color_for_value(numeric, stats.min, stats.max)
}
