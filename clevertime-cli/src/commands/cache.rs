//! Cache command (memory and disk allocation).

use anyhow::{Context, Result};
use clap::Args;
use clevertime_core::allocation::{presets, AdjustMode, AllocationConfig, AllocationSet};
use clevertime_core::emitter::ConfigEmitter;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::Tabled;
use tracing::{info, warn};

use crate::output::{print_heading, print_output, print_single, OutputFormat};

use super::{split_assignment, CommandContext};

const UNIT: &str = "GB";

/// Cache command - split each pool between its parts.
#[derive(Debug, Args)]
pub struct CacheCommand {
    /// JSON file with a list of pool configurations replacing the built-in ones.
    #[arg(long, env = "CLEVERTIME_PRESETS")]
    presets: Option<PathBuf>,

    /// Pool size in GB, in format POOL=SIZE (e.g., memory=256).
    /// Can be specified multiple times.
    #[arg(long = "total")]
    totals: Vec<String>,

    /// Part share or size, in format POOL.PART=40% or POOL.PART=64GB
    /// (a bare number is a percentage). Applied in the order given.
    #[arg(long)]
    adjust: Vec<String>,

    /// Print the generated configuration snippet.
    #[arg(long)]
    emit: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct PartRow {
    #[tabled(rename = "Pool")]
    pool: String,
    #[tabled(rename = "Part")]
    part: String,
    #[tabled(rename = "Share")]
    share: String,
    #[tabled(rename = "Size")]
    size: String,
}

#[derive(Debug, Serialize)]
struct CacheOutput<'a> {
    sets: &'a [AllocationSet],
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<String>,
}

/// One `POOL=SIZE` request
#[derive(Debug, PartialEq)]
struct Assignment {
    pool: String,
    value: f64,
}

impl Assignment {
    fn parse(spec: &str) -> Result<Self> {
        let (pool, value) = split_assignment(spec)?;
        if pool.contains('.') {
            anyhow::bail!("Invalid pool size '{}'. Use POOL=SIZE.", spec);
        }
        let value: f64 = value
            .trim_end_matches(|c: char| c.is_ascii_alphabetic())
            .trim()
            .parse()
            .with_context(|| format!("Invalid number '{}' in '{}'", value, spec))?;

        Ok(Self {
            pool: pool.to_string(),
            value,
        })
    }
}

/// One `POOL.PART=VALUE` request with its unit
#[derive(Debug, PartialEq)]
struct Adjustment {
    pool: String,
    part: String,
    value: f64,
    mode: AdjustMode,
}

impl Adjustment {
    fn parse(spec: &str) -> Result<Self> {
        let (key, raw) = split_assignment(spec)?;
        let Some((pool, part)) = key.split_once('.') else {
            anyhow::bail!("Invalid adjustment '{}'. Use POOL.PART=VALUE.", spec);
        };

        let unit_at = raw
            .len()
            .checked_sub(UNIT.len())
            .filter(|&i| raw.is_char_boundary(i) && raw[i..].eq_ignore_ascii_case(UNIT));
        let (number, mode) = if let Some(n) = raw.strip_suffix('%') {
            (n, AdjustMode::Percent)
        } else if let Some(i) = unit_at {
            (&raw[..i], AdjustMode::Absolute)
        } else {
            (raw, AdjustMode::Percent)
        };
        let value: f64 = number
            .trim()
            .parse()
            .with_context(|| format!("Invalid number '{}' in '{}'", raw, spec))?;

        Ok(Self {
            pool: pool.trim().to_string(),
            part: part.trim().to_string(),
            value,
            mode,
        })
    }
}

impl CacheCommand {
    pub fn run(self, ctx: &CommandContext) -> Result<()> {
        let mut sets = load_sets(self.presets.as_deref())?;

        for spec in &self.totals {
            let assignment = Assignment::parse(spec)?;
            let set = find_set(&mut sets, &assignment.pool)?;
            let stored = set.set_total_capacity(assignment.value);
            info!(pool = %set.id, requested = assignment.value, stored, "Capacity set");
        }

        for spec in &self.adjust {
            apply_adjustment(&mut sets, spec)?;
        }

        let config = self.emit.then(|| {
            ConfigEmitter::default().emit(sets.iter().map(|s| (s.id.as_str(), s)))
        });

        match ctx.format {
            OutputFormat::Json => print_single(&CacheOutput {
                sets: &sets,
                config,
            }),
            OutputFormat::Table => {
                print_output(&part_rows(&sets), ctx.format);
                if let Some(config) = config {
                    print_heading("Configuration:");
                    print!("{}", config);
                }
            }
        }
        Ok(())
    }
}

/// Pools from a JSON file of configurations, or the built-in presets.
fn load_sets(path: Option<&Path>) -> Result<Vec<AllocationSet>> {
    let configs: Vec<AllocationConfig> = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read presets {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("Invalid presets file {}", path.display()))?
        }
        None => presets(),
    };

    configs
        .into_iter()
        .map(|config| AllocationSet::new(config).map_err(anyhow::Error::from))
        .collect()
}

/// Apply one `--adjust` value; a declined adjustment is reported, not fatal.
fn apply_adjustment(sets: &mut [AllocationSet], spec: &str) -> Result<bool> {
    let adjustment = Adjustment::parse(spec)?;
    let set = find_set(sets, &adjustment.pool)?;
    let applied = set.adjust_part(&adjustment.part, adjustment.value, adjustment.mode);
    if !applied {
        warn!("Adjustment '{}' declined, {} left unchanged", spec, set.id);
    }
    Ok(applied)
}

fn find_set<'a>(sets: &'a mut [AllocationSet], pool: &str) -> Result<&'a mut AllocationSet> {
    let known: Vec<String> = sets.iter().map(|s| s.id.clone()).collect();
    sets.iter_mut().find(|s| s.id == pool).ok_or_else(|| {
        anyhow::anyhow!("Unknown pool '{}'. Available: {}", pool, known.join(", "))
    })
}

fn part_rows(sets: &[AllocationSet]) -> Vec<PartRow> {
    sets.iter()
        .flat_map(|set| {
            set.report().into_iter().map(move |row| PartRow {
                pool: set.title.clone(),
                part: row.name.clone(),
                share: row.percent_label(),
                size: row.size_label(UNIT),
            })
        })
        .collect()
}
