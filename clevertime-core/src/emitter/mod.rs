//! Configuration text emitter
//!
//! Turns allocation sets into a block of nested `key = "value"` lines,
//! grouped under `[section]` headers derived from dot-separated key paths:
//!
//! ```text
//! [region_engine.mito]
//! sst_meta_cache_size = "19.2GB"
//! page_cache_size = "64GB"
//! ```

use crate::allocation::AllocationSet;
use crate::{AdvisorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;
use tracing::warn;

/// Where one part's size is written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyTarget {
    /// Dot-separated key path, e.g. `region_engine.mito.page_cache_size`
    pub path: String,
    /// Unit appended to the value, e.g. `GB`
    pub unit: String,
}

impl KeyTarget {
    /// Create a target, rejecting empty path segments
    pub fn new(path: impl Into<String>, unit: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if path.is_empty() || path.split('.').any(|s| s.trim().is_empty()) {
            return Err(AdvisorError::Config(format!("invalid key path '{}'", path)));
        }
        Ok(Self {
            path,
            unit: unit.into(),
        })
    }

    /// Section prefix and leaf key
    fn split(&self) -> (&str, &str) {
        match self.path.rsplit_once('.') {
            Some((section, key)) => (section, key),
            None => ("", self.path.as_str()),
        }
    }
}

/// Part-id to key mapping, per resource category
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmitterMapping {
    categories: BTreeMap<String, BTreeMap<String, KeyTarget>>,
}

impl EmitterMapping {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a part of a category to a key path
    pub fn insert(
        &mut self,
        category: impl Into<String>,
        part_id: impl Into<String>,
        target: KeyTarget,
    ) {
        self.categories
            .entry(category.into())
            .or_default()
            .insert(part_id.into(), target);
    }

    /// Builder-style [`EmitterMapping::insert`]
    pub fn with(
        mut self,
        category: &str,
        part_id: &str,
        path: &str,
        unit: &str,
    ) -> Result<Self> {
        self.insert(category, part_id, KeyTarget::new(path, unit)?);
        Ok(self)
    }

    /// Target for a part, if mapped
    pub fn target(&self, category: &str, part_id: &str) -> Option<&KeyTarget> {
        self.categories.get(category)?.get(part_id)
    }

    /// Mapping of the built-in memory and disk pools onto GreptimeDB options
    pub fn greptime_defaults() -> Self {
        let entries = [
            ("memory", "meta", "region_engine.mito.sst_meta_cache_size"),
            ("memory", "page", "region_engine.mito.page_cache_size"),
            ("memory", "index", "region_engine.mito.index.content_cache_size"),
            ("disk", "data", "region_engine.mito.write_cache_size"),
            ("disk", "wal", "wal.purge_threshold"),
        ];

        let mut mapping = Self::new();
        for (category, part, path) in entries {
            mapping.insert(
                category,
                part,
                KeyTarget {
                    path: path.to_string(),
                    unit: "GB".to_string(),
                },
            );
        }
        mapping
    }

    /// Check that every target is well formed and no key is written twice
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for parts in self.categories.values() {
            for target in parts.values() {
                KeyTarget::new(target.path.clone(), target.unit.clone())?;
                if !seen.insert(target.path.as_str()) {
                    return Err(AdvisorError::Config(format!(
                        "key '{}' is mapped more than once",
                        target.path
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Renders allocation sets as configuration text
#[derive(Debug, Clone)]
pub struct ConfigEmitter {
    mapping: EmitterMapping,
}

impl ConfigEmitter {
    /// Create an emitter over a mapping
    pub fn new(mapping: EmitterMapping) -> Self {
        Self { mapping }
    }

    /// The mapping in use
    pub fn mapping(&self) -> &EmitterMapping {
        &self.mapping
    }

    /// Render `(category, set)` pairs.
    ///
    /// Parts at 0% and parts without a mapping are skipped.
    pub fn emit<'a, I>(&self, sets: I) -> String
    where
        I: IntoIterator<Item = (&'a str, &'a AllocationSet)>,
    {
        // Groups keep their first-appearance order
        let mut groups: Vec<(String, Vec<(String, String)>)> = Vec::new();
        let mut written = HashSet::new();

        for (category, set) in sets {
            for part in set.parts() {
                if part.percentage == 0.0 {
                    continue;
                }
                let Some(target) = self.mapping.target(category, &part.id) else {
                    continue;
                };
                if !written.insert(target.path.clone()) {
                    warn!("Key {} already emitted, skipping part {}", target.path, part.id);
                    continue;
                }

                let size = set.total_capacity * part.percentage / 100.0;
                let value = format!("{}{}", format_amount(size), target.unit);
                let (section, key) = target.split();

                match groups.iter_mut().find(|(s, _)| s == section) {
                    Some((_, lines)) => lines.push((key.to_string(), value)),
                    None => groups.push((section.to_string(), vec![(key.to_string(), value)])),
                }
            }
        }

        // Top-level keys must precede any table header
        groups.sort_by_key(|(section, _)| !section.is_empty());

        let mut out = String::new();
        for (i, (section, lines)) in groups.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            if !section.is_empty() {
                let _ = writeln!(out, "[{}]", section);
            }
            for (key, value) in lines {
                let _ = writeln!(out, "{} = \"{}\"", key, value);
            }
        }
        out
    }
}

impl Default for ConfigEmitter {
    fn default() -> Self {
        Self::new(EmitterMapping::greptime_defaults())
    }
}

/// Whole numbers print without decimals, others with at most two
pub fn format_amount(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        let s = format!("{:.2}", rounded);
        s.trim_end_matches('0').to_string()
    }
}
