//! Proportional resource allocation
//!
//! An [`AllocationSet`] splits one resource pool (memory, disk) into named
//! parts. Percentages always add up to at most 100; a synthetic `unused` part
//! holds whatever is left. Adjusting one part redistributes the difference
//! over the other parts in proportion to their current shares.

mod presets;

pub use presets::{disk_preset, memory_preset, presets};

use crate::config::PERCENT_EPSILON;
use crate::{AdvisorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Identifier of the remainder part
pub const UNUSED_PART_ID: &str = "unused";

const UNUSED_PART_NAME: &str = "Unused";
const UNUSED_PART_COLOR: &str = "#e5e7eb";

/// One named slice of a resource pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationPart {
    /// Stable identifier, unique within a set
    pub id: String,
    /// Display label
    pub name: String,
    /// Share of the pool in [0, 100]
    pub percentage: f64,
    /// Display color
    #[serde(default)]
    pub color: String,
}

impl AllocationPart {
    /// Create a new part
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        percentage: f64,
        color: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            percentage,
            color: color.into(),
        }
    }

    /// Whether this is the remainder part
    pub fn is_unused(&self) -> bool {
        self.id == UNUSED_PART_ID
    }
}

/// Range and granularity of the total capacity slider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapacityBounds {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl CapacityBounds {
    /// Snap `value` onto the step grid anchored at `min`, then clamp into range
    pub fn snap(&self, value: f64) -> f64 {
        let steps = ((value - self.min) / self.step).round();
        (self.min + steps * self.step).clamp(self.min, self.max)
    }

    fn validate(&self) -> Result<()> {
        if !(self.min.is_finite() && self.max.is_finite() && self.step.is_finite()) {
            return Err(AdvisorError::Config("capacity bounds must be finite".into()));
        }
        if self.min <= 0.0 || self.min > self.max {
            return Err(AdvisorError::Config(format!(
                "invalid capacity range [{}, {}]",
                self.min, self.max
            )));
        }
        if self.step <= 0.0 {
            return Err(AdvisorError::Config(format!(
                "capacity step must be positive, got {}",
                self.step
            )));
        }
        Ok(())
    }
}

/// Construction input for an [`AllocationSet`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationConfig {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub color: String,
    pub initial_total_size: f64,
    pub min_size: f64,
    pub max_size: f64,
    pub step: f64,
    pub parts: Vec<AllocationPart>,
}

/// How the value passed to [`AllocationSet::adjust_part`] is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustMode {
    /// Value is a percentage of the pool
    Percent,
    /// Value is an amount of capacity
    Absolute,
}

impl FromStr for AdjustMode {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "percent" | "pct" | "%" => Ok(AdjustMode::Percent),
            "absolute" | "size" | "abs" => Ok(AdjustMode::Absolute),
            other => Err(AdvisorError::InvalidInput(format!(
                "unknown adjust mode: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for AdjustMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdjustMode::Percent => write!(f, "percent"),
            AdjustMode::Absolute => write!(f, "absolute"),
        }
    }
}

/// A resource pool split into parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationSet {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub color: String,
    pub total_capacity: f64,
    pub bounds: CapacityBounds,
    parts: Vec<AllocationPart>,
}

impl AllocationSet {
    /// Build a set from its configuration, appending the `unused` remainder
    pub fn new(config: AllocationConfig) -> Result<Self> {
        let bounds = CapacityBounds {
            min: config.min_size,
            max: config.max_size,
            step: config.step,
        };
        bounds.validate()?;
        validate_parts(&config.parts, false)?;

        let used: f64 = config.parts.iter().map(|p| p.percentage).sum();
        let mut parts = config.parts;
        parts.push(AllocationPart::new(
            UNUSED_PART_ID,
            UNUSED_PART_NAME,
            (100.0 - used).max(0.0),
            UNUSED_PART_COLOR,
        ));

        let total_capacity = if config.initial_total_size.is_finite() {
            config.initial_total_size.clamp(bounds.min, bounds.max)
        } else {
            bounds.min
        };

        Ok(Self {
            id: config.id,
            title: config.title,
            color: config.color,
            total_capacity,
            bounds,
            parts,
        })
    }

    /// Check the invariants of a set received from outside, e.g. over HTTP
    pub fn validate(&self) -> Result<()> {
        self.bounds.validate()?;
        validate_parts(&self.parts, true)?;
        if !self.total_capacity.is_finite() || self.total_capacity <= 0.0 {
            return Err(AdvisorError::Config(format!(
                "total capacity must be positive, got {}",
                self.total_capacity
            )));
        }
        if self.total_capacity < self.bounds.min || self.total_capacity > self.bounds.max {
            return Err(AdvisorError::Config(format!(
                "total capacity {} outside [{}, {}]",
                self.total_capacity, self.bounds.min, self.bounds.max
            )));
        }
        Ok(())
    }

    /// All parts in display order, `unused` included
    pub fn parts(&self) -> &[AllocationPart] {
        &self.parts
    }

    /// Look up a part by id
    pub fn part(&self, id: &str) -> Option<&AllocationPart> {
        self.parts.iter().find(|p| p.id == id)
    }

    /// Sum of all percentages
    pub fn total_percentage(&self) -> f64 {
        self.parts.iter().map(|p| p.percentage).sum()
    }

    /// Absolute size of a part
    pub fn size_of(&self, id: &str) -> Option<f64> {
        self.part(id).map(|p| self.size_for(p.percentage))
    }

    /// Absolute sizes of every part, in display order
    pub fn sizes(&self) -> Vec<(&str, f64)> {
        self.parts
            .iter()
            .map(|p| (p.id.as_str(), self.size_for(p.percentage)))
            .collect()
    }

    fn size_for(&self, percentage: f64) -> f64 {
        self.total_capacity * percentage / 100.0
    }

    /// Change the pool size. Percentages are left untouched.
    ///
    /// Returns the value actually stored after snapping to the step grid.
    pub fn set_total_capacity(&mut self, value: f64) -> f64 {
        if value.is_finite() {
            self.total_capacity = self.bounds.snap(value);
        }
        self.total_capacity
    }

    /// Set one part's share and redistribute the difference over the others.
    ///
    /// Returns `false` without touching the set when the part is unknown or
    /// the other parts cannot give up enough room for an increase.
    pub fn adjust_part(&mut self, part_id: &str, value: f64, mode: AdjustMode) -> bool {
        let Some(target) = self.parts.iter().position(|p| p.id == part_id) else {
            debug!(set = %self.id, part = part_id, "Adjustment ignored: unknown part");
            return false;
        };

        let requested = match mode {
            AdjustMode::Percent => value,
            AdjustMode::Absolute if self.total_capacity > 0.0 => {
                value / self.total_capacity * 100.0
            }
            AdjustMode::Absolute => return false,
        };
        if requested.is_nan() {
            return false;
        }
        let new_percent = requested.clamp(0.0, 100.0);

        let old_percent = self.parts[target].percentage;
        let diff = new_percent - old_percent;
        let other_total: f64 = self
            .parts
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != target)
            .map(|(_, p)| p.percentage)
            .sum();

        if other_total - diff < 0.0 {
            debug!(
                set = %self.id,
                part = part_id,
                requested = new_percent,
                available = other_total + old_percent,
                "Adjustment rejected: not enough room"
            );
            return false;
        }

        let mut next = self.parts.clone();
        for (i, part) in next.iter_mut().enumerate() {
            if i == target {
                part.percentage = new_percent;
            } else if other_total > 0.0 {
                let proportion = part.percentage / other_total;
                part.percentage = (part.percentage - diff * proportion).max(0.0);
            }
        }

        let total: f64 = next.iter().map(|p| p.percentage).sum();
        if total > 100.0 {
            let excess = total - 100.0;
            let adjustment_total: f64 = next
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != target)
                .map(|(_, p)| p.percentage)
                .sum();

            if adjustment_total > 0.0 {
                for (i, part) in next.iter_mut().enumerate() {
                    if i != target {
                        let proportion = part.percentage / adjustment_total;
                        part.percentage = (part.percentage - excess * proportion).max(0.0);
                    }
                }
            }
        }

        self.parts = next;
        true
    }

    /// Legend rows for display
    pub fn report(&self) -> Vec<AllocationRow> {
        self.parts
            .iter()
            .map(|p| AllocationRow {
                id: p.id.clone(),
                name: p.name.clone(),
                percentage: p.percentage,
                size: self.size_for(p.percentage),
            })
            .collect()
    }
}

/// One legend row of an allocation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AllocationRow {
    pub id: String,
    pub name: String,
    pub percentage: f64,
    pub size: f64,
}

impl AllocationRow {
    /// Percentage as shown in the legend
    pub fn percent_label(&self) -> String {
        format!("{:.0}%", self.percentage)
    }

    /// Size as shown in the legend
    pub fn size_label(&self, unit: &str) -> String {
        format!("{:.1} {}", self.size, unit)
    }
}

fn validate_parts(parts: &[AllocationPart], expect_unused: bool) -> Result<()> {
    let mut seen = HashSet::new();
    for part in parts {
        if part.id.is_empty() {
            return Err(AdvisorError::Config("part id must not be empty".into()));
        }
        if !expect_unused && part.is_unused() {
            return Err(AdvisorError::Config(format!(
                "part id '{}' is reserved",
                UNUSED_PART_ID
            )));
        }
        if !seen.insert(part.id.as_str()) {
            return Err(AdvisorError::Config(format!("duplicate part id '{}'", part.id)));
        }
        if !(0.0..=100.0).contains(&part.percentage) {
            return Err(AdvisorError::Config(format!(
                "part '{}' has percentage {} outside [0, 100]",
                part.id, part.percentage
            )));
        }
    }
    if expect_unused && !seen.contains(UNUSED_PART_ID) {
        return Err(AdvisorError::Config("missing 'unused' part".into()));
    }

    let total: f64 = parts.iter().map(|p| p.percentage).sum();
    if total > 100.0 + PERCENT_EPSILON {
        return Err(AdvisorError::Config(format!(
            "part percentages add up to {:.2}, more than 100",
            total
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EPS: f64 = 1e-6;

    fn sample_set() -> AllocationSet {
        AllocationSet::new(AllocationConfig {
            id: "memory".into(),
            title: "Memory".into(),
            color: "#a78bfa".into(),
            initial_total_size: 128.0,
            min_size: 1.0,
            max_size: 392.0,
            step: 1.0,
            parts: vec![
                AllocationPart::new("a", "A", 15.0, "#000000"),
                AllocationPart::new("b", "B", 50.0, "#000000"),
                AllocationPart::new("c", "C", 25.0, "#000000"),
            ],
        })
        .unwrap()
    }

    fn percentages(set: &AllocationSet) -> Vec<f64> {
        set.parts().iter().map(|p| p.percentage).collect()
    }

    #[test]
    fn test_new_appends_unused_remainder() {
        let set = sample_set();
        let unused = set.part(UNUSED_PART_ID).unwrap();
        assert!((unused.percentage - 10.0).abs() < EPS);
        assert_eq!(set.parts().last().unwrap().id, UNUSED_PART_ID);
        assert!((set.total_percentage() - 100.0).abs() < EPS);
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = AllocationConfig {
            id: "x".into(),
            title: "X".into(),
            color: String::new(),
            initial_total_size: 10.0,
            min_size: 1.0,
            max_size: 100.0,
            step: 1.0,
            parts: vec![
                AllocationPart::new("a", "A", 60.0, ""),
                AllocationPart::new("b", "B", 60.0, ""),
            ],
        };
        assert!(matches!(AllocationSet::new(config.clone()), Err(AdvisorError::Config(_))));

        config.parts = vec![
            AllocationPart::new("a", "A", 10.0, ""),
            AllocationPart::new("a", "A2", 10.0, ""),
        ];
        assert!(AllocationSet::new(config.clone()).is_err());

        config.parts = vec![AllocationPart::new(UNUSED_PART_ID, "U", 10.0, "")];
        assert!(AllocationSet::new(config.clone()).is_err());

        config.parts = vec![AllocationPart::new("a", "A", 10.0, "")];
        config.step = 0.0;
        assert!(AllocationSet::new(config).is_err());
    }

    #[test]
    fn test_adjust_rejects_increase_without_room() {
        let mut set = sample_set();
        let before = set.clone();

        assert!(!set.adjust_part("a", 100.0, AdjustMode::Percent));
        assert_eq!(set, before);
    }

    #[test]
    fn test_adjust_redistributes_proportionally() {
        let mut set = sample_set();
        assert!(set.adjust_part("a", 25.0, AdjustMode::Percent));

        let p = percentages(&set);
        assert!((p[0] - 25.0).abs() < EPS);
        assert!((p[1] - (50.0 - 10.0 * 50.0 / 85.0)).abs() < EPS);
        assert!((p[2] - (25.0 - 10.0 * 25.0 / 85.0)).abs() < EPS);
        assert!((p[3] - (10.0 - 10.0 * 10.0 / 85.0)).abs() < EPS);
        assert!((p[1] - 44.12).abs() < 0.01);
        assert!((p[2] - 22.06).abs() < 0.01);
        assert!((p[3] - 8.82).abs() < 0.01);
        assert!((set.total_percentage() - 100.0).abs() < EPS);
    }

    #[test]
    fn test_adjust_decrease_grows_others() {
        let mut set = sample_set();
        assert!(set.adjust_part("b", 30.0, AdjustMode::Percent));

        let p = percentages(&set);
        assert!((p[1] - 30.0).abs() < EPS);
        assert!((p[0] - (15.0 + 20.0 * 15.0 / 50.0)).abs() < EPS);
        assert!((set.total_percentage() - 100.0).abs() < EPS);
    }

    #[test]
    fn test_adjust_absolute_mode() {
        let mut set = sample_set();
        // 32 of 128 is 25%
        assert!(set.adjust_part("a", 32.0, AdjustMode::Absolute));
        assert!((set.part("a").unwrap().percentage - 25.0).abs() < EPS);
        assert!((set.size_of("a").unwrap() - 32.0).abs() < EPS);
    }

    #[test]
    fn test_adjust_clamps_value() {
        let mut set = sample_set();
        assert!(set.adjust_part("a", -20.0, AdjustMode::Percent));
        assert_eq!(set.part("a").unwrap().percentage, 0.0);
        assert!((set.total_percentage() - 100.0).abs() < EPS);
    }

    #[test]
    fn test_adjust_unknown_part_is_noop() {
        let mut set = sample_set();
        let before = set.clone();
        assert!(!set.adjust_part("missing", 10.0, AdjustMode::Percent));
        assert_eq!(set, before);
    }

    #[test]
    fn test_adjust_same_value_keeps_percentages() {
        let mut set = sample_set();
        let before = percentages(&set);
        assert!(set.adjust_part("b", 50.0, AdjustMode::Percent));
        assert_eq!(percentages(&set), before);
    }

    #[test]
    fn test_adjust_whole_pool_when_others_can_absorb() {
        let mut set = sample_set();
        assert!(set.adjust_part("b", 100.0, AdjustMode::Percent));
        let p = percentages(&set);
        assert!((p[1] - 100.0).abs() < EPS);
        assert!(p[0].abs() < EPS && p[2].abs() < EPS && p[3].abs() < EPS);

        // Nothing left to redistribute over; lowering keeps the others at 0
        assert!(set.adjust_part("b", 40.0, AdjustMode::Percent));
        assert!((set.total_percentage() - 40.0).abs() < EPS);
    }

    #[test]
    fn test_replayed_adjustment_redistributes_again() {
        let mut set = sample_set();
        assert!(set.adjust_part("a", 25.0, AdjustMode::Percent));
        assert!(set.adjust_part("a", 35.0, AdjustMode::Percent));
        assert!((set.part("a").unwrap().percentage - 35.0).abs() < EPS);
        assert!(set.total_percentage() <= 100.0 + EPS);
    }

    #[test]
    fn test_set_total_capacity_keeps_percentages() {
        let mut set = sample_set();
        let before = percentages(&set);

        assert_eq!(set.set_total_capacity(256.0), 256.0);
        assert_eq!(percentages(&set), before);
        assert!((set.size_of("b").unwrap() - 128.0).abs() < EPS);

        assert_eq!(set.set_total_capacity(10_000.0), 392.0);
        assert_eq!(set.set_total_capacity(0.0), 1.0);
        assert_eq!(set.set_total_capacity(12.4), 12.0);
        assert_eq!(set.set_total_capacity(f64::NAN), 12.0);
    }

    #[test]
    fn test_capacity_snaps_to_step_grid() {
        let bounds = CapacityBounds { min: 8.0, max: 1024.0, step: 8.0 };
        assert_eq!(bounds.snap(256.0), 256.0);
        assert_eq!(bounds.snap(259.0), 256.0);
        assert_eq!(bounds.snap(261.0), 264.0);
        assert_eq!(bounds.snap(4096.0), 1024.0);
    }

    #[test]
    fn test_report_labels() {
        let set = sample_set();
        let rows = set.report();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1].percent_label(), "50%");
        assert_eq!(rows[1].size_label("GB"), "64.0 GB");
    }

    #[test]
    fn test_validate_round_trip() {
        let set = sample_set();
        let json = serde_json::to_string(&set).unwrap();
        let decoded: AllocationSet = serde_json::from_str(&json).unwrap();
        assert!(decoded.validate().is_ok());

        let mut broken = decoded.clone();
        broken.parts[0].percentage = 90.0;
        assert!(broken.validate().is_err());
    }

    #[test]
    fn test_validate_capacity_within_bounds() {
        let mut set = sample_set();
        set.total_capacity = set.bounds.max;
        assert!(set.validate().is_ok());

        set.total_capacity = set.bounds.max + 1.0;
        assert!(matches!(set.validate(), Err(AdvisorError::Config(_))));

        set.total_capacity = set.bounds.min / 2.0;
        assert!(set.validate().is_err());
    }

    #[test]
    fn test_adjust_mode_from_str() {
        assert_eq!("percent".parse::<AdjustMode>().unwrap(), AdjustMode::Percent);
        assert_eq!("SIZE".parse::<AdjustMode>().unwrap(), AdjustMode::Absolute);
        assert!("bogus".parse::<AdjustMode>().is_err());
    }

    proptest! {
        #[test]
        fn prop_adjustments_preserve_invariants(
            steps in prop::collection::vec((0usize..4, -20.0f64..140.0, any::<bool>()), 1..40),
            capacity in 1.0f64..392.0,
        ) {
            let mut set = sample_set();
            set.set_total_capacity(capacity);
            let ids: Vec<String> = set.parts().iter().map(|p| p.id.clone()).collect();

            for (idx, value, absolute) in steps {
                let mode = if absolute { AdjustMode::Absolute } else { AdjustMode::Percent };
                let before = set.clone();
                let applied = set.adjust_part(&ids[idx], value, mode);
                if !applied {
                    prop_assert_eq!(&set, &before);
                }

                prop_assert!(set.total_percentage() <= 100.0 + EPS);
                for part in set.parts() {
                    prop_assert!(part.percentage >= 0.0);
                    prop_assert!(part.percentage <= 100.0 + EPS);
                }
            }
        }

        #[test]
        fn prop_capacity_change_only_scales_sizes(capacity in 1.0f64..392.0) {
            let mut set = sample_set();
            let before = percentages(&set);
            let stored = set.set_total_capacity(capacity);
            prop_assert_eq!(percentages(&set), before);
            for (id, size) in set.sizes() {
                let pct = set.part(id).unwrap().percentage;
                prop_assert!((size - stored * pct / 100.0).abs() < EPS);
            }
        }
    }
}
