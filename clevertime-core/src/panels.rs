//! Panels of the assistant and their route keys

use crate::{AdvisorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One calculator/advisor panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Panel {
    Model,
    Cache,
    Sql,
    Mitoviz,
}

impl Panel {
    /// All panels in tab order
    pub const ALL: [Panel; 4] = [Panel::Model, Panel::Cache, Panel::Sql, Panel::Mitoviz];

    /// Route key, as used in URLs and CLI subcommands
    pub fn key(&self) -> &'static str {
        match self {
            Panel::Model => "model",
            Panel::Cache => "cache",
            Panel::Sql => "sql",
            Panel::Mitoviz => "mitoviz",
        }
    }

    /// Human readable title
    pub fn title(&self) -> &'static str {
        match self {
            Panel::Model => "Model Advisor",
            Panel::Cache => "Cache Calculator",
            Panel::Sql => "SQL Formatter",
            Panel::Mitoviz => "Scan Metrics Visualizer",
        }
    }
}

impl Default for Panel {
    fn default() -> Self {
        Panel::Model
    }
}

impl FromStr for Panel {
    type Err = AdvisorError;

    fn from_str(s: &str) -> Result<Self> {
        Panel::ALL
            .into_iter()
            .find(|p| p.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AdvisorError::InvalidInput(format!("unknown panel: {}", s)))
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}
