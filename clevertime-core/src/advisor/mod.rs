//! Table model advisor
//!
//! Takes the columns of a `CREATE TABLE` statement plus a few facts about the
//! workload and produces tuning suggestions. Columns come either from the
//! local parser ([`parse_create_table`]) or from a running server
//! ([`RemoteParser`]).

mod parser;
mod remote;
mod rules;

pub use parser::parse_create_table;
pub use remote::{columns_from_response, RemoteParser};
pub use rules::{
    generate_suggestions, optimize_append_only, optimize_cardinality, optimize_fulltext_index,
    optimize_partitioning,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a column in the data model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    /// Part of the primary key
    Tag,
    /// Regular value column
    Field,
    /// The time index
    Timestamp,
}

/// Index attached to a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Primary,
    Inverted,
    Fulltext,
    Skipping,
    Time,
}

impl IndexKind {
    /// Whether the index contributes to the inverted index cardinality
    pub fn is_inverted(&self) -> bool {
        matches!(self, IndexKind::Primary | IndexKind::Inverted)
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IndexKind::Primary => "primary",
            IndexKind::Inverted => "inverted",
            IndexKind::Fulltext => "fulltext",
            IndexKind::Skipping => "skipping",
            IndexKind::Time => "time",
        };
        write!(f, "{}", s)
    }
}

/// A column as seen by the advisor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    /// Lowercase type name without parameters, e.g. `string`, `timestamp`
    pub data_type: String,
    pub semantic_type: SemanticType,
    pub nullable: bool,
    #[serde(default)]
    pub index: Option<IndexKind>,
    /// Estimated number of distinct values; unknown when `None`
    #[serde(default)]
    pub cardinality: Option<u64>,
}

impl Column {
    /// Whether the column stores text
    pub fn is_string(&self) -> bool {
        matches!(
            self.data_type.as_str(),
            "string" | "text" | "varchar" | "char" | "character" | "tinytext" | "mediumtext"
                | "longtext"
        )
    }
}

/// Workload facts entered alongside the schema
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalData {
    /// Estimated peak ingest throughput in rows/s
    #[serde(default)]
    pub ingest_throughput: Option<u64>,
    /// Whether duplicate rows occur or deduplication is a concern
    #[serde(default)]
    pub has_duplicates: bool,
}

/// One advisory item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    pub explanation: String,
}

impl Suggestion {
    /// Placeholder shown when no rule fired
    pub fn all_good() -> Self {
        Self {
            title: "All Good".to_string(),
            sql: None,
            explanation: "No suggestion from our side!".to_string(),
        }
    }
}
