//! Clevertime Core - configuration advisors for GreptimeDB
//!
//! A set of independent, deterministic calculators that turn user input into
//! recommendations or formatted artifacts:
//!
//! - **Allocation**: proportional resource split of a memory/disk pool
//! - **Emitter**: renders allocations as nested configuration text
//! - **Advisor**: rule-based suggestions for a `CREATE TABLE` schema
//! - **Dialect**: identifier quoting conversion between SQL dialects
//! - **Mitoviz**: summaries of region scan metrics
//!
//! Everything here is synchronous and side-effect free, except the optional
//! remote parse call in [`advisor::RemoteParser`].

pub mod advisor;
pub mod allocation;
pub mod dialect;
pub mod emitter;
pub mod mitoviz;
pub mod panels;

mod error;

pub use error::{AdvisorError, Result};

/// Clevertime version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod config {
    /// Tolerance used when checking the percentage ceiling
    pub const PERCENT_EPSILON: f64 = 1e-6;

    /// Cardinality at which an indexed column is considered too wide
    pub const HIGH_CARDINALITY: u64 = 1_000_000;

    /// Peak ingest rate (rows/s) above which sharding is suggested
    pub const SHARDING_THROUGHPUT: u64 = 500_000;

    /// Height of the file timeline chart in pixels, excluding the axis
    pub const CHART_HEIGHT: f64 = 170.0;

    /// Maximum vertical distance between two bars in the file timeline
    pub const CHART_LINE_SPACING: f64 = 8.0;

    /// Top margin of the file timeline
    pub const CHART_TOP_MARGIN: f64 = 10.0;

    /// Default address of the remote parse server
    pub const DEFAULT_PARSE_SERVER: &str = "127.0.0.1:4000";
}
