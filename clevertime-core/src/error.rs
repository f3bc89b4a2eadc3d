//! Error types for Clevertime

use thiserror::Error;

/// Result type alias for Clevertime operations
pub type Result<T> = std::result::Result<T, AdvisorError>;

/// Clevertime error types
#[derive(Error, Debug)]
pub enum AdvisorError {
    /// Invalid allocation or emitter configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// SQL parsing error
    #[error("SQL parse error: {0}")]
    SqlParse(String),

    /// Malformed user input (unknown dialect, sort key, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Remote parse server answered with an error
    #[error("Remote server error: {0}")]
    Remote(String),

    /// HTTP transport failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AdvisorError {
    /// Check if the error was caused by the caller's input
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            AdvisorError::Config(_)
                | AdvisorError::SqlParse(_)
                | AdvisorError::InvalidInput(_)
                | AdvisorError::Json(_)
        )
    }

    /// Check if the error came from talking to the remote server
    pub fn is_remote(&self) -> bool {
        matches!(self, AdvisorError::Remote(_) | AdvisorError::Http(_))
    }
}
