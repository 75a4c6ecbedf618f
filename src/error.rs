//! Error handling for extraction runs.
//!
//! Distinguishes configuration mistakes (reported before any I/O),
//! recoverable discovery and source failures, and the "query ran but
//! matched nothing" conditions that carry their own exit codes.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Something is missing: {message}")]
    MissingArguments { message: String },

    #[error("Output mode must be CSV or ROOT, got '{token}'")]
    InvalidMode { token: String },

    #[error("At least one variable is needed")]
    NoVariables,

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Cannot list directory {path}: {source}")]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Event source error in {path}: {reason}")]
    Source { path: PathBuf, reason: String },

    #[error("No data available in the requested period: no day directory could be opened")]
    NoDaysScanned,

    #[error("No data available in the requested period: no matching files found")]
    NoFilesFound,

    #[error("No data available: the filter selects no events in {path}")]
    NoFilteredRows { path: PathBuf },
}

impl ExtractError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an event source error for a specific file
    pub fn source_failure(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Source {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            ExtractError::NoDaysScanned => 2,
            ExtractError::NoFilesFound => 3,
            ExtractError::NoFilteredRows { .. } => 4,
            ExtractError::MissingArguments { .. } => 10,
            ExtractError::InvalidMode { .. } => 11,
            ExtractError::NoVariables => 12,
            ExtractError::Configuration { .. } => 13,
            _ => 1,
        }
    }

    /// True for the conditions meaning the query matched nothing
    pub fn is_empty_result(&self) -> bool {
        matches!(
            self,
            ExtractError::NoDaysScanned
                | ExtractError::NoFilesFound
                | ExtractError::NoFilteredRows { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;
