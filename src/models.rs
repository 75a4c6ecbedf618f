//! Core data structures and types for extraction runs.
//!
//! Defines the output mode, the validated run request handed from the
//! command line to the pipeline, and the run statistics.

use crate::calendar::Date;
use crate::error::{ExtractError, Result};
use crate::filter::FilterExpr;
use crate::schema::Schema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Output sink selected by the first command-line token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputMode {
    /// Comma-separated text table
    Csv,
    /// Typed columnar container, written as Parquet
    Root,
}

impl OutputMode {
    /// File extension of the produced output
    pub fn extension(&self) -> &'static str {
        match self {
            OutputMode::Csv => "csv",
            OutputMode::Root => "parquet",
        }
    }
}

impl FromStr for OutputMode {
    type Err = ExtractError;

    fn from_str(token: &str) -> Result<Self> {
        match token {
            "CSV" => Ok(OutputMode::Csv),
            "ROOT" => Ok(OutputMode::Root),
            other => Err(ExtractError::InvalidMode {
                token: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMode::Csv => write!(f, "CSV"),
            OutputMode::Root => write!(f, "ROOT"),
        }
    }
}

/// Everything a single extraction run needs besides configuration
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub mode: OutputMode,
    pub station: String,
    pub start: Date,
    pub end: Date,
    /// Compiled row filter, base filter already prepended
    pub filter: FilterExpr,
    pub is_simulation: bool,
    pub schema: Schema,
}

impl RunRequest {
    /// `<station>from<start>to<end>.<ext>`
    pub fn output_file_name(&self) -> String {
        format!(
            "{}from{}to{}.{}",
            self.station,
            self.start,
            self.end,
            self.mode.extension()
        )
    }
}

/// Run statistics
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExtractionStats {
    /// Day directories that could be listed
    pub days_scanned: usize,
    /// Matching files across all scanned days
    pub files_found: usize,
    /// Files opened and extracted
    pub files_visited: usize,
    /// Files skipped because their event source failed
    pub files_failed: usize,
    /// Weather readings fetched, one per distinct file
    pub weather_reads: usize,
    pub rows_written: usize,
    pub output_path: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(mode: OutputMode) -> RunRequest {
        RunRequest {
            mode,
            station: "ALPHA".to_string(),
            start: "2020-01-01".parse().unwrap(),
            end: "2020-01-03".parse().unwrap(),
            filter: FilterExpr::always_true(),
            is_simulation: false,
            schema: Schema::from_pairs([("I", "Seconds")]).unwrap(),
        }
    }

    #[test]
    fn test_mode_tokens() {
        assert_eq!("CSV".parse::<OutputMode>().unwrap(), OutputMode::Csv);
        assert_eq!("ROOT".parse::<OutputMode>().unwrap(), OutputMode::Root);
        for bad in ["csv", "Root", "", "JSON"] {
            assert!(matches!(
                bad.parse::<OutputMode>(),
                Err(ExtractError::InvalidMode { .. })
            ));
        }
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(
            request(OutputMode::Csv).output_file_name(),
            "ALPHAfrom2020-01-01to2020-01-03.csv"
        );
        assert_eq!(
            request(OutputMode::Root).output_file_name(),
            "ALPHAfrom2020-01-01to2020-01-03.parquet"
        );
    }
}
