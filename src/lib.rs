//! DST Extractor Library
//!
//! Extracts a bounded, schema-projected slice of detector events from the
//! per-day files of one station and writes it as a CSV table or a typed
//! Parquet container.
//!
//! This library provides tools for:
//! - Walking a calendar range with the detector's simplified leap rule
//! - Locating a station's day files in the reconstructed or simulated tree
//! - Declaring typed output columns, including derived angles and pressure
//! - Parsing row filters and rewriting derived names onto raw fields
//! - Extracting rows under a global entry cap with a per-file weather cache
//! - Writing the result through a staged, all-or-nothing output sink

pub mod calendar;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod filter;
pub mod models;
pub mod processor;
pub mod schema;
pub mod source;

// Re-export commonly used types
pub use config::ExtractorConfig;
pub use error::{ExtractError, Result};
pub use models::{ExtractionStats, OutputMode, RunRequest};
pub use processor::Extraction;
