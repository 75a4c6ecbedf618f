//! Configuration management and validation.
//!
//! Provides the run configuration: data tree locations, the simulation
//! override, run limits, the base filter and output settings. Values can
//! be loaded from a TOML file and adjusted with builder methods.

use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_BASE_FILTER, DEFAULT_DATA_ROOT,
    DEFAULT_FILE_SUFFIX, DEFAULT_FLOAT_PRECISION, DEFAULT_MAX_DAYS, DEFAULT_MAX_TOTAL_ENTRIES,
    DEFAULT_SIMULATION_ROOT, SIMULATION_DATE, SIMULATION_STATION,
};
use crate::error::{ExtractError, Result};
use polars::prelude::ParquetCompression;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Supported compression algorithms for parquet files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionAlgorithm {
    /// Snappy compression - good balance of speed and compression
    Snappy,
    /// ZSTD compression - better compression ratio, slower
    Zstd,
    /// LZ4 compression - fastest, lower compression ratio
    Lz4,
    /// No compression
    Uncompressed,
}

impl CompressionAlgorithm {
    /// Convert to polars ParquetCompression type
    pub fn to_polars_compression(&self) -> ParquetCompression {
        match self {
            CompressionAlgorithm::Snappy => ParquetCompression::Snappy,
            CompressionAlgorithm::Zstd => ParquetCompression::Zstd(None),
            CompressionAlgorithm::Lz4 => ParquetCompression::Lz4Raw,
            CompressionAlgorithm::Uncompressed => ParquetCompression::Uncompressed,
        }
    }
}

/// Columnar output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParquetOutputConfig {
    /// Compression algorithm selection
    pub compression: CompressionAlgorithm,

    /// Rows per row group (None lets polars decide)
    pub row_group_size: Option<usize>,
}

impl Default for ParquetOutputConfig {
    fn default() -> Self {
        Self {
            compression: CompressionAlgorithm::Snappy,
            row_group_size: None,
        }
    }
}

/// Text table output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOutputConfig {
    /// Digits after the decimal point for float columns
    pub float_precision: usize,
}

impl Default for CsvOutputConfig {
    fn default() -> Self {
        Self {
            float_precision: DEFAULT_FLOAT_PRECISION,
        }
    }
}

/// Global configuration for extraction runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Root of the reconstructed data tree (`<root>/<station>/<date>/`)
    pub data_root: PathBuf,

    /// Root of the simulated data tree
    pub simulation_root: PathBuf,

    /// Station identifier in simulated file names
    pub simulation_station: String,

    /// Date every simulated run is pinned to
    pub simulation_date: String,

    /// Regex fragment completing `<station>.*` for day file names
    pub file_suffix: String,

    /// Maximum number of day directories scanned
    pub max_days: usize,

    /// Global cap on rows * variables
    pub max_total_entries: usize,

    /// Predicate prepended to every user filter (empty disables it)
    pub base_filter: String,

    /// Directory receiving the output file
    pub output_dir: PathBuf,

    pub csv: CsvOutputConfig,

    pub parquet: ParquetOutputConfig,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from(DEFAULT_DATA_ROOT),
            simulation_root: PathBuf::from(DEFAULT_SIMULATION_ROOT),
            simulation_station: SIMULATION_STATION.to_string(),
            simulation_date: SIMULATION_DATE.to_string(),
            file_suffix: DEFAULT_FILE_SUFFIX.to_string(),
            max_days: DEFAULT_MAX_DAYS,
            max_total_entries: DEFAULT_MAX_TOTAL_ENTRIES,
            base_filter: DEFAULT_BASE_FILTER.to_string(),
            output_dir: std::env::temp_dir(),
            csv: CsvOutputConfig::default(),
            parquet: ParquetOutputConfig::default(),
        }
    }
}

impl ExtractorConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ExtractError::configuration(format!(
                "failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        let config: Self = toml::from_str(&text).map_err(|e| {
            ExtractError::configuration(format!(
                "failed to parse TOML in {}: {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load an explicit config file, else the user default if it exists,
    /// else built-in defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match default_config_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Check limits that would make every run meaningless
    pub fn validate(&self) -> Result<()> {
        if self.max_days == 0 {
            return Err(ExtractError::configuration(
                "max_days must be greater than 0",
            ));
        }
        if self.max_total_entries == 0 {
            return Err(ExtractError::configuration(
                "max_total_entries must be greater than 0",
            ));
        }
        if self.file_suffix.is_empty() {
            return Err(ExtractError::configuration("file_suffix cannot be empty"));
        }
        Ok(())
    }

    /// Set the reconstructed data root
    pub fn with_data_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.data_root = root.into();
        self
    }

    /// Set the simulated data root
    pub fn with_simulation_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.simulation_root = root.into();
        self
    }

    /// Set the output directory
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the global entry cap
    pub fn with_max_total_entries(mut self, entries: usize) -> Self {
        self.max_total_entries = entries;
        self
    }

    /// Set the maximum number of scanned days
    pub fn with_max_days(mut self, days: usize) -> Self {
        self.max_days = days;
        self
    }

    /// Replace the base filter (empty string disables it)
    pub fn with_base_filter(mut self, filter: impl Into<String>) -> Self {
        self.base_filter = filter.into();
        self
    }

    /// Set the parquet compression algorithm
    pub fn with_compression(mut self, compression: CompressionAlgorithm) -> Self {
        self.parquet.compression = compression;
        self
    }
}

/// `<user config dir>/dst-extractor/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}
