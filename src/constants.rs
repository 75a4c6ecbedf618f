//! Application constants for the event extractor
//!
//! Default values for data locations, the simulation override, run
//! limits and the derived field names recognised by the schema.

// =============================================================================
// Data Locations
// =============================================================================

/// Root of the reconstructed detector data tree
pub const DEFAULT_DATA_ROOT: &str = "/recon2";

/// Root of the simulated data tree
pub const DEFAULT_SIMULATION_ROOT: &str = "/MC";

/// Station identifier embedded in simulated file names
pub const SIMULATION_STATION: &str = "MONT-01";

/// Fixed date used for every simulated run
pub const SIMULATION_DATE: &str = "2017-10-01";

/// Regex fragment that completes `<station>.*` for day files
pub const DEFAULT_FILE_SUFFIX: &str = r"dst\.parquet";

/// Suffix of the auxiliary weather table stored next to each day file
pub const WEATHER_SIDECAR_SUFFIX: &str = "weather.parquet";

// =============================================================================
// Run Limits
// =============================================================================

/// Maximum number of day directories scanned in one run
pub const DEFAULT_MAX_DAYS: usize = 30;

/// Global cap on scalar values written (rows * variables)
pub const DEFAULT_MAX_TOTAL_ENTRIES: usize = 12_500_000;

/// Predicate always combined with the user filter
pub const DEFAULT_BASE_FILTER: &str = "StatusCode == 0";

/// Filter used when the caller passes an empty expression
pub const ALWAYS_TRUE_FILTER: &str = "(1)";

/// Digits after the decimal point for floats in CSV output
pub const DEFAULT_FLOAT_PRECISION: usize = 6;

// =============================================================================
// Event Fields
// =============================================================================

/// Raw direction components used by the derived angles
pub mod direction {
    pub const X: &str = "XDir";
    pub const Y: &str = "YDir";
    pub const Z: &str = "ZDir";
}

/// Names computed by the extractor rather than read from the event table
pub mod derived {
    /// Zenith angle in degrees, `acos(ZDir)`
    pub const THETA: &str = "Theta";

    /// Azimuth in degrees, `atan2(YDir, XDir)`
    pub const PHI: &str = "Phi";

    /// Per-file atmospheric pressure from the weather table
    pub const PRESSURE: &str = "Pressure";
}

// =============================================================================
// CLI
// =============================================================================

/// Name of the environment-filter target used for logging
pub const LOG_TARGET: &str = "dst_extractor";

/// Configuration directory name under the user config dir
pub const CONFIG_DIR_NAME: &str = "dst-extractor";

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "config.toml";
