//! Command-line argument definitions.
//!
//! Positional layout:
//! ```text
//! dst-extractor MODE STATION START END FILTER IS_SIMULATION [TYPE NAME]...
//! ```

use crate::calendar::Date;
use crate::config::ExtractorConfig;
use crate::error::{ExtractError, Result};
use crate::filter::FilterExpr;
use crate::models::{OutputMode, RunRequest};
use crate::schema::Schema;

use clap::Parser;
use clap::error::ErrorKind;
use std::ffi::OsString;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug, Clone)]
#[command(name = "dst-extractor")]
#[command(about = "Extract detector events from per-day station files into CSV or Parquet")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Output mode: CSV (text table) or ROOT (typed columnar container)
    #[arg(value_name = "MODE")]
    pub mode: String,

    /// Station name, also the first directory level under the data root
    #[arg(value_name = "STATION")]
    pub station: String,

    /// First day, YYYY-MM-DD
    #[arg(value_name = "START_DATE")]
    pub start_date: String,

    /// Last day (inclusive), YYYY-MM-DD
    #[arg(value_name = "END_DATE")]
    pub end_date: String,

    /// Row filter, e.g. "Theta < 30 && ChiSquare < 10"; empty keeps every row
    #[arg(value_name = "FILTER", allow_hyphen_values = true)]
    pub filter: String,

    /// "1" selects the simulated data tree and pins the dates
    #[arg(value_name = "IS_SIMULATION")]
    pub is_simulation: String,

    /// Output columns as TYPE NAME pairs, TYPE being I or F
    #[arg(value_name = "TYPE NAME", num_args = 0.., trailing_var_arg = true)]
    pub variables: Vec<String>,

    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory receiving the output file
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Root of the reconstructed data tree
    #[arg(long, value_name = "DIR")]
    pub data_root: Option<PathBuf>,

    /// Root of the simulated data tree
    #[arg(long, value_name = "DIR")]
    pub simulation_root: Option<PathBuf>,

    /// Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Parse arguments, mapping clap failures onto extraction errors
    ///
    /// `--help` and `--version` print and exit the process.
    pub fn try_parse_args<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(args).map_err(|e| match e.kind() {
            ErrorKind::DisplayHelp
            | ErrorKind::DisplayVersion
            | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => e.exit(),
            ErrorKind::MissingRequiredArgument | ErrorKind::TooFewValues => {
                ExtractError::MissingArguments {
                    message: summarize(&e),
                }
            }
            _ => ExtractError::configuration(summarize(&e)),
        })
    }

    /// Determine the appropriate log level based on verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Check if we should show progress (not in quiet mode)
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }

    /// Load the configuration file and apply command-line overrides
    pub fn load_config(&self) -> Result<ExtractorConfig> {
        let mut config = ExtractorConfig::load(self.config.as_deref())?;
        if let Some(dir) = &self.output_dir {
            config = config.with_output_dir(dir);
        }
        if let Some(root) = &self.data_root {
            config = config.with_data_root(root);
        }
        if let Some(root) = &self.simulation_root {
            config = config.with_simulation_root(root);
        }
        Ok(config)
    }

    /// Validate the arguments into a run request
    ///
    /// Checks run in order mode, variables, dates, filter so each failure
    /// surfaces with its own exit code before any file is touched.
    pub fn to_request(&self, config: &ExtractorConfig) -> Result<RunRequest> {
        let mode: OutputMode = self.mode.parse()?;
        let schema = Schema::from_args(&self.variables)?;

        let is_simulation = self.is_simulation == "1";
        let (start, end) = if is_simulation {
            let date: Date = config.simulation_date.parse()?;
            debug!("Simulation run, dates pinned to {}", date);
            (date, date)
        } else {
            (self.start_date.parse()?, self.end_date.parse()?)
        };

        let filter = FilterExpr::for_run(&self.filter, &config.base_filter)?;
        debug!("Effective filter: {}", filter);

        Ok(RunRequest {
            mode,
            station: self.station.clone(),
            start,
            end,
            filter,
            is_simulation,
            schema,
        })
    }
}

/// First paragraph of a clap error, without the `error: ` prefix
fn summarize(e: &clap::Error) -> String {
    let text = e.to_string();
    let first: Vec<&str> = text
        .lines()
        .map(str::trim)
        .take_while(|line| !line.is_empty())
        .collect();
    first
        .join(" ")
        .trim_start_matches("error: ")
        .to_string()
}
