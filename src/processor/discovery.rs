//! File discovery module for station data trees
//!
//! Lists the day files of a station across a calendar range. The data
//! tree follows this structure:
//! ```text
//! <root>/
//!   ALPHA/
//!     2020-01-01/
//!       ALPHA_run001_dst.parquet
//!       ALPHA_run002_dst.parquet
//!     2020-01-02/
//!       ALPHA_run001_dst.parquet
//! ```
//! Simulated runs live under a separate root and their file names carry a
//! fixed synthetic station identifier instead of the real one.

use crate::calendar::{Date, in_range, next_day};
use crate::config::ExtractorConfig;
use crate::error::{ExtractError, Result};
use regex::Regex;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

/// Finds the files of one station inside dated directories
#[derive(Debug, Clone)]
pub struct FileLocator {
    root: PathBuf,
    station: String,
    pattern: Regex,
}

impl FileLocator {
    /// Create a locator for `station`, switching root and file-name
    /// identifier when `is_simulation` is set
    pub fn new(config: &ExtractorConfig, station: &str, is_simulation: bool) -> Result<Self> {
        let (root, station_in_file) = if is_simulation {
            (&config.simulation_root, config.simulation_station.as_str())
        } else {
            (&config.data_root, station)
        };

        let source = format!(
            "^(?:{}.*{})$",
            regex::escape(station_in_file),
            config.file_suffix
        );
        let pattern = Regex::new(&source).map_err(|e| {
            ExtractError::configuration(format!("invalid file pattern {}: {}", source, e))
        })?;

        Ok(Self {
            root: root.clone(),
            station: station.to_string(),
            pattern,
        })
    }

    /// `<root>/<station>/<YYYY-MM-DD>/`
    pub fn day_directory(&self, date: Date) -> PathBuf {
        self.root.join(&self.station).join(date.to_string())
    }

    /// Check whether a file name belongs to this station
    pub fn matches(&self, file_name: &str) -> bool {
        self.pattern.is_match(file_name)
    }

    /// Matching files of one day, sorted by file name
    ///
    /// Fails with [`ExtractError::Discovery`] when the directory cannot
    /// be listed.
    pub fn files_for_day(&self, date: Date) -> Result<Vec<PathBuf>> {
        let dir = self.day_directory(date);
        let discovery_error = |source| ExtractError::Discovery {
            path: dir.clone(),
            source,
        };

        let mut names = Vec::new();
        for entry in fs::read_dir(&dir).map_err(discovery_error)? {
            let entry = entry.map_err(discovery_error)?;
            if entry.file_type().map_err(discovery_error)?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if self.matches(&name) {
                names.push(name);
            }
        }
        names.sort();

        debug!("Found {} files in {}", names.len(), dir.display());
        Ok(names.into_iter().map(|name| dir.join(name)).collect())
    }
}

/// Files discovered for one scanned day
#[derive(Debug, Clone, PartialEq)]
pub struct DayFiles {
    pub date: Date,
    pub files: Vec<PathBuf>,
}

/// Walks the calendar range day by day, yielding the files of every day
/// whose directory could be listed
///
/// Stops after the last day or once `max_days` directories were listed.
/// Days whose directory is missing are skipped and do not count.
#[derive(Debug)]
pub struct DayScanner<'a> {
    locator: &'a FileLocator,
    current: Date,
    last: Date,
    max_days: usize,
    days_scanned: usize,
}

impl<'a> DayScanner<'a> {
    pub fn new(locator: &'a FileLocator, first: Date, last: Date, max_days: usize) -> Self {
        Self {
            locator,
            current: first,
            last,
            max_days,
            days_scanned: 0,
        }
    }

    /// Number of day directories listed so far
    pub fn days_scanned(&self) -> usize {
        self.days_scanned
    }
}

impl Iterator for DayScanner<'_> {
    type Item = DayFiles;

    fn next(&mut self) -> Option<DayFiles> {
        while in_range(self.current, self.last) && self.days_scanned < self.max_days {
            let date = self.current;
            self.current = next_day(date);

            match self.locator.files_for_day(date) {
                Ok(files) => {
                    self.days_scanned += 1;
                    return Some(DayFiles { date, files });
                }
                Err(e) => debug!("Skipping {}: {}", date, e),
            }
        }
        None
    }
}
