//! Main extraction engine.
//!
//! Orchestrates a run: walks the calendar range day by day, locates the
//! station's files, feeds each one through the [`Extractor`] and finalizes
//! the output sink once the scan is over.

pub mod discovery;
pub mod extractor;
pub mod writer;

#[cfg(test)]
pub mod tests;

use self::discovery::{DayScanner, FileLocator};
use self::extractor::{EntryBudget, Extractor};
use self::writer::create_sink;

use crate::config::ExtractorConfig;
use crate::error::{ExtractError, Result};
use crate::models::{ExtractionStats, RunRequest};
use crate::source::{EventStore, ParquetEventStore};

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// One extraction run
pub struct Extraction {
    request: RunRequest,
    config: ExtractorConfig,
    store: Box<dyn EventStore>,
    show_progress: bool,
}

impl Extraction {
    /// Create a run reading Parquet day files
    pub fn new(request: RunRequest, config: ExtractorConfig) -> Self {
        Self {
            request,
            config,
            store: Box::new(ParquetEventStore::new()),
            show_progress: false,
        }
    }

    /// Replace the event store
    pub fn with_store(mut self, store: Box<dyn EventStore>) -> Self {
        self.store = store;
        self
    }

    /// Show a spinner and summary on stderr
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Final location of the output file
    pub fn output_path(&self) -> PathBuf {
        self.config
            .output_dir
            .join(self.request.output_file_name())
    }

    /// Run the extraction and return its statistics
    pub fn run(self) -> Result<ExtractionStats> {
        let start_time = Instant::now();
        let output_path = std::path::absolute(self.output_path())?;
        let request = &self.request;

        info!(
            "Extracting {} from {} to {} into {}",
            request.station,
            request.start,
            request.end,
            output_path.display()
        );

        let locator = FileLocator::new(&self.config, &request.station, request.is_simulation)?;
        let budget = EntryBudget::for_schema(self.config.max_total_entries, request.schema.len());
        info!("Row cap: {} rows of {} variables", budget.cap(), request.schema.len());

        let mut extractor = Extractor::new(request.schema.clone(), request.filter.clone(), budget);
        let mut sink = create_sink(request.mode, &output_path, &request.schema, &self.config)?;
        let progress = self.create_progress();

        let mut stats = ExtractionStats::default();
        let mut first_file_checked = false;
        let mut last_failure = None;
        let mut scanner = DayScanner::new(
            &locator,
            request.start,
            request.end,
            self.config.max_days,
        );

        'days: for day in scanner.by_ref() {
            stats.files_found += day.files.len();

            for path in &day.files {
                if first_file_checked && extractor.budget().is_exhausted() {
                    info!("Row cap reached, stopping scan at {}", day.date);
                    break 'days;
                }

                progress.set_message(format!("{} {}", day.date, path.display()));
                match extractor.extract_file(self.store.as_ref(), path, sink.as_mut()) {
                    Ok(outcome) => {
                        stats.files_visited += 1;
                        if outcome.taken < outcome.filtered {
                            info!(
                                "Row cap keeps {} of {} events from {}",
                                outcome.taken,
                                outcome.filtered,
                                path.display()
                            );
                        }
                        if !first_file_checked {
                            first_file_checked = true;
                            if outcome.filtered == 0 {
                                progress.finish_and_clear();
                                return Err(ExtractError::NoFilteredRows { path: path.clone() });
                            }
                        }
                    }
                    Err(e @ ExtractError::Source { .. }) => {
                        warn!("Skipping file: {}", e);
                        stats.files_failed += 1;
                        last_failure = Some(e);
                    }
                    Err(e) => {
                        progress.finish_and_clear();
                        return Err(e);
                    }
                }
            }

            if first_file_checked && extractor.budget().is_exhausted() {
                info!("Row cap reached after {}", day.date);
                break;
            }
        }
        progress.finish_and_clear();

        stats.days_scanned = scanner.days_scanned();
        if stats.days_scanned == 0 {
            return Err(ExtractError::NoDaysScanned);
        }
        if stats.files_found == 0 {
            return Err(ExtractError::NoFilesFound);
        }
        if stats.files_visited == 0 {
            if let Some(e) = last_failure {
                return Err(e);
            }
        }

        stats.rows_written = sink.rows_written();
        stats.weather_reads = extractor.weather_reads();
        stats.output_path = sink.finish()?;

        info!(
            "Scanned {} days, {} files found, {} extracted, {} skipped, {} weather reads, {} rows written",
            stats.days_scanned,
            stats.files_found,
            stats.files_visited,
            stats.files_failed,
            stats.weather_reads,
            stats.rows_written
        );
        if self.show_progress {
            self.print_summary(&stats, start_time.elapsed());
        }

        Ok(stats)
    }

    fn create_progress(&self) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }

        let progress = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            progress.set_style(style.tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "));
        }
        progress.enable_steady_tick(Duration::from_millis(100));
        progress
    }

    fn print_summary(&self, stats: &ExtractionStats, elapsed: Duration) {
        eprintln!("{}", "Extraction Summary".bright_green().bold());
        eprintln!(
            "  {} {}ms",
            "Time elapsed:".bright_cyan(),
            elapsed.as_millis().to_string().bright_white()
        );
        eprintln!(
            "  {} {}",
            "Files extracted:".bright_cyan(),
            stats.files_visited.to_string().bright_white()
        );
        if stats.files_failed > 0 {
            eprintln!(
                "  {} {}",
                "Files skipped:".bright_red(),
                stats.files_failed.to_string().bright_red().bold()
            );
        }
        eprintln!(
            "  {} {}",
            "Rows written:".bright_cyan(),
            stats.rows_written.to_string().bright_white().bold()
        );
    }
}
