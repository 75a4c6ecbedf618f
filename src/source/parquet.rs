//! Parquet-backed event store.
//!
//! Each day file is a Parquet table of events. The weather reading for the
//! file lives in a sidecar table next to it, named after the file stem:
//! ```text
//! /recon2/ALPHA/2020-01-01/
//!   ALPHA_run001_dst.parquet           events
//!   ALPHA_run001_dst.weather.parquet   weather, first row used
//! ```

use super::{EventRow, EventSource, EventStore};
use crate::constants::WEATHER_SIDECAR_SUFFIX;
use crate::error::{ExtractError, Result};
use crate::filter::FilterExpr;

use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Opens day files as Parquet event tables
#[derive(Debug, Clone, Copy, Default)]
pub struct ParquetEventStore;

impl ParquetEventStore {
    pub fn new() -> Self {
        Self
    }
}

impl EventStore for ParquetEventStore {
    fn open(&self, path: &Path) -> Result<Box<dyn EventSource>> {
        Ok(Box::new(ParquetEventSource::open(path)?))
    }
}

/// Path of the weather table belonging to a day file
pub fn weather_sidecar_path(path: &Path) -> PathBuf {
    path.with_extension(WEATHER_SIDECAR_SUFFIX)
}

fn read_table(path: &Path, what: &str) -> Result<DataFrame> {
    let file = File::open(path).map_err(|e| {
        ExtractError::source_failure(path, format!("cannot open {} table: {}", what, e))
    })?;
    ParquetReader::new(file).finish().map_err(|e| {
        ExtractError::source_failure(path, format!("cannot read {} table: {}", what, e))
    })
}

/// Events of one day file, with the filtered view kept as `f64` columns
#[derive(Debug)]
pub struct ParquetEventSource {
    path: PathBuf,
    events: DataFrame,
    filtered: Option<Vec<(String, Float64Chunked)>>,
}

impl ParquetEventSource {
    pub fn open(path: &Path) -> Result<Self> {
        let events = read_table(path, "events")?;
        debug!(
            "Opened {} with {} events and {} columns",
            path.display(),
            events.height(),
            events.width()
        );
        Ok(Self {
            path: path.to_path_buf(),
            events,
            filtered: None,
        })
    }

    fn polars_failure(&self, context: &str, e: PolarsError) -> ExtractError {
        ExtractError::source_failure(&self.path, format!("{}: {}", context, e))
    }
}

impl EventSource for ParquetEventSource {
    fn apply_filter(&mut self, filter: &FilterExpr) -> Result<usize> {
        let missing: Vec<&str> = filter
            .fields()
            .into_iter()
            .filter(|name| self.events.column(name).is_err())
            .collect();
        if !missing.is_empty() {
            return Err(ExtractError::source_failure(
                &self.path,
                format!("filter reads missing event fields: {}", missing.join(", ")),
            ));
        }

        let predicate = filter.to_polars()?;
        let df = self
            .events
            .clone()
            .lazy()
            .filter(predicate)
            .collect()
            .map_err(|e| self.polars_failure("filter failed", e))?;

        let mut columns = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            let name = column.name().to_string();
            let cast = column
                .as_materialized_series()
                .cast(&DataType::Float64)
                .and_then(|s| s.f64().cloned());
            match cast {
                Ok(values) => columns.push((name, values)),
                Err(e) => debug!("Skipping non-numeric column {}: {}", name, e),
            }
        }

        let height = df.height();
        debug!("{} events pass the filter in {}", height, self.path.display());
        self.filtered = Some(columns);
        Ok(height)
    }

    fn row(&self, index: usize) -> Result<EventRow> {
        let columns = self.filtered.as_ref().ok_or_else(|| {
            ExtractError::source_failure(&self.path, "row requested before filtering")
        })?;

        if let Some((_, first)) = columns.first() {
            if index >= first.len() {
                return Err(ExtractError::source_failure(
                    &self.path,
                    format!("row {} out of range ({} rows)", index, first.len()),
                ));
            }
        }

        Ok(columns
            .iter()
            .filter_map(|(name, values)| values.get(index).map(|v| (name.as_str(), v)))
            .collect())
    }

    fn auxiliary_scalar(&mut self, name: &str) -> Result<f64> {
        let weather_path = weather_sidecar_path(&self.path);
        let weather = read_table(&weather_path, "weather")?;

        let column = weather.column(name).map_err(|_| {
            ExtractError::source_failure(&weather_path, format!("weather table has no {}", name))
        })?;
        if column.len() == 0 {
            return Err(ExtractError::source_failure(
                &weather_path,
                "weather table is empty",
            ));
        }

        column
            .get(0)
            .ok()
            .and_then(|v| v.extract::<f64>())
            .ok_or_else(|| {
                ExtractError::source_failure(
                    &weather_path,
                    format!("{} in first weather row is not numeric", name),
                )
            })
    }
}
