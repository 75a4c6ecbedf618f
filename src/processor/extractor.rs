//! Per-file extraction
//!
//! Holds the state threaded across every file of a run: the output
//! schema, the compiled filter, the global entry budget and the cached
//! weather reading.

use super::writer::OutputSink;
use crate::constants::{derived, direction};
use crate::error::{ExtractError, Result};
use crate::filter::FilterExpr;
use crate::schema::{FieldSource, Schema};
use crate::source::{EventRow, EventSource, EventStore};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Weather reading of the most recently opened file
#[derive(Debug, Clone, Default)]
pub struct AuxiliaryCache {
    file: Option<PathBuf>,
    pressure: f64,
    refreshes: usize,
}

impl AuxiliaryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pressure for `path`, read from `source` only if `path` is not the
    /// cached file
    pub fn pressure_for(&mut self, path: &Path, source: &mut dyn EventSource) -> Result<f64> {
        if self.file.as_deref() != Some(path) {
            self.pressure = source.auxiliary_scalar(derived::PRESSURE)?;
            self.file = Some(path.to_path_buf());
            self.refreshes += 1;
            debug!("Pressure {} read from {}", self.pressure, path.display());
        }
        Ok(self.pressure)
    }

    /// Number of times the reading was fetched from a source
    pub fn refreshes(&self) -> usize {
        self.refreshes
    }
}

/// Rows still allowed into the output across the whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryBudget {
    cap: usize,
    remaining: usize,
}

impl EntryBudget {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            remaining: cap,
        }
    }

    /// `floor(max_total_entries / variables)`
    pub fn for_schema(max_total_entries: usize, variables: usize) -> Self {
        Self::new(max_total_entries / variables.max(1))
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// How many of `available` rows may be taken now
    pub fn allowance(&self, available: usize) -> usize {
        available.min(self.remaining)
    }

    /// Account for one accepted row
    pub fn consume(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }
}

/// What one file contributed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileOutcome {
    /// Events passing the filter
    pub filtered: usize,
    /// Rows written to the sink
    pub taken: usize,
}

/// Extraction state shared by every file of a run
#[derive(Debug)]
pub struct Extractor {
    schema: Schema,
    filter: FilterExpr,
    budget: EntryBudget,
    cache: AuxiliaryCache,
}

impl Extractor {
    pub fn new(schema: Schema, filter: FilterExpr, budget: EntryBudget) -> Self {
        Self {
            schema,
            filter,
            budget,
            cache: AuxiliaryCache::new(),
        }
    }

    pub fn budget(&self) -> &EntryBudget {
        &self.budget
    }

    /// Weather readings fetched so far
    pub fn weather_reads(&self) -> usize {
        self.cache.refreshes()
    }

    /// Extract the rows of one file into `sink`
    ///
    /// Every source failure happens before the first row reaches the
    /// sink, so a failed file contributes nothing. The source is released
    /// when this returns.
    pub fn extract_file(
        &mut self,
        store: &dyn EventStore,
        path: &Path,
        sink: &mut dyn OutputSink,
    ) -> Result<FileOutcome> {
        let mut source = store.open(path)?;
        let filtered = source.apply_filter(&self.filter)?;
        let pressure = self.cache.pressure_for(path, source.as_mut())?;

        let take = self.budget.allowance(filtered);
        let resolved = (0..take)
            .map(|i| {
                let row = source.row(i)?;
                self.resolve_row(path, &row, pressure)
            })
            .collect::<Result<Vec<_>>>()?;
        drop(source);

        for values in resolved {
            for (var, value) in self.schema.variables_mut().iter_mut().zip(values) {
                var.set_coerced(value);
            }
            sink.append(&self.schema)?;
            self.budget.consume();
        }

        debug!(
            "{}: {} events pass the filter, {} taken, {} remaining",
            path.display(),
            filtered,
            take,
            self.budget.remaining()
        );
        Ok(FileOutcome {
            filtered,
            taken: take,
        })
    }

    /// Raw value of every schema column for one event
    fn resolve_row(&self, path: &Path, row: &EventRow, pressure: f64) -> Result<Vec<f64>> {
        let field = |name: &str| {
            row.get(name).ok_or_else(|| {
                ExtractError::source_failure(path, format!("event has no field {}", name))
            })
        };

        self.schema
            .variables()
            .iter()
            .map(|var| match var.source() {
                FieldSource::Theta => Ok(theta_degrees(field(direction::Z)?)),
                FieldSource::Phi => Ok(phi_degrees(field(direction::X)?, field(direction::Y)?)),
                FieldSource::Pressure => Ok(pressure),
                FieldSource::Event => field(var.name()),
            })
            .collect()
    }
}

/// Zenith angle in degrees, within [0, 180] for `z` in [-1, 1]
pub fn theta_degrees(z: f64) -> f64 {
    z.acos().to_degrees()
}

/// Azimuth in degrees, within (-180, 180]
///
/// `atan2` yields -180 for a negative-zero `y` on the negative x axis;
/// that direction is reported as 180.
pub fn phi_degrees(x: f64, y: f64) -> f64 {
    let phi = y.atan2(x).to_degrees();
    if phi <= -180.0 { phi + 360.0 } else { phi }
}
