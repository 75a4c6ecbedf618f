//! Event source abstraction.
//!
//! An [`EventStore`] opens day files; each opened [`EventSource`] applies
//! the run filter, hands out filtered rows by index and reads the single
//! auxiliary weather scalar stored alongside the events. The extractor
//! only talks to these traits, so tests can substitute in-memory stores.

pub mod parquet;

pub use self::parquet::ParquetEventStore;

use crate::error::Result;
use crate::filter::FilterExpr;
use std::collections::HashMap;
use std::path::Path;

/// Named raw field values of one filtered event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventRow {
    fields: HashMap<String, f64>,
}

impl EventRow {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.fields.get(name).copied()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for EventRow {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// One opened day file
///
/// Dropping the source releases the underlying file.
pub trait EventSource {
    /// Apply `filter` and return how many events pass it
    fn apply_filter(&mut self, filter: &FilterExpr) -> Result<usize>;

    /// The `index`-th event that passed the last applied filter
    fn row(&self, index: usize) -> Result<EventRow>;

    /// Read the named scalar from the file's weather table
    fn auxiliary_scalar(&mut self, name: &str) -> Result<f64>;
}

/// Opens day files as event sources
pub trait EventStore {
    fn open(&self, path: &Path) -> Result<Box<dyn EventSource>>;
}
