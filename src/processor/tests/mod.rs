//! Integration tests for the processor module
//!
//! Runs the complete pipeline over real dated directories whose files are
//! served by an in-memory event store that counts opens and weather reads.

pub mod pipeline;

use crate::config::ExtractorConfig;
use crate::error::{ExtractError, Result};
use crate::filter::FilterExpr;
use crate::models::{ExtractionStats, OutputMode, RunRequest};
use crate::processor::Extraction;
use crate::schema::Schema;
use crate::source::{EventRow, EventSource, EventStore};

use std::cell::Cell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::TempDir;

/// Shared counters observed by the tests
#[derive(Debug, Clone, Default)]
pub struct Counters {
    pub opens: Rc<Cell<usize>>,
    pub auxiliary_reads: Rc<Cell<usize>>,
}

fn bump(counter: &Cell<usize>) {
    counter.set(counter.get() + 1);
}

#[derive(Debug, Clone)]
struct MemoryFile {
    events: Vec<EventRow>,
    pressure: Option<f64>,
}

/// Event store serving registered paths from memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: HashMap<PathBuf, MemoryFile>,
    counters: Counters,
}

impl EventStore for MemoryStore {
    fn open(&self, path: &Path) -> Result<Box<dyn EventSource>> {
        bump(&self.counters.opens);
        let file = self
            .files
            .get(path)
            .ok_or_else(|| ExtractError::source_failure(path, "not a valid event file"))?;
        Ok(Box::new(MemorySource {
            path: path.to_path_buf(),
            file: file.clone(),
            filtered: Vec::new(),
            counters: self.counters.clone(),
        }))
    }
}

struct MemorySource {
    path: PathBuf,
    file: MemoryFile,
    filtered: Vec<EventRow>,
    counters: Counters,
}

impl EventSource for MemorySource {
    fn apply_filter(&mut self, filter: &FilterExpr) -> Result<usize> {
        let mut filtered = Vec::new();
        for event in &self.file.events {
            let keep = filter
                .matches(&|name: &str| event.get(name))
                .map_err(|e| ExtractError::source_failure(&self.path, e.to_string()))?;
            if keep {
                filtered.push(event.clone());
            }
        }
        self.filtered = filtered;
        Ok(self.filtered.len())
    }

    fn row(&self, index: usize) -> Result<EventRow> {
        self.filtered
            .get(index)
            .cloned()
            .ok_or_else(|| ExtractError::source_failure(&self.path, "row out of range"))
    }

    fn auxiliary_scalar(&mut self, name: &str) -> Result<f64> {
        bump(&self.counters.auxiliary_reads);
        self.file
            .pressure
            .ok_or_else(|| ExtractError::source_failure(&self.path, format!("no {}", name)))
    }
}

/// Event with the fields every test schema draws from
pub fn event(seconds: i64, status: i64, zdir: f64) -> EventRow {
    [
        ("Seconds", seconds as f64),
        ("StatusCode", status as f64),
        ("XDir", 0.6),
        ("YDir", 0.0),
        ("ZDir", zdir),
        ("Energy", seconds as f64 * 1.5),
    ]
    .into_iter()
    .collect()
}

/// `count` good events numbered from `first`
pub fn events(first: i64, count: usize) -> Vec<EventRow> {
    (0..count as i64).map(|i| event(first + i, 0, 0.8)).collect()
}

/// Temporary data tree plus the store serving its files
pub struct TestTree {
    pub temp_dir: TempDir,
    pub config: ExtractorConfig,
    store: MemoryStore,
}

impl TestTree {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let config = ExtractorConfig::default()
            .with_data_root(temp_dir.path().join("recon2"))
            .with_simulation_root(temp_dir.path().join("MC"))
            .with_output_dir(temp_dir.path().join("out"));
        Self {
            temp_dir,
            config,
            store: MemoryStore::default(),
        }
    }

    pub fn counters(&self) -> &Counters {
        &self.store.counters
    }

    /// Create an (empty) day file on disk and register its events
    pub fn add_file(
        &mut self,
        station: &str,
        date: &str,
        name: &str,
        events: Vec<EventRow>,
        pressure: Option<f64>,
    ) -> PathBuf {
        let path = self.touch(&self.config.data_root.clone(), station, date, name);
        self.store
            .files
            .insert(path.clone(), MemoryFile { events, pressure });
        path
    }

    /// Create a simulated day file
    pub fn add_simulated_file(&mut self, station: &str, name: &str, events: Vec<EventRow>) {
        let date = self.config.simulation_date.clone();
        let path = self.touch(&self.config.simulation_root.clone(), station, &date, name);
        self.store.files.insert(
            path,
            MemoryFile {
                events,
                pressure: Some(950.0),
            },
        );
    }

    /// Create a matching file the store cannot open
    pub fn add_broken_file(&mut self, station: &str, date: &str, name: &str) -> PathBuf {
        self.touch(&self.config.data_root.clone(), station, date, name)
    }

    fn touch(&self, root: &Path, station: &str, date: &str, name: &str) -> PathBuf {
        let dir = root.join(station).join(date);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        fs::write(&path, b"").unwrap();
        path
    }

    pub fn request(
        &self,
        mode: OutputMode,
        station: &str,
        start: &str,
        end: &str,
        filter: &str,
        variables: &[(&str, &str)],
    ) -> RunRequest {
        RunRequest {
            mode,
            station: station.to_string(),
            start: start.parse().unwrap(),
            end: end.parse().unwrap(),
            filter: FilterExpr::for_run(filter, &self.config.base_filter).unwrap(),
            is_simulation: false,
            schema: Schema::from_pairs(variables.iter().map(|(t, n)| (*t, n.to_string())))
                .unwrap(),
        }
    }

    pub fn run(&self, request: RunRequest) -> Result<ExtractionStats> {
        self.run_with(request, self.config.clone())
    }

    pub fn run_with(&self, request: RunRequest, config: ExtractorConfig) -> Result<ExtractionStats> {
        Extraction::new(request, config)
            .with_store(Box::new(self.store.clone()))
            .run()
    }

    /// Files left in the output directory
    pub fn output_files(&self) -> Vec<PathBuf> {
        match fs::read_dir(&self.config.output_dir) {
            Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Data lines of a CSV output, header removed
pub fn csv_rows(path: &Path) -> Vec<Vec<String>> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .skip(1)
        .map(|line| line.split(',').map(str::to_string).collect())
        .collect()
}
