//! Output sinks for extracted rows
//!
//! Both sinks take the schema's current values once per accepted row and
//! write nothing at the final path until [`OutputSink::finish`]; data is
//! staged in a temporary file inside the output directory and persisted
//! with a rename, so a failed run never leaves a partial output behind.

use crate::config::ExtractorConfig;
use crate::error::{ExtractError, Result};
use crate::models::OutputMode;
use crate::schema::{Kind, Schema, Value};

use polars::prelude::{
    Column, DataFrame, ParquetCompression, ParquetWriter as PolarsParquetWriter,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Destination for accepted rows
pub trait OutputSink {
    /// Append one row made of the schema's current values
    fn append(&mut self, schema: &Schema) -> Result<()>;

    /// Rows appended so far
    fn rows_written(&self) -> usize;

    /// Flush everything to the final path and return it
    fn finish(self: Box<Self>) -> Result<PathBuf>;
}

/// Create the sink for `mode` writing to `destination`
pub fn create_sink(
    mode: OutputMode,
    destination: &Path,
    schema: &Schema,
    config: &ExtractorConfig,
) -> Result<Box<dyn OutputSink>> {
    Ok(match mode {
        OutputMode::Csv => Box::new(CsvSink::create(
            destination,
            schema,
            config.csv.float_precision,
        )?),
        OutputMode::Root => Box::new(ParquetSink::create(
            destination,
            schema,
            config.parquet.compression.to_polars_compression(),
            config.parquet.row_group_size,
        )?),
    })
}

fn staging_file(destination: &Path) -> Result<NamedTempFile> {
    let dir = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    Ok(NamedTempFile::new_in(dir)?)
}

fn persist(staged: NamedTempFile, destination: &Path) -> Result<PathBuf> {
    staged.persist(destination).map_err(|e| e.error)?;
    debug!("Persisted output to {}", destination.display());
    Ok(destination.to_path_buf())
}

/// Comma-separated text table
pub struct CsvSink {
    writer: csv::Writer<NamedTempFile>,
    destination: PathBuf,
    precision: usize,
    rows: usize,
    record: Vec<String>,
}

impl CsvSink {
    /// Stage the file and write the header record
    pub fn create(destination: &Path, schema: &Schema, precision: usize) -> Result<Self> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(staging_file(destination)?);
        writer.write_record(schema.headers())?;

        Ok(Self {
            writer,
            destination: destination.to_path_buf(),
            precision,
            rows: 0,
            record: Vec::with_capacity(schema.len()),
        })
    }
}

impl OutputSink for CsvSink {
    fn append(&mut self, schema: &Schema) -> Result<()> {
        self.record.clear();
        self.record
            .extend(schema.variables().iter().map(|var| match var.value() {
                Value::Integer(v) => v.to_string(),
                Value::Float(v) => format!("{:.*}", self.precision, v),
            }));
        self.writer.write_record(&self.record)?;
        self.rows += 1;
        Ok(())
    }

    fn rows_written(&self) -> usize {
        self.rows
    }

    fn finish(self: Box<Self>) -> Result<PathBuf> {
        let Self {
            writer,
            destination,
            ..
        } = *self;
        let staged = writer.into_inner().map_err(|e| e.into_error())?;
        persist(staged, &destination)
    }
}

/// Typed values of one output column
#[derive(Debug, Clone, PartialEq)]
enum ColumnBuffer {
    Integer(Vec<i64>),
    Float(Vec<f64>),
}

impl ColumnBuffer {
    fn for_kind(kind: Kind) -> Self {
        match kind {
            Kind::Integer => ColumnBuffer::Integer(Vec::new()),
            Kind::Float => ColumnBuffer::Float(Vec::new()),
        }
    }

    fn into_column(self, name: &str) -> Column {
        match self {
            ColumnBuffer::Integer(values) => Column::new(name.into(), values),
            ColumnBuffer::Float(values) => Column::new(name.into(), values),
        }
    }
}

/// Typed columnar container written as a single Parquet file
#[derive(Debug)]
pub struct ParquetSink {
    names: Vec<String>,
    columns: Vec<ColumnBuffer>,
    destination: PathBuf,
    compression: ParquetCompression,
    row_group_size: Option<usize>,
    rows: usize,
}

impl ParquetSink {
    pub fn create(
        destination: &Path,
        schema: &Schema,
        compression: ParquetCompression,
        row_group_size: Option<usize>,
    ) -> Result<Self> {
        Ok(Self {
            names: schema.headers().map(str::to_string).collect(),
            columns: schema
                .variables()
                .iter()
                .map(|v| ColumnBuffer::for_kind(v.kind()))
                .collect(),
            destination: destination.to_path_buf(),
            compression,
            row_group_size,
            rows: 0,
        })
    }
}

impl OutputSink for ParquetSink {
    fn append(&mut self, schema: &Schema) -> Result<()> {
        if schema.len() != self.columns.len() {
            return Err(ExtractError::configuration(format!(
                "row has {} values but the container has {} columns",
                schema.len(),
                self.columns.len()
            )));
        }

        for (buffer, var) in self.columns.iter_mut().zip(schema.variables()) {
            match (buffer, var.value()) {
                (ColumnBuffer::Integer(values), Value::Integer(v)) => values.push(v),
                (ColumnBuffer::Float(values), Value::Float(v)) => values.push(v),
                (_, value) => {
                    return Err(ExtractError::configuration(format!(
                        "column {} received a {} value",
                        var.name(),
                        value.kind()
                    )));
                }
            }
        }
        self.rows += 1;
        Ok(())
    }

    fn rows_written(&self) -> usize {
        self.rows
    }

    fn finish(self: Box<Self>) -> Result<PathBuf> {
        let Self {
            names,
            columns,
            destination,
            compression,
            row_group_size,
            ..
        } = *self;

        let columns: Vec<Column> = columns
            .into_iter()
            .zip(&names)
            .map(|(buffer, name)| buffer.into_column(name))
            .collect();
        let mut df = DataFrame::new(columns)?;

        let mut staged = staging_file(&destination)?;
        let writer = PolarsParquetWriter::new(staged.as_file_mut()).with_compression(compression);
        let writer = if let Some(row_group_size) = row_group_size {
            writer.with_row_group_size(Some(row_group_size))
        } else {
            writer
        };
        writer.finish(&mut df)?;

        debug!("Wrote {} rows x {} columns", df.height(), df.width());
        persist(staged, &destination)
    }
}
