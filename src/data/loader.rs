//! Tabular file readers and writers

use crate::error::{Result, TrainerError};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Supported on-disk tabular formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    /// Row-oriented delimited text
    Csv,
    /// Columnar binary
    Parquet,
}

impl DataFormat {
    /// All recognized formats, in candidate-listing order
    pub const ALL: [DataFormat; 2] = [DataFormat::Csv, DataFormat::Parquet];

    pub fn extension(self) -> &'static str {
        match self {
            DataFormat::Csv => "csv",
            DataFormat::Parquet => "parquet",
        }
    }

    /// Detect the format from a path's extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "csv" => Some(DataFormat::Csv),
            "parquet" => Some(DataFormat::Parquet),
            _ => None,
        }
    }

    /// The other recognized format
    pub fn sibling(self) -> Self {
        match self {
            DataFormat::Csv => DataFormat::Parquet,
            DataFormat::Parquet => DataFormat::Csv,
        }
    }
}

/// Data loader for the recognized formats
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Rows scanned to infer the CSV schema
    infer_schema_length: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: 1000,
        }
    }

    /// Set the number of rows used for CSV schema inference
    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = rows.max(1);
        self
    }

    /// Load a CSV file
    pub fn load_csv(&self, path: &Path) -> Result<DataFrame> {
        let file = File::open(path).map_err(|e| load_error(path, e))?;

        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| load_error(path, e))
    }

    /// Load a Parquet file
    pub fn load_parquet(&self, path: &Path) -> Result<DataFrame> {
        let file = File::open(path).map_err(|e| load_error(path, e))?;

        ParquetReader::new(file)
            .finish()
            .map_err(|e| load_error(path, e))
    }

    /// Load by extension; anything unrecognized goes through the CSV reader.
    pub fn load_auto(&self, path: &Path) -> Result<DataFrame> {
        match DataFormat::from_path(path) {
            Some(DataFormat::Parquet) => self.load_parquet(path),
            Some(DataFormat::Csv) | None => self.load_csv(path),
        }
    }
}

fn load_error(path: &Path, err: impl std::fmt::Display) -> TrainerError {
    TrainerError::DataLoad {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

/// Save DataFrames to the recognized formats
pub struct DataSaver;

impl DataSaver {
    /// Save to CSV with a header row
    pub fn save_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
        let mut file = File::create(path)?;

        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(df)
            .map_err(TrainerError::from)
    }

    /// Save to Parquet
    pub fn save_parquet(df: &mut DataFrame, path: &Path) -> Result<()> {
        let file = File::create(path)?;

        ParquetWriter::new(file).finish(df)?;
        Ok(())
    }
}
