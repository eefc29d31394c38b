// src/storage/mod.rs
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::batch::SkippedRequest;
use crate::bbref::StatType;
use crate::extractors::StatTable;
use crate::utils::error::StorageError;

/// Metadata written next to each CSV file.
#[derive(Debug, Serialize)]
struct BatchMetadata<'a> {
    first_year: u32,
    last_year: u32,
    stat_types: &'a [StatType],
    columns: &'a [String],
    row_count: usize,
    skipped: &'a [SkippedRequest],
    extraction_timestamp: String,
}

pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory for raw pages saved in debug mode.
    pub fn debug_dir(&self) -> PathBuf {
        self.base_dir.join("debug")
    }

    fn file_stem(first_year: u32, last_year: u32) -> String {
        format!("data_{}_{}", first_year, last_year)
    }

    /// Writes the table as `data_{first}_{last}.csv` with a header row.
    /// Cells are written as-is; the csv writer quotes embedded newlines.
    pub fn save_table(&self, table: &StatTable, first_year: u32, last_year: u32) -> Result<PathBuf, StorageError> {
        let file_path = self
            .base_dir
            .join(format!("{}.csv", Self::file_stem(first_year, last_year)));

        let mut writer = csv::Writer::from_path(&file_path)?;
        writer.write_record(table.columns())?;
        for row in table.rows() {
            writer.write_record(row)?;
        }
        writer.flush().map_err(StorageError::IoError)?;

        tracing::info!("Saved {} rows to {}", table.len(), file_path.display());

        Ok(file_path)
    }

    /// Saves metadata about the batch in JSON format
    pub fn save_batch_metadata(
        &self,
        table: Option<&StatTable>,
        first_year: u32,
        last_year: u32,
        stat_types: &[StatType],
        skipped: &[SkippedRequest],
    ) -> Result<PathBuf, StorageError> {
        let file_path = self
            .base_dir
            .join(format!("{}_meta.json", Self::file_stem(first_year, last_year)));

        let metadata = BatchMetadata {
            first_year,
            last_year,
            stat_types,
            columns: table.map(StatTable::columns).unwrap_or_default(),
            row_count: table.map_or(0, StatTable::len),
            skipped,
            extraction_timestamp: chrono::Utc::now().to_rfc3339(),
        };

        let metadata_str = serde_json::to_string_pretty(&metadata)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        fs::write(&file_path, metadata_str)
            .map_err(StorageError::IoError)?;

        tracing::info!("Saved metadata to {}", file_path.display());

        Ok(file_path)
    }
}
