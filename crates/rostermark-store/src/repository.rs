//! CSV repository for the market-value result table.
//!
//! The repository owns the in-memory table and its file representation.
//! The persisted file doubles as the run checkpoint: every flush writes a
//! complete snapshot through a temporary file plus atomic rename, so the
//! file on disk is loadable at any point, including after a crash.

use crate::error::{Result, StoreError};
use crate::table::{is_blank, ResultRow};
use rostermark_core::{ColumnSet, ResolutionResult, RowKey};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the persisted result table.
pub const OUTPUT_FILE: &str = "market_values.csv";

/// Read/write wrapper around `market_values.csv`.
pub struct ValueRepository {
    path: PathBuf,
    rows: Vec<ResultRow>,
}

impl ValueRepository {
    /// Create a repository rooted in a dataset folder. No I/O happens
    /// until [`ValueRepository::initialize_if_missing`] or
    /// [`ValueRepository::load`] is called.
    #[must_use]
    pub fn new(folder: &Path) -> Self {
        Self {
            path: folder.join(OUTPUT_FILE),
            rows: Vec::new(),
        }
    }

    /// Path of the persisted table.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the table seeded from the input roster when no file exists
    /// yet. An existing file is left untouched so a rerun resumes from it.
    pub fn initialize_if_missing(&mut self, seeds: &[RowKey]) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        self.rows = seeds
            .iter()
            .map(|key| ResultRow::seed(key.player.clone(), key.squad.clone()))
            .collect();
        self.flush()?;
        tracing::info!(
            "Created {} with {} seed rows",
            self.path.display(),
            self.rows.len()
        );
        Ok(())
    }

    /// Load the persisted table into memory.
    ///
    /// A missing or empty file yields an empty table rather than an error,
    /// so a dataset folder can be inspected before any run happened.
    pub fn load(&mut self) -> Result<()> {
        if !self.path.exists() {
            self.rows.clear();
            return Ok(());
        }
        let mut reader = csv::ReaderBuilder::new()
            .flexible(false)
            .from_path(&self.path)?;
        let mut rows = Vec::new();
        for record in reader.deserialize() {
            let row: ResultRow = record?;
            rows.push(row);
        }
        self.rows = rows;
        Ok(())
    }

    /// Number of rows in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows, in table order.
    #[must_use]
    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    /// One row by index.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&ResultRow> {
        self.rows.get(index)
    }

    /// Processing keys from a 1-based start row onward, skipping rows
    /// without a player name. Order matches the table.
    #[must_use]
    pub fn rows_from(&self, start_row: usize) -> Vec<RowKey> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(index, row)| index + 1 >= start_row && !is_blank(&row.player))
            .map(|(index, row)| RowKey::new(row.player.clone(), row.squad.clone(), index))
            .collect()
    }

    /// Overwrite a row from a resolution result, restricted to the
    /// caller-selected columns.
    pub fn update(
        &mut self,
        index: usize,
        result: &ResolutionResult,
        columns: &ColumnSet,
    ) -> Result<()> {
        let len = self.rows.len();
        let row = self
            .rows
            .get_mut(index)
            .ok_or(StoreError::RowOutOfBounds { index, len })?;
        row.apply(result, columns);
        Ok(())
    }

    /// Fill only blank fields of a row from a resolution result. Returns
    /// `true` when anything was filled.
    pub fn merge_backfill(&mut self, index: usize, result: &ResolutionResult) -> Result<bool> {
        let len = self.rows.len();
        let row = self
            .rows
            .get_mut(index)
            .ok_or(StoreError::RowOutOfBounds { index, len })?;
        Ok(row.merge_missing(result))
    }

    /// Persist the current table.
    ///
    /// The snapshot is written to a sibling temporary file and renamed
    /// over the target, so a reader never observes a half-written table.
    pub fn flush(&self) -> Result<()> {
        let tmp_path = self.path.with_extension("csv.tmp");
        {
            let mut writer = csv::Writer::from_path(&tmp_path)?;
            for row in &self.rows {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Final unconditional flush for shutdown and completion paths.
    pub fn save_final(&self) -> Result<()> {
        self.flush()?;
        tracing::info!("Final write to {}", self.path.display());
        Ok(())
    }
}
