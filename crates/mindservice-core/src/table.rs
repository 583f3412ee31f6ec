// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Delimited tabular data.
//!
//! Tables are read without a header row and keep every field as raw text.
//! Numeric interpretation happens later, in the calculation.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// File suffix of tabular data files, for inputs and outputs alike.
pub const TABLE_SUFFIX: &str = ".csv";

/// Field delimiter expected in input files.
pub const INPUT_DELIMITER: u8 = b';';

/// Field delimiter used when writing output files.
pub const OUTPUT_DELIMITER: u8 = b';';

/// Errors from reading or writing tables.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TableError {
    /// A file could not be parsed.
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        /// File being read.
        path: PathBuf,
        /// Underlying parser error.
        source: csv::Error,
    },

    /// A file could not be written.
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        /// File being written.
        path: PathBuf,
        /// Underlying writer error.
        source: csv::Error,
    },
}

/// Result type for table operations.
pub type Result<T> = std::result::Result<T, TableError>;

/// One row of raw field values.
pub type Row = Vec<String>;

/// Ordered sequence of rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    rows: Vec<Row>,
}

impl Table {
    /// Create a table from rows.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    /// Read a delimited file. Rows may have different lengths; a leading
    /// UTF-8 BOM is ignored.
    ///
    /// Empty lines are skipped by the parser and produce no row, so they do
    /// not reach the merged table or the outputs.
    pub fn read(path: &Path, delimiter: u8) -> Result<Self> {
        let read_err = |source: csv::Error| TableError::Read {
            path: path.to_path_buf(),
            source,
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(read_err)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(read_err)?;
            rows.push(record.iter().map(str::to_string).collect::<Row>());
        }

        if let Some(first) = rows.first_mut().and_then(|row| row.first_mut())
            && let Some(stripped) = first.strip_prefix('\u{feff}')
        {
            *first = stripped.to_string();
        }

        Ok(Self { rows })
    }

    /// Write the table as a delimited file, replacing any existing file.
    pub fn write(&self, path: &Path, delimiter: u8) -> Result<()> {
        let write_err = |source: csv::Error| TableError::Write {
            path: path.to_path_buf(),
            source,
        };

        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(write_err)?;

        for row in &self.rows {
            writer.write_record(row).map_err(write_err)?;
        }
        writer
            .flush()
            .map_err(|e| write_err(csv::Error::from(e)))?;

        Ok(())
    }

    /// Append tables one after another, keeping row order within each.
    pub fn concat(tables: impl IntoIterator<Item = Table>) -> Self {
        let rows = tables.into_iter().flat_map(|t| t.rows).collect();
        Self { rows }
    }

    /// Rows of the table.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Consume the table, returning its rows.
    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// File name for an output: the suffix is appended unless already present
/// (case-insensitive).
pub fn output_file_name(name: &str) -> String {
    if name.to_lowercase().ends_with(TABLE_SUFFIX) {
        name.to_string()
    } else {
        format!("{}{}", name, TABLE_SUFFIX)
    }
}

/// Check whether a file name carries the table suffix (case-insensitive).
pub fn is_table_file(name: &str) -> bool {
    name.to_lowercase().ends_with(TABLE_SUFFIX)
}
