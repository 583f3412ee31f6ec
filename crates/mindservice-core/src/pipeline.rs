// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Staged background computation.
//!
//! A job reads every input table, merges them, applies the calculation and
//! writes one copy of the result per requested output name. Progress is
//! published to the [`RunStatusTable`] after each stage:
//!
//! | Stage | Progress |
//! |-------|----------|
//! | registered | 0 |
//! | inputs read | 10 |
//! | inputs merged | 30 |
//! | calculation applied | 70 |
//! | outputs written | 100, done |
//!
//! Any failure ends the run with `progress=100, done=true` and the error text
//! recorded; it is never returned to a caller.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::calculation::{Calculation, CalculationError};
use crate::status::RunStatusTable;
use crate::table::{INPUT_DELIMITER, OUTPUT_DELIMITER, Table, TableError, output_file_name};

/// Progress once all inputs are read.
pub const PROGRESS_READ: u8 = 10;
/// Progress once inputs are merged.
pub const PROGRESS_MERGED: u8 = 30;
/// Progress once the calculation is applied.
pub const PROGRESS_TRANSFORMED: u8 = 70;

/// Errors that end a computation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// Reading or writing a table failed.
    #[error("{0}")]
    Table(#[from] TableError),

    /// The calculation rejected the data.
    #[error("Calculation failed: {0}")]
    Calculation(#[from] CalculationError),

    /// Local storage operation failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Everything needed to compute one run.
pub struct CalculationJob {
    /// Run ID.
    pub run_id: String,
    /// Calculation to apply.
    pub calculation: Arc<dyn Calculation>,
    /// Input tables, in merge order.
    pub inputs: Vec<PathBuf>,
    /// Directory receiving the output tables.
    pub output_dir: PathBuf,
    /// Requested output names.
    pub outputs: Vec<String>,
}

/// Runs jobs and publishes their progress.
#[derive(Debug, Clone)]
pub struct CalculationPipeline {
    status: Arc<RunStatusTable>,
}

impl CalculationPipeline {
    /// Create a pipeline reporting into `status`.
    pub fn new(status: Arc<RunStatusTable>) -> Self {
        Self { status }
    }

    /// Run a job to a terminal state.
    ///
    /// Returns whether the job succeeded. Blocking: call from a worker thread.
    pub fn run(&self, job: &CalculationJob) -> bool {
        self.status.report_progress(&job.run_id, 0);

        match self.execute(job) {
            Ok(written) => {
                self.status.complete(&job.run_id);
                info!(
                    run_id = %job.run_id,
                    calculation = job.calculation.name(),
                    outputs = written.len(),
                    "Calculation completed"
                );
                true
            }
            Err(e) => {
                self.status.fail(&job.run_id, e.to_string());
                warn!(
                    run_id = %job.run_id,
                    calculation = job.calculation.name(),
                    error = %e,
                    "Calculation failed"
                );
                false
            }
        }
    }

    fn execute(&self, job: &CalculationJob) -> Result<Vec<PathBuf>, PipelineError> {
        let tables = job
            .inputs
            .iter()
            .map(|path| Table::read(path, INPUT_DELIMITER))
            .collect::<Result<Vec<_>, _>>()?;
        self.reached(&job.run_id, PROGRESS_READ, "inputs read");

        let merged = Table::concat(tables);
        self.reached(&job.run_id, PROGRESS_MERGED, "inputs merged");

        let transformed = job.calculation.transform(merged)?;
        self.reached(&job.run_id, PROGRESS_TRANSFORMED, "calculation applied");

        write_outputs(&transformed, &job.output_dir, &job.outputs)
    }

    fn reached(&self, run_id: &str, progress: u8, stage: &str) {
        self.status.report_progress(run_id, progress);
        debug!(run_id = %run_id, progress, stage, "Calculation stage reached");
    }
}

/// Write a full copy of `table` for every requested output name.
pub fn write_outputs(
    table: &Table,
    output_dir: &Path,
    outputs: &[String],
) -> Result<Vec<PathBuf>, PipelineError> {
    std::fs::create_dir_all(output_dir)?;

    let mut written = Vec::with_capacity(outputs.len());
    for name in outputs {
        let path = output_dir.join(output_file_name(name));
        table.write(&path, OUTPUT_DELIMITER)?;
        written.push(path);
    }

    Ok(written)
}
