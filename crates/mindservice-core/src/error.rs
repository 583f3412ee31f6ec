// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for run operations.
//!
//! [`RunError`] is what callers of the orchestrator see. Failures inside a
//! background computation never surface here; they are recorded on the run.

use thiserror::Error;

/// Result type using [`RunError`].
pub type Result<T> = std::result::Result<T, RunError>;

/// Errors returned by submit, progress and finalize.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunError {
    /// The requested calculation is not in the allow-list.
    #[error("Unknown calculationName: {0}")]
    UnknownCalculation(String),

    /// Downloading or opening the input archive failed.
    #[error("Failed to download or extract input zip: {0}")]
    Staging(String),

    /// Some requested entries are absent from the input archive.
    #[error("Missing files in zip: {}", .0.join(", "))]
    MissingEntries(Vec<String>),

    /// A requested output name is not a plain file name.
    #[error("Invalid output file name: {0:?}")]
    InvalidOutputName(String),

    /// The run ID was never submitted.
    #[error("Unknown runId: {0}")]
    UnknownRun(String),

    /// The run has no output files to finalize.
    #[error("No output for run {run_id}: {reason}")]
    NoOutput {
        /// The run ID.
        run_id: String,
        /// Why there is nothing to finalize.
        reason: String,
    },

    /// Packaging the output files failed.
    #[error("Failed to create results archive: {0}")]
    Packaging(String),

    /// Uploading the results archive failed.
    #[error("Failed to upload results archive: {0}")]
    Upload(String),

    /// Local storage operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RunError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            RunError::UnknownCalculation(_) => "UNKNOWN_CALCULATION",
            RunError::Staging(_) => "STAGING_FAILED",
            RunError::MissingEntries(_) => "MISSING_ENTRIES",
            RunError::InvalidOutputName(_) => "INVALID_OUTPUT_NAME",
            RunError::UnknownRun(_) => "UNKNOWN_RUN",
            RunError::NoOutput { .. } => "NO_OUTPUT",
            RunError::Packaging(_) => "PACKAGING_FAILED",
            RunError::Upload(_) => "UPLOAD_FAILED",
            RunError::Io(_) => "IO_ERROR",
        }
    }

    /// Check if the error was caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RunError::UnknownCalculation(_)
                | RunError::Staging(_)
                | RunError::MissingEntries(_)
                | RunError::InvalidOutputName(_)
                | RunError::UnknownRun(_)
                | RunError::NoOutput { .. }
        )
    }
}
