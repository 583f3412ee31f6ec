// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Blob transfer trait definitions.
//!
//! Defines the abstract interface for moving files between local storage and
//! object storage addressed by a URL carrying its own SAS credential.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors from blob transfer operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransferError {
    /// The URL could not be used for a request.
    #[error("Invalid blob URL: {0}")]
    InvalidUrl(String),

    /// The object does not exist.
    #[error("Blob not found: {0}")]
    NotFound(String),

    /// Object storage answered with a non-success status.
    #[error("Blob request to {url} failed with status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Request URL without its query string.
        url: String,
    },

    /// Network or protocol failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Local file I/O failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error.
    #[error("Other: {0}")]
    Other(String),
}

/// Result type for blob transfer operations.
pub type Result<T> = std::result::Result<T, TransferError>;

/// Trait for object storage backends.
///
/// Implementations move whole files. They do not retry and impose no
/// timeout; a stalled transfer blocks the caller.
#[async_trait]
pub trait BlobTransfer: Send + Sync {
    /// Backend type identifier (e.g., "http", "mock")
    fn transfer_type(&self) -> &'static str;

    /// Download the blob at `source_url` into `destination`, replacing it.
    ///
    /// Returns the number of bytes written.
    async fn download(&self, source_url: &str, destination: &Path) -> Result<u64>;

    /// Upload `source` to `destination_url`, overwriting any existing blob.
    ///
    /// Returns the number of bytes sent.
    async fn upload(&self, source: &Path, destination_url: &str) -> Result<u64>;
}

/// Strip the query string (SAS token) from a blob URL for logging.
pub fn redact_url(url: &str) -> &str {
    url.split_once('?').map(|(base, _)| base).unwrap_or(url)
}
