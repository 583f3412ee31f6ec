// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mindservice Core - Run Lifecycle Management
//!
//! This crate implements the lifecycle of a calculation run: staging input
//! data from blob storage, running the calculation in the background,
//! tracking progress, and packaging and uploading results.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                  mindservice-server (HTTP API)                   │
//! └──────────────────────────────────────────────────────────────────┘
//!                                 │ submit / progress / finalize
//!                                 ▼
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         RunOrchestrator                          │
//! │  ┌──────────────┐  ┌──────────────┐  ┌────────────────────────┐  │
//! │  │ BlobTransfer │  │   Archive    │  │  CalculationPipeline   │  │
//! │  │ (download /  │  │ (extract /   │  │  (background, pooled)  │  │
//! │  │  upload)     │  │  package)    │  │                        │  │
//! │  └──────────────┘  └──────────────┘  └───────────┬────────────┘  │
//! │                                                  │ progress      │
//! │                    ┌─────────────────────────────▼────────────┐  │
//! │                    │             RunStatusTable               │  │
//! │                    └──────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Run State Machine
//!
//! ```text
//!   submit ──► progress=0 ──► 10 (read) ──► 30 (merged) ──► 70 (transformed)
//!                                                               │
//!                              ┌────────────────────────────────┤
//!                              ▼                                ▼
//!                  done, error set (100)             done, outputs written (100)
//!                                                               │ finalize
//!                                                               ▼
//!                                                    done, result attached
//! ```
//!
//! # Modules
//!
//! - [`status`]: Concurrent run status table
//! - [`blob`]: Object storage download/upload backends
//! - [`archive`]: Zip extraction of requested entries and result packaging
//! - [`table`]: Delimited tabular data I/O
//! - [`calculation`]: Pluggable calculations and their allow-list
//! - [`pipeline`]: Staged background computation with progress reporting
//! - [`orchestrator`]: Submit, progress and finalize operations

#![deny(missing_docs)]

/// Zip extraction and result packaging.
pub mod archive;

/// Object storage transfer backends (HTTP, Mock).
pub mod blob;

/// Pluggable calculations.
pub mod calculation;

/// Error types for run operations.
pub mod error;

/// Submit, progress and finalize operations.
pub mod orchestrator;

/// Staged background computation.
pub mod pipeline;

/// Concurrent run status table.
pub mod status;

/// Delimited tabular data.
pub mod table;

pub use error::RunError;
pub use orchestrator::RunOrchestrator;
pub use status::{RunRecord, RunStatusTable};
