// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mindservice Server
//!
//! HTTP front end for [`mindservice_core`]:
//!
//! | Method | Path | Auth | Purpose |
//! |--------|------|------|---------|
//! | GET | `/health` | no | liveness |
//! | POST | `/MindGetToken` | no | exchange client credentials for a token |
//! | POST | `/MindRunAsync` | bearer | stage inputs and start a run |
//! | GET | `/MindRunProgress?runId=` | bearer | read a run's record |
//! | POST | `/MindUploadClose` | bearer | upload results and reclaim storage |

#![deny(missing_docs)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod server;

pub use config::{Config, ConfigError};
pub use error::ApiError;
pub use server::{AppState, router, serve};
