// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Blob transfer module - object storage backends.

pub mod http;
pub mod mock;
mod traits;

pub use http::HttpBlobTransfer;
pub use mock::MockBlobTransfer;
pub use traits::*;
