// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mock blob transfer for testing.
//!
//! Keeps objects in memory, keyed by their full URL, without touching the
//! network.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::traits::*;

/// In-memory blob store.
#[derive(Debug, Clone, Default)]
pub struct MockBlobTransfer {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    /// If true, every download fails
    pub fail_downloads: bool,
    /// If true, every upload fails
    pub fail_uploads: bool,
}

impl MockBlobTransfer {
    /// Create an empty mock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock store whose uploads always fail.
    pub fn failing_uploads() -> Self {
        Self {
            fail_uploads: true,
            ..Self::default()
        }
    }

    /// Create a mock store whose downloads always fail.
    pub fn failing_downloads() -> Self {
        Self {
            fail_downloads: true,
            ..Self::default()
        }
    }

    /// Store an object under a URL.
    pub async fn put_object(&self, url: &str, bytes: Vec<u8>) {
        self.objects.lock().await.insert(url.to_string(), bytes);
    }

    /// Read back an object stored under a URL.
    pub async fn get_object(&self, url: &str) -> Option<Vec<u8>> {
        self.objects.lock().await.get(url).cloned()
    }

    /// Number of stored objects.
    pub async fn object_count(&self) -> usize {
        self.objects.lock().await.len()
    }
}

#[async_trait]
impl BlobTransfer for MockBlobTransfer {
    fn transfer_type(&self) -> &'static str {
        "mock"
    }

    async fn download(&self, source_url: &str, destination: &Path) -> Result<u64> {
        if self.fail_downloads {
            return Err(TransferError::Other("mock download failure".to_string()));
        }

        let bytes = self
            .get_object(source_url)
            .await
            .ok_or_else(|| TransferError::NotFound(redact_url(source_url).to_string()))?;
        tokio::fs::write(destination, &bytes).await?;

        Ok(bytes.len() as u64)
    }

    async fn upload(&self, source: &Path, destination_url: &str) -> Result<u64> {
        if self.fail_uploads {
            return Err(TransferError::Other("mock upload failure".to_string()));
        }

        let bytes = tokio::fs::read(source).await?;
        let size = bytes.len() as u64;
        self.put_object(destination_url, bytes).await;

        Ok(size)
    }
}
