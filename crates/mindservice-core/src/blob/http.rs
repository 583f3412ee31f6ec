// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP blob transfer.
//!
//! Talks to Azure-compatible blob storage using pre-signed (SAS) URLs, so no
//! account credentials are needed: the URL itself authorizes the request.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, StatusCode, Url};
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::traits::*;

/// Blob service REST version sent with every request.
const BLOB_API_VERSION: &str = "2021-08-06";

/// Blob transfer over HTTP(S).
#[derive(Debug, Clone, Default)]
pub struct HttpBlobTransfer {
    client: Client,
}

impl HttpBlobTransfer {
    /// Create a transfer backend with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transfer backend using an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| TransferError::InvalidUrl(format!("{}: {}", redact_url(url), e)))
}

/// reqwest errors embed the full URL; drop it so SAS tokens never leak.
fn without_url(err: reqwest::Error) -> TransferError {
    TransferError::Http(err.without_url())
}

fn check_status(response: &Response, url: &str) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    if status == StatusCode::NOT_FOUND {
        return Err(TransferError::NotFound(redact_url(url).to_string()));
    }
    Err(TransferError::Status {
        status: status.as_u16(),
        url: redact_url(url).to_string(),
    })
}

#[async_trait]
impl BlobTransfer for HttpBlobTransfer {
    fn transfer_type(&self) -> &'static str {
        "http"
    }

    async fn download(&self, source_url: &str, destination: &Path) -> Result<u64> {
        let url = parse_url(source_url)?;
        let mut response = self
            .client
            .get(url)
            .header("x-ms-version", BLOB_API_VERSION)
            .send()
            .await
            .map_err(without_url)?;
        check_status(&response, source_url)?;

        let mut file = tokio::fs::File::create(destination).await?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.map_err(without_url)? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        debug!(
            url = %redact_url(source_url),
            path = %destination.display(),
            bytes = written,
            "Blob downloaded"
        );

        Ok(written)
    }

    async fn upload(&self, source: &Path, destination_url: &str) -> Result<u64> {
        let url = parse_url(destination_url)?;
        let body = tokio::fs::read(source).await?;
        let size = body.len() as u64;

        let response = self
            .client
            .put(url)
            .header("x-ms-blob-type", "BlockBlob")
            .header("x-ms-version", BLOB_API_VERSION)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await
            .map_err(without_url)?;
        check_status(&response, destination_url)?;

        debug!(
            url = %redact_url(destination_url),
            path = %source.display(),
            bytes = size,
            "Blob uploaded"
        );

        Ok(size)
    }
}
