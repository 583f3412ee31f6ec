// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Mindservice Server - asynchronous calculation runs over HTTP
//!
//! Accepts runs whose inputs live in blob storage, computes them in the
//! background and uploads the packaged results on request.

use tracing::{info, warn};

use mindservice_server::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mindservice_server=info,mindservice_core=info,tower_http=info".into()
            }),
        )
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    let config = Config::from_env()?;

    info!(
        http_addr = %config.http_addr,
        data_dir = %config.data_dir.display(),
        max_concurrent_runs = config.max_concurrent_runs,
        "Starting Mindservice Server"
    );

    mindservice_server::serve(config).await?;

    info!("Mindservice Server shut down");

    Ok(())
}
