// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Router assembly and the HTTP listener.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use mindservice_core::RunOrchestrator;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::auth::{ClientCredentials, TokenIssuer};
use crate::config::Config;
use crate::handlers;

/// Shared state for all handlers.
pub struct AppState {
    /// Run lifecycle.
    pub orchestrator: RunOrchestrator,
    /// Access token signer and verifier.
    pub tokens: TokenIssuer,
    /// Credentials accepted by token issuance.
    pub credentials: ClientCredentials,
}

impl AppState {
    /// Build the state described by `config`.
    pub fn from_config(config: &Config) -> Self {
        let orchestrator = RunOrchestrator::builder()
            .data_dir(config.data_dir.clone())
            .max_concurrent_runs(config.max_concurrent_runs)
            .build();

        Self {
            orchestrator,
            tokens: TokenIssuer::new(config.jwt_secret.as_bytes(), config.token_ttl_hours),
            credentials: ClientCredentials::new(&config.client_id, &config.client_secret),
        }
    }
}

/// Create the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/MindGetToken", post(handlers::get_token))
        .route("/MindRunAsync", post(handlers::run_async))
        .route("/MindRunProgress", get(handlers::run_progress))
        .route("/MindUploadClose", post(handlers::upload_close))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API until Ctrl-C.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let state = Arc::new(AppState::from_config(&config));
    let app = router(state);

    let listener = TcpListener::bind(config.http_addr).await?;
    info!(addr = %config.http_addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
