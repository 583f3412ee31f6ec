// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! HTTP handlers.
//!
//! Request and response bodies keep the camelCase field names clients
//! already use (`calculationName`, `inputZipUrl`, `runId`, `resultSas`).

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use mindservice_core::orchestrator::SubmitRequest;
use mindservice_core::status::RunRecord;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::AuthenticatedClient;
use crate::error::ApiError;
use crate::server::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"`.
    pub status: String,
    /// Server version.
    pub version: String,
}

/// Token request.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    /// Client id.
    pub client_id: String,
    /// Client secret.
    pub client_secret: String,
}

/// Token response.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Signed bearer token.
    pub access_token: String,
    /// Always `"bearer"`.
    pub token_type: String,
}

/// Run submission request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    /// Name of the calculation to run.
    pub calculation_name: String,
    /// SAS URL of the input zip archive.
    pub input_zip_url: String,
    /// Logical names of the input tables.
    pub input_files: Vec<String>,
    /// Names of the output tables.
    pub output_files: Vec<String>,
}

/// Run submission response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResponse {
    /// Identifier to poll with.
    pub run_id: String,
}

/// Progress query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressQuery {
    /// Run to inspect.
    pub run_id: String,
}

/// Finalize request, echoed back on success.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadCloseRequest {
    /// Run to finalize.
    pub run_id: String,
    /// SAS URL the results archive is uploaded to.
    pub result_sas: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// `GET /health`
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `POST /MindGetToken`
pub async fn get_token(
    State(state): State<Arc<AppState>>,
    request: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Json(request) = request?;

    if !state
        .credentials
        .matches(&request.client_id, &request.client_secret)
    {
        warn!(client_id = %request.client_id, "Rejected token request");
        return Err(ApiError::Unauthorized("Bad credentials".to_string()));
    }

    let access_token = state.tokens.issue(&request.client_id)?;
    info!(client_id = %request.client_id, "Token issued");

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer".to_string(),
    }))
}

/// `POST /MindRunAsync`
pub async fn run_async(
    State(state): State<Arc<AppState>>,
    client: AuthenticatedClient,
    request: Result<Json<RunRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RunResponse>), ApiError> {
    let Json(request) = request?;

    let run_id = state
        .orchestrator
        .submit(SubmitRequest {
            calculation_name: request.calculation_name,
            input_archive_url: request.input_zip_url,
            input_files: request.input_files,
            output_files: request.output_files,
        })
        .await?;

    info!(client_id = %client.client_id, run_id = %run_id, "Run submitted");
    Ok((StatusCode::OK, Json(RunResponse { run_id })))
}

/// `GET /MindRunProgress?runId=...`
pub async fn run_progress(
    State(state): State<Arc<AppState>>,
    _client: AuthenticatedClient,
    query: Result<Query<ProgressQuery>, QueryRejection>,
) -> Result<Json<RunRecord>, ApiError> {
    let Query(query) = query?;
    Ok(Json(state.orchestrator.progress(&query.run_id)?))
}

/// `POST /MindUploadClose`
pub async fn upload_close(
    State(state): State<Arc<AppState>>,
    client: AuthenticatedClient,
    request: Result<Json<UploadCloseRequest>, JsonRejection>,
) -> Result<Json<UploadCloseRequest>, ApiError> {
    let Json(request) = request?;

    let finalized = state
        .orchestrator
        .finalize(&request.run_id, &request.result_sas)
        .await?;

    info!(client_id = %client.client_id, run_id = %finalized.run_id, "Run closed");
    Ok(Json(UploadCloseRequest {
        run_id: finalized.run_id,
        result_sas: finalized.result_url,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_request_uses_camel_case() {
        let json = r#"{
            "calculationName": "doubleMatrix",
            "inputZipUrl": "https://acct.blob.core.windows.net/in/data.zip?sig=x",
            "inputFiles": ["a", "b"],
            "outputFiles": ["result"]
        }"#;

        let request: RunRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.calculation_name, "doubleMatrix");
        assert_eq!(request.input_files, vec!["a", "b"]);
        assert_eq!(request.output_files, vec!["result"]);
    }

    #[test]
    fn test_upload_close_serialization() {
        let body = UploadCloseRequest {
            run_id: "r1".to_string(),
            result_sas: "https://host/out.zip".to_string(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["runId"], "r1");
        assert_eq!(json["resultSas"], "https://host/out.zip");
    }

    #[tokio::test]
    async fn test_health() {
        let Json(response) = health().await;
        assert_eq!(response.status, "ok");
        assert_eq!(response.version, env!("CARGO_PKG_VERSION"));
    }
}
