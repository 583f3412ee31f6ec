// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! API error type and its HTTP mapping.
//!
//! Every error response has the body `{"detail": "<message>"}`.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use mindservice_core::RunError;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error};

/// Errors returned by API handlers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// Missing, malformed, expired or badly signed credential.
    #[error("{0}")]
    Unauthorized(String),

    /// The request could not be parsed.
    #[error("{detail}")]
    InvalidRequest {
        /// Status chosen by the extractor.
        status: StatusCode,
        /// Parser message.
        detail: String,
    },

    /// Run lifecycle failure.
    #[error(transparent)]
    Run(#[from] RunError),

    /// Token could not be signed.
    #[error("Failed to issue token: {0}")]
    Token(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub detail: String,
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::InvalidRequest { status, .. } => *status,
            ApiError::Run(e) => match e {
                RunError::NoOutput { .. } => StatusCode::NOT_FOUND,
                e if e.is_client_error() => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Token(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidRequest {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidRequest {
            status: rejection.status(),
            detail: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %detail, "Request failed");
        } else {
            debug!(status = status.as_u16(), error = %detail, "Request rejected");
        }

        (status, Json(ErrorBody { detail })).into_response()
    }
}
