// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for mindservice-server integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Read, Write};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use mindservice_core::RunOrchestrator;
use mindservice_core::blob::MockBlobTransfer;
use mindservice_server::auth::{ClientCredentials, TokenIssuer};
use mindservice_server::{AppState, router};
use serde_json::{Value, json};
use tower::ServiceExt;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

pub const CLIENT_ID: &str = "test-client";
pub const CLIENT_SECRET: &str = "test-secret";
pub const JWT_SECRET: &[u8] = b"test-signing-key";

pub const INPUT_URL: &str = "https://acct.blob.core.windows.net/in/data.zip?sig=input";
pub const RESULT_URL: &str = "https://acct.blob.core.windows.net/out/result.zip?sig=output";

/// Build a zip archive in memory.
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut buffer);
        for (name, content) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    buffer.into_inner()
}

/// Read every entry of an in-memory zip archive, sorted by name.
pub fn unzip(bytes: &[u8]) -> Vec<(String, String)> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).unwrap();
        let mut content = String::new();
        file.read_to_string(&mut content).unwrap();
        entries.push((file.name().to_string(), content));
    }
    entries.sort();
    entries
}

/// Test context: the router over a temp data dir and a mock blob store.
pub struct TestApp {
    pub app: Router,
    pub transfer: MockBlobTransfer,
    pub temp_dir: tempfile::TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let transfer = MockBlobTransfer::new();

        let orchestrator = RunOrchestrator::builder()
            .data_dir(temp_dir.path())
            .transfer(Arc::new(transfer.clone()))
            .build();

        let state = Arc::new(AppState {
            orchestrator,
            tokens: TokenIssuer::new(JWT_SECRET, 12),
            credentials: ClientCredentials::new(CLIENT_ID, CLIENT_SECRET),
        });

        Self {
            app: router(state),
            transfer,
            temp_dir,
        }
    }

    /// Send a request and decode the JSON response body.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    /// Obtain a valid access token.
    pub async fn token(&self) -> String {
        let (status, body) = self
            .send(post_json(
                "/MindGetToken",
                None,
                json!({"client_id": CLIENT_ID, "client_secret": CLIENT_SECRET}),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        body["access_token"].as_str().unwrap().to_string()
    }

    pub async fn put_input(&self, entries: &[(&str, &str)]) {
        self.transfer.put_object(INPUT_URL, zip_bytes(entries)).await;
    }

    /// Poll progress until the run is done.
    pub async fn wait_until_done(&self, token: &str, run_id: &str) -> Value {
        for _ in 0..500 {
            let (status, body) = self.send(progress_request(Some(token), run_id)).await;
            assert_eq!(status, StatusCode::OK);
            if body["done"] == Value::Bool(true) {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("run {} did not finish in time", run_id);
    }
}

pub fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn progress_request(token: Option<&str>, run_id: &str) -> Request<Body> {
    get(&format!("/MindRunProgress?runId={}", run_id), token)
}

pub fn run_body(calculation: &str, inputs: &[&str], outputs: &[&str]) -> Value {
    json!({
        "calculationName": calculation,
        "inputZipUrl": INPUT_URL,
        "inputFiles": inputs,
        "outputFiles": outputs,
    })
}
