// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for mindservice-core integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Read, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use async_trait::async_trait;
use mindservice_core::blob::{self, BlobTransfer, MockBlobTransfer};
use mindservice_core::calculation::{Calculation, CalculationError, CalculationRegistry};
use mindservice_core::orchestrator::{RunOrchestrator, SubmitRequest};
use mindservice_core::status::RunRecord;
use mindservice_core::table::Table;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// URL the input archive is stored under in the mock store.
pub const INPUT_URL: &str = "https://acct.blob.core.windows.net/in/data.zip?sig=input";
/// URL results are uploaded to in the mock store.
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

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn submit_request(calculation: &str, inputs: &[&str], outputs: &[&str]) -> SubmitRequest {
    SubmitRequest {
        calculation_name: calculation.to_string(),
        input_archive_url: INPUT_URL.to_string(),
        input_files: strings(inputs),
        output_files: strings(outputs),
    }
}

/// Test context: a temp data dir, a mock blob store and an orchestrator.
pub struct TestContext {
    pub orchestrator: RunOrchestrator,
    pub transfer: MockBlobTransfer,
    pub temp_dir: tempfile::TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with(MockBlobTransfer::new(), CalculationRegistry::with_defaults(), 4)
    }

    pub fn with(
        transfer: MockBlobTransfer,
        calculations: CalculationRegistry,
        max_concurrent_runs: usize,
    ) -> Self {
        Self::with_backend(
            Arc::new(transfer.clone()),
            transfer,
            calculations,
            max_concurrent_runs,
        )
    }

    /// Use `backend` for transfers; `transfer` is the store tests inspect.
    pub fn with_backend(
        backend: Arc<dyn BlobTransfer>,
        transfer: MockBlobTransfer,
        calculations: CalculationRegistry,
        max_concurrent_runs: usize,
    ) -> Self {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let orchestrator = RunOrchestrator::builder()
            .data_dir(temp_dir.path())
            .transfer(backend)
            .calculations(calculations)
            .max_concurrent_runs(max_concurrent_runs)
            .build();

        Self {
            orchestrator,
            transfer,
            temp_dir,
        }
    }

    pub async fn put_input(&self, entries: &[(&str, &str)]) {
        self.transfer.put_object(INPUT_URL, zip_bytes(entries)).await;
    }

    /// Number of entries directly under the data dir.
    pub fn data_dir_entries(&self) -> usize {
        std::fs::read_dir(self.temp_dir.path()).unwrap().count()
    }

    /// Poll until the run is done, collecting every observed progress value.
    pub async fn wait_until_done(&self, run_id: &str) -> (RunRecord, Vec<u8>) {
        let mut observed = Vec::new();
        for _ in 0..500 {
            let record = self.orchestrator.progress(run_id).unwrap();
            observed.push(record.progress);
            if record.done {
                return (record, observed);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("run {} did not finish in time", run_id);
    }
}

/// Calculation that blocks until released, then passes the table through.
pub struct GatedCalculation {
    release: Mutex<mpsc::Receiver<()>>,
}

impl GatedCalculation {
    pub fn new() -> (Self, mpsc::Sender<()>) {
        let (tx, rx) = mpsc::channel();
        (
            Self {
                release: Mutex::new(rx),
            },
            tx,
        )
    }
}

impl Calculation for GatedCalculation {
    fn name(&self) -> &'static str {
        "gated"
    }

    fn transform(&self, table: Table) -> Result<Table, CalculationError> {
        let release = self.release.lock().unwrap();
        release
            .recv_timeout(Duration::from_secs(10))
            .map_err(|e| CalculationError::Other(e.to_string()))?;
        Ok(table)
    }
}

/// Calculation that panics.
pub struct PanickingCalculation;

impl Calculation for PanickingCalculation {
    fn name(&self) -> &'static str {
        "panicking"
    }

    fn transform(&self, _table: Table) -> Result<Table, CalculationError> {
        panic!("calculation blew up");
    }
}

/// Upload backend that leaves a non-empty directory where the uploaded
/// archive was, so removing the archive file afterwards fails.
pub struct ArchiveSwappingTransfer {
    pub inner: MockBlobTransfer,
}

#[async_trait]
impl BlobTransfer for ArchiveSwappingTransfer {
    fn transfer_type(&self) -> &'static str {
        "archive-swapping"
    }

    async fn download(&self, source_url: &str, destination: &Path) -> blob::Result<u64> {
        self.inner.download(source_url, destination).await
    }

    async fn upload(&self, source: &Path, destination_url: &str) -> blob::Result<u64> {
        let size = self.inner.upload(source, destination_url).await?;
        std::fs::remove_file(source)?;
        std::fs::create_dir(source)?;
        std::fs::write(source.join("blocker"), b"x")?;
        Ok(size)
    }
}
