// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Run orchestration.
//!
//! [`RunOrchestrator`] owns the run lifecycle:
//!
//! - **submit** stages inputs synchronously (download, then extract) and
//!   schedules the calculation on the background pool. It returns as soon as
//!   the run is accepted.
//! - **progress** reads the run's record.
//! - **finalize** packages the outputs of a finished run, uploads them and
//!   reclaims the run's local storage.
//!
//! # Storage Layout
//!
//! ```text
//! {data_dir}/
//! ├── {run_id}/                      # run input directory
//! │   ├── {run_id}_input.zip         # downloaded archive
//! │   └── {name}.csv                 # extracted inputs
//! └── output/
//!     └── {run_id}/                  # run output directory
//!         ├── {output}.csv
//!         └── {run_id}_results.zip   # packaged at finalize
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use mindservice_core::blob::HttpBlobTransfer;
//! use mindservice_core::orchestrator::{RunOrchestrator, SubmitRequest};
//!
//! let orchestrator = RunOrchestrator::builder()
//!     .data_dir("/var/lib/mindservice")
//!     .transfer(Arc::new(HttpBlobTransfer::new()))
//!     .max_concurrent_runs(4)
//!     .build();
//!
//! let run_id = orchestrator
//!     .submit(SubmitRequest {
//!         calculation_name: "doubleMatrix".into(),
//!         input_archive_url: "https://acct.blob.core.windows.net/in/data.zip?sv=...".into(),
//!         input_files: vec!["a".into(), "b".into()],
//!         output_files: vec!["result".into()],
//!     })
//!     .await?;
//! ```

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::archive::{self, ArchiveError};
use crate::blob::{BlobTransfer, HttpBlobTransfer, redact_url};
use crate::calculation::CalculationRegistry;
use crate::error::{Result, RunError};
use crate::pipeline::{CalculationJob, CalculationPipeline};
use crate::status::{FinalizeClaim, RunRecord, RunStatusTable};
use crate::table::{TABLE_SUFFIX, is_table_file};

/// Default number of calculations running at the same time.
pub const DEFAULT_MAX_CONCURRENT_RUNS: usize = 4;

/// Convert a path to absolute if it's relative.
fn ensure_absolute_path(path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(&path))
            .unwrap_or(path)
    }
}

/// Locations of run-scoped files under the data directory.
#[derive(Debug, Clone)]
pub struct RunLayout {
    data_dir: PathBuf,
}

impl RunLayout {
    /// Create a layout rooted at `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Root of all run-scoped storage.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory holding a run's downloaded archive and extracted inputs.
    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.data_dir.join(run_id)
    }

    /// Where a run's input archive is downloaded.
    pub fn input_archive_path(&self, run_id: &str) -> PathBuf {
        self.run_dir(run_id).join(format!("{}_input.zip", run_id))
    }

    /// Directory receiving a run's output tables.
    pub fn output_dir(&self, run_id: &str) -> PathBuf {
        self.data_dir.join("output").join(run_id)
    }

    /// Where a run's results archive is built.
    pub fn results_archive_path(&self, run_id: &str) -> PathBuf {
        self.output_dir(run_id)
            .join(format!("{}_results.zip", run_id))
    }
}

/// Request to start a run.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    /// Name of a registered calculation.
    pub calculation_name: String,
    /// URL of the input zip archive.
    pub input_archive_url: String,
    /// Logical names of the input tables, in merge order.
    pub input_files: Vec<String>,
    /// Names of the output tables to produce.
    pub output_files: Vec<String>,
}

/// Outcome of a successful finalize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedRun {
    /// Run ID.
    pub run_id: String,
    /// Where the results archive was uploaded.
    pub result_url: String,
}

/// Builder for creating a [`RunOrchestrator`].
pub struct RunOrchestratorBuilder {
    data_dir: PathBuf,
    transfer: Option<Arc<dyn BlobTransfer>>,
    calculations: CalculationRegistry,
    status: Option<Arc<RunStatusTable>>,
    max_concurrent_runs: usize,
}

impl Default for RunOrchestratorBuilder {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".data"),
            transfer: None,
            calculations: CalculationRegistry::with_defaults(),
            status: None,
            max_concurrent_runs: DEFAULT_MAX_CONCURRENT_RUNS,
        }
    }
}

impl RunOrchestratorBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the root of run-scoped storage.
    ///
    /// Default: `.data`
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Set the blob transfer backend.
    ///
    /// Default: [`HttpBlobTransfer`]
    pub fn transfer(mut self, transfer: Arc<dyn BlobTransfer>) -> Self {
        self.transfer = Some(transfer);
        self
    }

    /// Set the allowed calculations.
    ///
    /// Default: [`CalculationRegistry::with_defaults`]
    pub fn calculations(mut self, calculations: CalculationRegistry) -> Self {
        self.calculations = calculations;
        self
    }

    /// Share an existing status table.
    pub fn status_table(mut self, status: Arc<RunStatusTable>) -> Self {
        self.status = Some(status);
        self
    }

    /// Set how many calculations may run at the same time. Further runs wait
    /// for a free slot with `progress=0`.
    ///
    /// Default: 4
    pub fn max_concurrent_runs(mut self, max: usize) -> Self {
        self.max_concurrent_runs = max.max(1);
        self
    }

    /// Build the orchestrator.
    pub fn build(self) -> RunOrchestrator {
        let status = self
            .status
            .unwrap_or_else(|| Arc::new(RunStatusTable::new()));
        let transfer = self
            .transfer
            .unwrap_or_else(|| Arc::new(HttpBlobTransfer::new()));

        RunOrchestrator {
            layout: RunLayout::new(ensure_absolute_path(self.data_dir)),
            pipeline: CalculationPipeline::new(status.clone()),
            status,
            transfer,
            calculations: self.calculations,
            permits: Arc::new(Semaphore::new(self.max_concurrent_runs)),
        }
    }
}

/// Drives runs from submission to finalize.
pub struct RunOrchestrator {
    layout: RunLayout,
    status: Arc<RunStatusTable>,
    transfer: Arc<dyn BlobTransfer>,
    calculations: CalculationRegistry,
    pipeline: CalculationPipeline,
    permits: Arc<Semaphore>,
}

impl RunOrchestrator {
    /// Create a new builder.
    pub fn builder() -> RunOrchestratorBuilder {
        RunOrchestratorBuilder::new()
    }

    /// Storage layout used by this orchestrator.
    pub fn layout(&self) -> &RunLayout {
        &self.layout
    }

    /// Shared status table.
    pub fn status_table(&self) -> &Arc<RunStatusTable> {
        &self.status
    }

    /// Accept a run: stage its inputs and schedule its calculation.
    ///
    /// Blocks on the download and extraction; does not wait for the
    /// calculation. On staging failure the run directory is removed and no
    /// run is recorded.
    pub async fn submit(&self, request: SubmitRequest) -> Result<String> {
        let calculation = self
            .calculations
            .get(&request.calculation_name)
            .ok_or_else(|| RunError::UnknownCalculation(request.calculation_name.clone()))?;
        for name in &request.output_files {
            validate_output_name(name)?;
        }

        let mut run_id = Uuid::new_v4().to_string();
        while self.status.contains(&run_id) {
            run_id = Uuid::new_v4().to_string();
        }

        let run_dir = self.layout.run_dir(&run_id);
        tokio::fs::create_dir_all(&run_dir).await?;

        let inputs = match self.stage_inputs(&run_id, &request).await {
            Ok(inputs) => inputs,
            Err(e) => {
                warn!(run_id = %run_id, error = %e, "Staging failed");
                remove_dir_best_effort(&run_dir).await;
                return Err(e);
            }
        };

        self.status.register(&run_id);
        info!(
            run_id = %run_id,
            calculation = %request.calculation_name,
            inputs = inputs.len(),
            outputs = request.output_files.len(),
            "Run accepted"
        );

        self.spawn_calculation(CalculationJob {
            run_id: run_id.clone(),
            calculation,
            inputs,
            output_dir: self.layout.output_dir(&run_id),
            outputs: request.output_files,
        });

        Ok(run_id)
    }

    async fn stage_inputs(&self, run_id: &str, request: &SubmitRequest) -> Result<Vec<PathBuf>> {
        let archive_path = self.layout.input_archive_path(run_id);
        let bytes = self
            .transfer
            .download(&request.input_archive_url, &archive_path)
            .await
            .map_err(|e| RunError::Staging(e.to_string()))?;

        debug!(
            run_id = %run_id,
            url = %redact_url(&request.input_archive_url),
            bytes,
            "Input archive downloaded"
        );

        let run_dir = self.layout.run_dir(run_id);
        let names = request.input_files.clone();
        let extracted = tokio::task::spawn_blocking(move || {
            archive::extract_entries(&archive_path, &run_dir, &names, TABLE_SUFFIX)
        })
        .await
        .map_err(|e| RunError::Staging(format!("extraction task failed: {}", e)))?;

        match extracted {
            Ok(paths) => Ok(paths),
            Err(ArchiveError::MissingEntries(missing)) => Err(RunError::MissingEntries(missing)),
            Err(e) => Err(RunError::Staging(e.to_string())),
        }
    }

    fn spawn_calculation(&self, job: CalculationJob) {
        let pipeline = self.pipeline.clone();
        let status = self.status.clone();
        let permits = self.permits.clone();

        tokio::spawn(async move {
            // The semaphore is never closed, so acquiring only waits.
            let _permit = permits.acquire_owned().await.ok();
            let run_id = job.run_id.clone();

            if let Err(e) = tokio::task::spawn_blocking(move || pipeline.run(&job)).await {
                error!(run_id = %run_id, error = %e, "Calculation task aborted");
                status.fail(&run_id, format!("Calculation task aborted: {}", e));
            }
        });
    }

    /// Read a run's current record.
    pub fn progress(&self, run_id: &str) -> Result<RunRecord> {
        self.status
            .get(run_id)
            .ok_or_else(|| RunError::UnknownRun(run_id.to_string()))
    }

    /// Package, upload and clean up the outputs of a finished run.
    ///
    /// Only one finalize of a run proceeds at a time; a concurrent or repeated
    /// call, or one on a failed run, fails with [`RunError::NoOutput`] before
    /// touching any file. Cleanup after a successful upload is best effort:
    /// failures are logged and never turn the finalize into an error.
    pub async fn finalize(&self, run_id: &str, result_url: &str) -> Result<FinalizedRun> {
        match self.status.claim_finalize(run_id) {
            FinalizeClaim::Claimed => {}
            FinalizeClaim::UnknownRun => return Err(RunError::UnknownRun(run_id.to_string())),
            refused => {
                return Err(RunError::NoOutput {
                    run_id: run_id.to_string(),
                    reason: refused.reason().to_string(),
                });
            }
        }
        // Released on every exit, including a dropped request.
        let _claim = ClaimGuard {
            status: &self.status,
            run_id,
        };

        let output_dir = self.layout.output_dir(run_id);
        let outputs = list_output_files(run_id, &output_dir).await?;
        let archive_path = self.layout.results_archive_path(run_id);
        let size = self.package(&outputs, &archive_path).await?;

        self.transfer
            .upload(&archive_path, result_url)
            .await
            .map_err(|e| RunError::Upload(e.to_string()))?;

        self.status.attach_result(run_id, result_url);
        info!(
            run_id = %run_id,
            url = %redact_url(result_url),
            files = outputs.len(),
            bytes = size,
            "Run results uploaded"
        );

        self.reclaim(run_id, &archive_path, &outputs).await;

        Ok(FinalizedRun {
            run_id: run_id.to_string(),
            result_url: result_url.to_string(),
        })
    }

    /// Zip `outputs` into `archive_path`, removing a partial archive on failure.
    async fn package(&self, outputs: &[PathBuf], archive_path: &Path) -> Result<u64> {
        let package_path = archive_path.to_path_buf();
        let package_inputs = outputs.to_vec();
        let packaged =
            tokio::task::spawn_blocking(move || archive::create_archive(&package_inputs, &package_path))
                .await
                .map_err(|e| RunError::Packaging(e.to_string()))
                .and_then(|r| r.map_err(|e| RunError::Packaging(e.to_string())));

        if packaged.is_err() {
            remove_file_best_effort(archive_path).await;
        }
        packaged
    }

    /// Remove everything a run left on disk. Each step runs even if an
    /// earlier one failed.
    async fn reclaim(&self, run_id: &str, archive_path: &Path, outputs: &[PathBuf]) {
        remove_file_best_effort(archive_path).await;
        for output in outputs {
            remove_file_best_effort(output).await;
        }
        remove_dir_best_effort(&self.layout.output_dir(run_id)).await;
        remove_dir_best_effort(&self.layout.run_dir(run_id)).await;

        debug!(run_id = %run_id, "Run storage reclaimed");
    }
}

struct ClaimGuard<'a> {
    status: &'a RunStatusTable,
    run_id: &'a str,
}

impl Drop for ClaimGuard<'_> {
    fn drop(&mut self) {
        self.status.release_finalize(self.run_id);
    }
}

/// Output names become file names directly inside the run's output
/// directory; anything that could resolve elsewhere is rejected.
fn validate_output_name(name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    let plain = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );

    if plain && !name.contains(['/', '\\']) {
        Ok(())
    } else {
        Err(RunError::InvalidOutputName(name.to_string()))
    }
}

/// Output tables of a run, sorted by path.
async fn list_output_files(run_id: &str, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let no_output = |reason: &str| RunError::NoOutput {
        run_id: run_id.to_string(),
        reason: reason.to_string(),
    };

    let mut entries = match tokio::fs::read_dir(output_dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(no_output("output directory does not exist"));
        }
        Err(e) => return Err(e.into()),
    };

    let mut outputs = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_output = entry.file_type().await?.is_file()
            && is_table_file(&entry.file_name().to_string_lossy());
        if is_output {
            outputs.push(path);
        }
    }

    if outputs.is_empty() {
        return Err(no_output("no output files found"));
    }

    outputs.sort();
    Ok(outputs)
}

async fn remove_file_best_effort(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove file"),
    }
}

async fn remove_dir_best_effort(path: &Path) {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove directory"),
    }
}
