// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Run status table.
//!
//! The single source of truth for run progress. It is shared between the
//! request path and the background computation tasks; every operation locks
//! only the shard holding the run, so updates to different runs never block
//! each other and a reader never sees a half-written record.

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};

/// Progress value of a run that reached a terminal state.
pub const PROGRESS_COMPLETE: u8 = 100;

/// Progress record for a single run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Percentage in `0..=100`, never decreasing while the run is active.
    pub progress: u8,
    /// Whether the run reached a terminal state (success or failure).
    pub done: bool,
    /// Diagnostic text when the run terminated abnormally.
    pub error: Option<String>,
    /// Location of the finalized result, set by finalize.
    pub result: Option<String>,
}

impl RunRecord {
    /// Record of a freshly submitted run.
    pub fn pending() -> Self {
        Self::default()
    }

    /// Check if the run terminated with an error.
    pub fn is_failed(&self) -> bool {
        self.done && self.error.is_some()
    }
}

/// Outcome of [`RunStatusTable::claim_finalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeClaim {
    /// The caller now owns the finalize of this run.
    Claimed,
    /// The run ID was never registered.
    UnknownRun,
    /// The run has not reached a terminal state.
    NotFinished,
    /// The run terminated with an error.
    Failed,
    /// Another finalize of this run is in progress.
    InProgress,
    /// The run already has a result attached.
    AlreadyFinalized,
}

impl FinalizeClaim {
    /// Why the claim was refused.
    pub fn reason(&self) -> &'static str {
        match self {
            FinalizeClaim::Claimed => "claimed",
            FinalizeClaim::UnknownRun => "unknown run",
            FinalizeClaim::NotFinished => "run has not finished",
            FinalizeClaim::Failed => "run failed",
            FinalizeClaim::InProgress => "finalize already in progress",
            FinalizeClaim::AlreadyFinalized => "run already finalized",
        }
    }
}

/// Concurrent mapping from run ID to [`RunRecord`].
#[derive(Debug, Default)]
pub struct RunStatusTable {
    runs: DashMap<String, RunRecord>,
    finalizing: DashSet<String>,
}

impl RunStatusTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new run with `progress=0, done=false`.
    ///
    /// Returns false if the run ID is already known; the existing record is
    /// left untouched.
    pub fn register(&self, run_id: &str) -> bool {
        match self.runs.entry(run_id.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(RunRecord::pending());
                true
            }
        }
    }

    /// Get a snapshot of a run's record.
    pub fn get(&self, run_id: &str) -> Option<RunRecord> {
        self.runs.get(run_id).map(|r| r.value().clone())
    }

    /// Check if a run ID was ever registered.
    pub fn contains(&self, run_id: &str) -> bool {
        self.runs.contains_key(run_id)
    }

    /// Replace a run's record as a whole.
    pub fn set(&self, run_id: &str, record: RunRecord) {
        self.runs.insert(run_id.to_string(), record);
    }

    /// Advance the progress of an active run.
    ///
    /// Ignored for unknown or finished runs, and for values lower than the
    /// current progress. Returns whether the record changed.
    pub fn report_progress(&self, run_id: &str, progress: u8) -> bool {
        let progress = progress.min(PROGRESS_COMPLETE);
        self.update_active(run_id, |record| {
            if progress > record.progress {
                record.progress = progress;
                true
            } else {
                false
            }
        })
    }

    /// Mark an active run as successfully finished.
    pub fn complete(&self, run_id: &str) -> bool {
        self.update_active(run_id, |record| {
            record.progress = PROGRESS_COMPLETE;
            record.done = true;
            true
        })
    }

    /// Mark an active run as finished with an error.
    pub fn fail(&self, run_id: &str, error: impl Into<String>) -> bool {
        let error = error.into();
        self.update_active(run_id, move |record| {
            record.progress = PROGRESS_COMPLETE;
            record.done = true;
            record.error = Some(error);
            true
        })
    }

    /// Attach the finalized result location to a run.
    ///
    /// This is the only mutation allowed after the run is done. It leaves the
    /// run done.
    /// Also ends any finalize claim on the run.
    pub fn attach_result(&self, run_id: &str, result: impl Into<String>) -> bool {
        match self.runs.get_mut(run_id) {
            Some(mut record) => {
                record.done = true;
                record.result = Some(result.into());
                self.finalizing.remove(run_id);
                true
            }
            None => false,
        }
    }

    /// Claim exclusive finalize of a successfully finished run.
    ///
    /// Checked and claimed while holding the run's entry, so of two
    /// concurrent callers exactly one gets [`FinalizeClaim::Claimed`]. The
    /// claim ends with [`attach_result`](Self::attach_result) or
    /// [`release_finalize`](Self::release_finalize).
    pub fn claim_finalize(&self, run_id: &str) -> FinalizeClaim {
        let Some(record) = self.runs.get_mut(run_id) else {
            return FinalizeClaim::UnknownRun;
        };

        if !record.done {
            FinalizeClaim::NotFinished
        } else if record.error.is_some() {
            FinalizeClaim::Failed
        } else if record.result.is_some() {
            FinalizeClaim::AlreadyFinalized
        } else if !self.finalizing.insert(run_id.to_string()) {
            FinalizeClaim::InProgress
        } else {
            FinalizeClaim::Claimed
        }
    }

    /// Give up a finalize claim without attaching a result.
    pub fn release_finalize(&self, run_id: &str) {
        self.finalizing.remove(run_id);
    }

    /// Number of known runs.
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Check if no run was ever registered.
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    fn update_active(&self, run_id: &str, apply: impl FnOnce(&mut RunRecord) -> bool) -> bool {
        match self.runs.get_mut(run_id) {
            Some(mut record) if !record.done => apply(record.value_mut()),
            _ => false,
        }
    }
}
