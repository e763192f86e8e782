//! Scan progress events.
//!
//! The orchestrator reports what it is doing through a
//! [`ScanProgressReporter`]; rendering (human, JSON lines) lives in the
//! `edda` binary so this crate stays free of terminal concerns.

use crate::models::ScanStatus;

/// A single progress event for one scan run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScanProgressEvent {
    /// Catalog queries are running. Table count unknown.
    Extracting { scan_run_id: i64 },
    /// Table `n` of `total` is being sampled, profiled and documented.
    Profiling {
        scan_run_id: i64,
        table: String,
        n: u64,
        total: u64,
    },
    /// The run reached a terminal state.
    Finished {
        scan_run_id: i64,
        status: ScanStatus,
    },
}

/// Receives progress events. Called from the scan loop.
pub trait ScanProgressReporter: Send + Sync {
    fn report(&self, event: ScanProgressEvent);
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ScanProgressReporter for NoProgress {
    fn report(&self, _event: ScanProgressEvent) {}
}
