//! Error taxonomy for the scan pipeline.
//!
//! Structural failures (connection, extraction, sampling a table,
//! persistence) abort a scan run and are stored verbatim on the run
//! record. Statistic-level failures never surface here: the profiler
//! degrades the affected field to absent instead.

use crate::models::EngineKind;

/// Errors produced by connectors, the orchestrator and the read accessors.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// The data source is unreachable or rejected the credentials.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A catalog query is unsupported or returned malformed data.
    #[error("schema extraction failed: {0}")]
    Extraction(String),

    /// Row sampling for a table failed.
    #[error("sampling failed: {0}")]
    Sampling(String),

    /// A referenced run, table, document or data source does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A stub connector was invoked.
    #[error("unsupported engine: {0}")]
    UnsupportedEngine(EngineKind),

    /// The metadata store failed.
    #[error("persistence failed: {0}")]
    Persistence(#[from] anyhow::Error),

    /// The run was terminalized as `failed`; `source` is the cause that
    /// was stored on the run record.
    #[error("scan run {scan_run_id} failed: {source}")]
    RunFailed {
        scan_run_id: i64,
        #[source]
        source: Box<ScanError>,
    },
}

impl ScanError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ScanError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// The id of the failed run, when this error terminalized one.
    pub fn scan_run_id(&self) -> Option<i64> {
        match self {
            ScanError::RunFailed { scan_run_id, .. } => Some(*scan_run_id),
            _ => None,
        }
    }
}

pub type ScanResult<T> = Result<T, ScanError>;
