//! `edda scan`: run the scan pipeline for one configured data source.

use anyhow::{bail, Result};
use serde::Serialize;

use edda_core::models::{ScanMode, ScanStatus};
use edda_core::scan::{ScanRequest, Scanner};
use edda_core::store::Store;

use crate::config::Config;
use crate::datasources::register_configured;
use crate::progress::ProgressMode;
use crate::registry::ConnectorRegistry;

/// Outcome printed after a scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub scan_run_id: i64,
    pub data_source: String,
    pub status: ScanStatus,
    pub tables: usize,
    pub fingerprint: Option<String>,
    pub error: Option<String>,
}

/// Resolve the effective sample size against the configured bounds.
pub fn effective_sample_size(config: &Config, requested: Option<u32>) -> Result<u32> {
    let size = requested.unwrap_or(config.scan.default_sample_size);
    if size == 0 {
        bail!("--sample-size must be > 0");
    }
    if size > config.scan.max_sample_size {
        bail!(
            "--sample-size {} exceeds scan.max_sample_size ({})",
            size,
            config.scan.max_sample_size
        );
    }
    Ok(size)
}

pub async fn run_scan(
    store: &dyn Store,
    config: &Config,
    registry: &ConnectorRegistry,
    name: &str,
    mode: Option<ScanMode>,
    sample_size: Option<u32>,
    progress: ProgressMode,
) -> Result<ScanSummary> {
    let sample_size = effective_sample_size(config, sample_size)?;
    let source = register_configured(store, config, name).await?;
    let request = ScanRequest {
        data_source_id: source.id,
        mode: mode.unwrap_or(config.scan.default_mode),
        sample_size,
    };

    let reporter = progress.reporter();
    let scan_run_id = match Scanner::new(store, registry)
        .start_scan(request, reporter.as_ref())
        .await
    {
        Ok(id) => id,
        Err(e) => match e.scan_run_id() {
            Some(id) => id,
            None => return Err(e.into()),
        },
    };

    let run = edda_core::catalog::scan_status(store, scan_run_id).await?;
    let tables = store.list_tables(scan_run_id).await?.len();
    Ok(ScanSummary {
        scan_run_id,
        data_source: source.name,
        status: run.status,
        tables,
        fingerprint: run.fingerprint,
        error: run.error,
    })
}

pub fn print_summary(summary: &ScanSummary) {
    match summary.status {
        ScanStatus::Completed => println!(
            "Scan {} of '{}' completed: {} tables, fingerprint {}",
            summary.scan_run_id,
            summary.data_source,
            summary.tables,
            summary.fingerprint.as_deref().unwrap_or("-")
        ),
        _ => println!(
            "Scan {} of '{}' {}: {}",
            summary.scan_run_id,
            summary.data_source,
            summary.status,
            summary.error.as_deref().unwrap_or("unknown error")
        ),
    }
}
