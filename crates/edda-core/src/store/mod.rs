//! Storage abstraction for Edda's metadata catalog.
//!
//! The [`Store`] trait defines every persistence operation the scan
//! orchestrator, the read accessors and the question matcher need,
//! enabling pluggable backends (SQLite in the `edda` crate, in-memory
//! here for tests).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//! Identities are auto-assigned integers. Uniqueness follows the data
//! model: tables per (run, schema, name), columns per (table, name),
//! metrics and docs one-to-one with their table or column.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::docs::TableDoc;
use crate::models::{
    ColumnRecord, DataSource, NewDataSource, PiiRisk, RelationshipRecord, ScanMode, ScanRun,
    ScanStatus, TableDocRecord, TableMetrics, TableRecord,
};
use crate::profile::ColumnProfile;
use crate::schema::RunSchema;

/// Registered profiles are immutable: a differing re-registration is an
/// error rather than an in-place rewrite.
pub fn check_same_profile(existing: DataSource, new: &NewDataSource) -> Result<DataSource> {
    if existing.same_profile(new) {
        Ok(existing)
    } else {
        anyhow::bail!(
            "data source '{}' is already registered (id {}) with a different profile; \
             register the changed connection under a new name",
            existing.name,
            existing.id
        )
    }
}

/// Abstract metadata store.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`register_data_source`](Store::register_data_source) | Insert a connection profile by name on first use |
/// | [`create_scan_run`](Store::create_scan_run) | Start a run in `running` |
/// | [`finish_scan_run`](Store::finish_scan_run) | The single terminal transition |
/// | [`replace_run_schema`](Store::replace_run_schema) | Delete-then-insert a run's tables, columns and relationships |
/// | [`upsert_table_metrics`](Store::upsert_table_metrics) | Insert or update table metrics |
/// | [`upsert_column_metrics`](Store::upsert_column_metrics) | Insert or update column metrics |
/// | [`upsert_table_doc`](Store::upsert_table_doc) | Insert or update a table document |
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a connection profile on first use. Registering the same
    /// name again returns the stored profile unchanged, and fails when the
    /// new profile differs from it (see [`check_same_profile`]).
    async fn register_data_source(&self, ds: &NewDataSource) -> Result<DataSource>;

    async fn get_data_source(&self, id: i64) -> Result<Option<DataSource>>;

    async fn find_data_source(&self, name: &str) -> Result<Option<DataSource>>;

    async fn list_data_sources(&self) -> Result<Vec<DataSource>>;

    async fn create_scan_run(
        &self,
        data_source_id: i64,
        mode: ScanMode,
        sample_size: u32,
    ) -> Result<ScanRun>;

    async fn get_scan_run(&self, id: i64) -> Result<Option<ScanRun>>;

    /// Most recent runs first.
    async fn recent_scan_runs(&self, limit: usize) -> Result<Vec<ScanRun>>;

    async fn set_scan_fingerprint(&self, id: i64, fingerprint: &str) -> Result<()>;

    /// Move a `running` run to `status`, stamping the finish time.
    ///
    /// Returns `false` (and changes nothing) when the run is already
    /// terminal or does not exist.
    async fn finish_scan_run(&self, id: i64, status: ScanStatus, error: Option<&str>)
        -> Result<bool>;

    /// Replace all tables (with their columns, metrics and docs) and
    /// relationships of a run. Atomic where the backend supports it.
    async fn replace_run_schema(&self, scan_run_id: i64, schema: &RunSchema) -> Result<()>;

    /// Tables of a run in insertion order.
    async fn list_tables(&self, scan_run_id: i64) -> Result<Vec<TableRecord>>;

    async fn get_table(&self, table_id: i64) -> Result<Option<TableRecord>>;

    /// Columns of a table in insertion order.
    async fn list_columns(&self, table_id: i64) -> Result<Vec<ColumnRecord>>;

    /// Columns of every table of a run.
    async fn list_run_columns(&self, scan_run_id: i64) -> Result<Vec<ColumnRecord>>;

    /// Relationships of a run in stored (extraction) order.
    async fn list_relationships(&self, scan_run_id: i64) -> Result<Vec<RelationshipRecord>>;

    async fn set_column_pii(&self, column_id: i64, risk: Option<PiiRisk>) -> Result<()>;

    async fn upsert_table_metrics(&self, table_id: i64, metrics: &TableMetrics) -> Result<()>;

    async fn get_table_metrics(&self, table_id: i64) -> Result<Option<TableMetrics>>;

    async fn upsert_column_metrics(&self, column_id: i64, profile: &ColumnProfile) -> Result<()>;

    async fn get_column_metrics(&self, column_id: i64) -> Result<Option<ColumnProfile>>;

    async fn upsert_table_doc(&self, table_id: i64, doc: &TableDoc, markdown: &str) -> Result<()>;

    async fn get_table_doc(&self, table_id: i64) -> Result<Option<TableDocRecord>>;
}
