//! Core data models used throughout Edda.
//!
//! These types represent the connection profiles, scan runs and the
//! per-run catalog records that flow through the scan pipeline and are
//! read back by the accessors and the question matcher.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::docs::TableDoc;
use crate::profile::TableProfile;

/// One sampled row: column name → raw value, in the engine's column order.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Database engines a data source can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Postgres,
    Sqlserver,
    Snowflake,
}

impl EngineKind {
    pub const ALL: [EngineKind; 3] = [
        EngineKind::Postgres,
        EngineKind::Sqlserver,
        EngineKind::Snowflake,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Postgres => "postgres",
            EngineKind::Sqlserver => "sqlserver",
            EngineKind::Snowflake => "snowflake",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            EngineKind::Postgres => 5432,
            EngineKind::Sqlserver => 1433,
            EngineKind::Snowflake => 443,
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" => Ok(EngineKind::Postgres),
            "sqlserver" => Ok(EngineKind::Sqlserver),
            "snowflake" => Ok(EngineKind::Snowflake),
            other => Err(format!(
                "unknown engine '{}'. Must be postgres, sqlserver, or snowflake.",
                other
            )),
        }
    }
}

/// Connection profile as declared by the caller, before registration.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDataSource {
    pub name: String,
    pub engine: EngineKind,
    pub host: String,
    pub port: Option<u16>,
    pub database: String,
    pub schema: Option<String>,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

/// Registered connection profile. Immutable from the pipeline's view.
#[derive(Clone, PartialEq, Serialize)]
pub struct DataSource {
    pub id: i64,
    pub name: String,
    pub engine: EngineKind,
    pub host: String,
    pub port: Option<u16>,
    pub database: String,
    pub schema: Option<String>,
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub created_at: DateTime<Utc>,
}

impl DataSource {
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or_else(|| self.engine.default_port())
    }

    /// Whether `new` describes exactly this registered profile.
    pub fn same_profile(&self, new: &NewDataSource) -> bool {
        self.name == new.name
            && self.engine == new.engine
            && self.host == new.host
            && self.port == new.port
            && self.database == new.database
            && self.schema == new.schema
            && self.username == new.username
            && self.password == new.password
    }
}

impl fmt::Debug for NewDataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewDataSource")
            .field("name", &self.name)
            .field("engine", &self.engine)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl fmt::Debug for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSource")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("engine", &self.engine)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Scan mode recorded on a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    #[default]
    Quick,
    Full,
}

impl ScanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanMode::Quick => "quick",
            ScanMode::Full => "full",
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quick" => Ok(ScanMode::Quick),
            "full" => Ok(ScanMode::Full),
            other => Err(format!("unknown scan mode '{}'. Use quick or full.", other)),
        }
    }
}

/// Lifecycle of a scan run: `running → {completed, failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Running,
    Completed,
    Failed,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Running => "running",
            ScanStatus::Completed => "completed",
            ScanStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ScanStatus::Running)
    }

    /// Whether `self → to` is a legal transition.
    pub fn can_transition_to(&self, to: ScanStatus) -> bool {
        !self.is_terminal() && to.is_terminal()
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(ScanStatus::Running),
            "completed" => Ok(ScanStatus::Completed),
            "failed" => Ok(ScanStatus::Failed),
            other => Err(format!("unknown scan status '{}'", other)),
        }
    }
}

/// One execution of the pipeline against one data source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanRun {
    pub id: i64,
    pub data_source_id: i64,
    pub mode: ScanMode,
    pub status: ScanStatus,
    pub sample_size: u32,
    pub fingerprint: Option<String>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// A table captured by a scan run. Unique per (run, schema, name).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRecord {
    pub id: i64,
    pub scan_run_id: i64,
    pub schema_name: String,
    pub table_name: String,
    pub table_type: String,
    /// Catalog statistics estimate; approximate and possibly stale.
    pub row_estimate: Option<i64>,
}

impl TableRecord {
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema_name, self.table_name)
    }
}

/// Best-effort PII tag on a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PiiRisk {
    High,
    Low,
}

impl PiiRisk {
    pub fn as_str(&self) -> &'static str {
        match self {
            PiiRisk::High => "high",
            PiiRisk::Low => "low",
        }
    }
}

impl FromStr for PiiRisk {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "high" => Ok(PiiRisk::High),
            "low" => Ok(PiiRisk::Low),
            other => Err(format!("unknown pii risk '{}'", other)),
        }
    }
}

/// A column of a [`TableRecord`]. Unique per (table, column name).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnRecord {
    pub id: i64,
    pub table_id: i64,
    pub column_name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub is_pk: bool,
    pub is_fk: bool,
    pub pii_risk: Option<PiiRisk>,
}

/// A foreign-key edge captured by a scan run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationshipRecord {
    pub id: i64,
    pub scan_run_id: i64,
    pub from_schema: String,
    pub from_table: String,
    pub from_column: String,
    pub to_schema: String,
    pub to_table: String,
    pub to_column: String,
    pub constraint_name: Option<String>,
}

impl RelationshipRecord {
    /// Whether either end of the edge is `schema.table`.
    pub fn touches(&self, schema: &str, table: &str) -> bool {
        (self.from_schema == schema && self.from_table == table)
            || (self.to_schema == schema && self.to_table == table)
    }
}

/// Table-level metrics payload with its quality assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetrics {
    pub profile: TableProfile,
    pub quality_score: u8,
    pub reasons: Vec<String>,
}

/// Generated documentation for one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableDocRecord {
    pub table_id: i64,
    pub doc: TableDoc,
    pub markdown: String,
    pub generated_at: DateTime<Utc>,
}
