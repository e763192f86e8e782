//! Engine-specific connector capability.
//!
//! A [`Connector`] tests connectivity, lists raw catalog metadata and
//! samples rows. Catalog results are returned as a [`RawCatalog`] in
//! whatever order the engine produced them; the schema extractor
//! ([`crate::schema::extract_snapshot`]) canonicalizes them.
//!
//! Implementations live outside the core crate (they need native
//! drivers). Engines without an implementation must still be
//! constructible and return [`ScanError::UnsupportedEngine`] from every
//! capability, never panic.
//!
//! [`ScanError::UnsupportedEngine`]: crate::error::ScanError::UnsupportedEngine

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ScanResult;
use crate::models::{DataSource, EngineKind, Row};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    pub schema: String,
    pub name: String,
    pub table_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawColumn {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub ordinal_position: i32,
}

/// A fully qualified column reference.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub schema: String,
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(schema: &str, table: &str, column: &str) -> Self {
        Self {
            schema: schema.to_string(),
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

/// One column pair of a foreign-key constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub from_schema: String,
    pub from_table: String,
    pub from_column: String,
    pub to_schema: String,
    pub to_table: String,
    pub to_column: String,
    pub constraint_name: Option<String>,
}

/// One column of a unique constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniqueColumn {
    pub schema: String,
    pub table: String,
    pub column: String,
    pub constraint_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub definition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowEstimate {
    pub schema: String,
    pub table: String,
    pub rows: i64,
}

/// Catalog query results for one schema, in engine order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCatalog {
    pub schema: String,
    pub tables: Vec<RawTable>,
    pub columns: Vec<RawColumn>,
    pub primary_keys: Vec<ColumnRef>,
    pub foreign_keys: Vec<ForeignKey>,
    pub unique_constraints: Vec<UniqueColumn>,
    pub indexes: Vec<IndexInfo>,
    pub row_estimates: Vec<RowEstimate>,
}

/// A database engine connector bound to one data source.
///
/// # Errors
///
/// - connect/auth failures → `ScanError::Connection`
/// - catalog query failures → `ScanError::Extraction`
/// - sample query failures → `ScanError::Sampling`
/// - stub engines → `ScanError::UnsupportedEngine`
#[async_trait]
pub trait Connector: Send + Sync {
    /// The engine this connector talks to.
    fn engine(&self) -> EngineKind;

    /// Open a connection and run a trivial query.
    async fn test_connection(&self) -> ScanResult<()>;

    /// List catalog metadata for the bound schema (engine default when
    /// the data source names none).
    async fn extract_catalog(&self) -> ScanResult<RawCatalog>;

    /// Fetch at most `limit` rows of `schema.table` in engine default
    /// order. An empty table yields an empty vector.
    async fn sample_table(&self, schema: &str, table: &str, limit: usize) -> ScanResult<Vec<Row>>;
}

/// Builds the connector for a registered data source.
///
/// The orchestrator only knows this seam; the engine registry that maps
/// [`EngineKind`] to concrete connectors lives with the drivers.
pub trait ConnectorProvider: Send + Sync {
    fn connector_for(&self, source: &DataSource) -> ScanResult<Box<dyn Connector>>;
}
