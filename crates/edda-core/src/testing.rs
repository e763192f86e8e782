//! Scripted connector, shop fixture and a store that rejects completion,
//! shared by unit tests.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::json;

use crate::connector::{
    ColumnRef, Connector, ConnectorProvider, ForeignKey, IndexInfo, RawCatalog, RawColumn,
    RawTable, UniqueColumn,
};
use crate::error::{ScanError, ScanResult};
use crate::docs::TableDoc;
use crate::models::{
    ColumnRecord, DataSource, EngineKind, NewDataSource, PiiRisk, RelationshipRecord, Row,
    ScanMode, ScanRun, ScanStatus, TableDocRecord, TableMetrics, TableRecord,
};
use crate::profile::ColumnProfile;
use crate::schema::RunSchema;
use crate::store::memory::InMemoryStore;
use crate::store::Store;

#[derive(Clone, Default)]
pub struct ScriptedConnector {
    pub catalog: RawCatalog,
    pub samples: HashMap<String, Vec<Row>>,
    pub fail_extract: Option<String>,
    pub fail_sample_on: Option<String>,
}

#[async_trait]
impl Connector for ScriptedConnector {
    fn engine(&self) -> EngineKind {
        EngineKind::Postgres
    }

    async fn test_connection(&self) -> ScanResult<()> {
        Ok(())
    }

    async fn extract_catalog(&self) -> ScanResult<RawCatalog> {
        match &self.fail_extract {
            Some(msg) => Err(ScanError::Extraction(msg.clone())),
            None => Ok(self.catalog.clone()),
        }
    }

    async fn sample_table(&self, _schema: &str, table: &str, limit: usize) -> ScanResult<Vec<Row>> {
        if self.fail_sample_on.as_deref() == Some(table) {
            return Err(ScanError::Sampling(format!("permission denied for table {}", table)));
        }
        let mut rows = self.samples.get(table).cloned().unwrap_or_default();
        rows.truncate(limit);
        Ok(rows)
    }
}

impl ConnectorProvider for ScriptedConnector {
    fn connector_for(&self, source: &DataSource) -> ScanResult<Box<dyn Connector>> {
        match source.engine {
            EngineKind::Postgres => Ok(Box::new(self.clone())),
            other => Err(ScanError::UnsupportedEngine(other)),
        }
    }
}

pub fn new_source(engine: EngineKind) -> NewDataSource {
    NewDataSource {
        name: format!("shop-{}", engine),
        engine,
        host: "localhost".into(),
        port: None,
        database: "shop".into(),
        schema: Some("public".into()),
        username: "edda".into(),
        password: "edda".into(),
    }
}

fn table(name: &str) -> RawTable {
    RawTable {
        schema: "public".into(),
        name: name.into(),
        table_type: "BASE TABLE".into(),
    }
}

fn column(table: &str, name: &str, data_type: &str, pos: i32) -> RawColumn {
    RawColumn {
        schema: "public".into(),
        table: table.into(),
        name: name.into(),
        data_type: data_type.into(),
        nullable: pos != 1,
        default_value: None,
        ordinal_position: pos,
    }
}

fn row(value: serde_json::Value) -> Row {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Row::new(),
    }
}

/// `customers`, `orders` and `payments`, with
/// `payments.order_id → orders.order_id` and
/// `orders.customer_id → customers.customer_id`.
pub fn shop() -> ScriptedConnector {
    let catalog = RawCatalog {
        schema: "public".into(),
        tables: vec![table("payments"), table("orders"), table("customers")],
        columns: vec![
            column("customers", "customer_id", "integer", 1),
            column("customers", "email", "text", 2),
            column("orders", "order_id", "integer", 1),
            column("orders", "customer_id", "integer", 2),
            column("orders", "note", "text", 3),
            column("payments", "payment_id", "integer", 1),
            column("payments", "order_id", "integer", 2),
            column("payments", "amount", "numeric", 3),
        ],
        primary_keys: vec![
            ColumnRef::new("public", "customers", "customer_id"),
            ColumnRef::new("public", "orders", "order_id"),
            ColumnRef::new("public", "payments", "payment_id"),
        ],
        foreign_keys: vec![
            ForeignKey {
                from_schema: "public".into(),
                from_table: "payments".into(),
                from_column: "order_id".into(),
                to_schema: "public".into(),
                to_table: "orders".into(),
                to_column: "order_id".into(),
                constraint_name: Some("payments_order_id_fkey".into()),
            },
            ForeignKey {
                from_schema: "public".into(),
                from_table: "orders".into(),
                from_column: "customer_id".into(),
                to_schema: "public".into(),
                to_table: "customers".into(),
                to_column: "customer_id".into(),
                constraint_name: Some("orders_customer_id_fkey".into()),
            },
        ],
        unique_constraints: vec![UniqueColumn {
            schema: "public".into(),
            table: "customers".into(),
            column: "email".into(),
            constraint_name: Some("customers_email_key".into()),
        }],
        indexes: vec![IndexInfo {
            schema: "public".into(),
            table: "orders".into(),
            name: "orders_pkey".into(),
            definition: None,
        }],
        row_estimates: Vec::new(),
    };

    let mut samples = HashMap::new();
    samples.insert(
        "customers".to_string(),
        vec![
            row(json!({"customer_id": 1, "email": "ada@example.com"})),
            row(json!({"customer_id": 2, "email": "bob@example.com"})),
        ],
    );
    samples.insert(
        "orders".to_string(),
        vec![
            row(json!({"order_id": 10, "customer_id": 1, "note": null})),
            row(json!({"order_id": 11, "customer_id": 1, "note": null})),
            row(json!({"order_id": 12, "customer_id": 2, "note": "gift"})),
            row(json!({"order_id": 13, "customer_id": 2, "note": null})),
        ],
    );
    samples.insert("payments".to_string(), Vec::new());

    ScriptedConnector {
        catalog,
        samples,
        ..Default::default()
    }
}

/// In-memory store whose `completed` transition fails with an I/O error.
/// Every other operation, including the `failed` transition, succeeds.
#[derive(Default)]
pub struct RejectCompletion(pub InMemoryStore);

#[async_trait]
impl Store for RejectCompletion {
    async fn register_data_source(&self, ds: &NewDataSource) -> anyhow::Result<DataSource> {
        self.0.register_data_source(ds).await
    }

    async fn get_data_source(&self, id: i64) -> anyhow::Result<Option<DataSource>> {
        self.0.get_data_source(id).await
    }

    async fn find_data_source(&self, name: &str) -> anyhow::Result<Option<DataSource>> {
        self.0.find_data_source(name).await
    }

    async fn list_data_sources(&self) -> anyhow::Result<Vec<DataSource>> {
        self.0.list_data_sources().await
    }

    async fn create_scan_run(
        &self,
        data_source_id: i64,
        mode: ScanMode,
        sample_size: u32,
    ) -> anyhow::Result<ScanRun> {
        self.0.create_scan_run(data_source_id, mode, sample_size).await
    }

    async fn get_scan_run(&self, id: i64) -> anyhow::Result<Option<ScanRun>> {
        self.0.get_scan_run(id).await
    }

    async fn recent_scan_runs(&self, limit: usize) -> anyhow::Result<Vec<ScanRun>> {
        self.0.recent_scan_runs(limit).await
    }

    async fn set_scan_fingerprint(&self, id: i64, fingerprint: &str) -> anyhow::Result<()> {
        self.0.set_scan_fingerprint(id, fingerprint).await
    }

    async fn finish_scan_run(
        &self,
        id: i64,
        status: ScanStatus,
        error: Option<&str>,
    ) -> anyhow::Result<bool> {
        if status == ScanStatus::Completed {
            anyhow::bail!("disk I/O error");
        }
        self.0.finish_scan_run(id, status, error).await
    }

    async fn replace_run_schema(&self, scan_run_id: i64, schema: &RunSchema) -> anyhow::Result<()> {
        self.0.replace_run_schema(scan_run_id, schema).await
    }

    async fn list_tables(&self, scan_run_id: i64) -> anyhow::Result<Vec<TableRecord>> {
        self.0.list_tables(scan_run_id).await
    }

    async fn get_table(&self, table_id: i64) -> anyhow::Result<Option<TableRecord>> {
        self.0.get_table(table_id).await
    }

    async fn list_columns(&self, table_id: i64) -> anyhow::Result<Vec<ColumnRecord>> {
        self.0.list_columns(table_id).await
    }

    async fn list_run_columns(&self, scan_run_id: i64) -> anyhow::Result<Vec<ColumnRecord>> {
        self.0.list_run_columns(scan_run_id).await
    }

    async fn list_relationships(
        &self,
        scan_run_id: i64,
    ) -> anyhow::Result<Vec<RelationshipRecord>> {
        self.0.list_relationships(scan_run_id).await
    }

    async fn set_column_pii(&self, column_id: i64, risk: Option<PiiRisk>) -> anyhow::Result<()> {
        self.0.set_column_pii(column_id, risk).await
    }

    async fn upsert_table_metrics(
        &self,
        table_id: i64,
        metrics: &TableMetrics,
    ) -> anyhow::Result<()> {
        self.0.upsert_table_metrics(table_id, metrics).await
    }

    async fn get_table_metrics(&self, table_id: i64) -> anyhow::Result<Option<TableMetrics>> {
        self.0.get_table_metrics(table_id).await
    }

    async fn upsert_column_metrics(
        &self,
        column_id: i64,
        profile: &ColumnProfile,
    ) -> anyhow::Result<()> {
        self.0.upsert_column_metrics(column_id, profile).await
    }

    async fn get_column_metrics(&self, column_id: i64) -> anyhow::Result<Option<ColumnProfile>> {
        self.0.get_column_metrics(column_id).await
    }

    async fn upsert_table_doc(
        &self,
        table_id: i64,
        doc: &TableDoc,
        markdown: &str,
    ) -> anyhow::Result<()> {
        self.0.upsert_table_doc(table_id, doc, markdown).await
    }

    async fn get_table_doc(&self, table_id: i64) -> anyhow::Result<Option<TableDocRecord>> {
        self.0.get_table_doc(table_id).await
    }
}
