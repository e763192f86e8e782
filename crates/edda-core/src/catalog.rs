//! Read accessors over persisted scan output.
//!
//! Every accessor resolves its run or table first and returns
//! [`ScanError::NotFound`] when it is missing, so callers can tell "no
//! such table" apart from "table without metrics yet".

use serde::Serialize;

use crate::docs::JoinRef;
use crate::error::{ScanError, ScanResult};
use crate::models::{ColumnRecord, ScanRun, TableDocRecord, TableMetrics, TableRecord};
use crate::profile::ColumnProfile;
use crate::store::Store;

/// Default number of runs returned by [`recent_scans`].
pub const RECENT_SCANS_LIMIT: usize = 10;

/// Export format for a table document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Markdown,
    Json,
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "md" | "markdown" => Ok(ExportFormat::Markdown),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("unknown export format '{}'. Use md or json.", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnQuality {
    pub column_name: String,
    pub metrics: Option<ColumnProfile>,
}

/// Quality view of one table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableQuality {
    pub table_id: i64,
    pub quality_score: Option<u8>,
    pub reasons: Vec<String>,
    pub table_metrics: Option<TableMetrics>,
    pub columns: Vec<ColumnQuality>,
}

pub async fn scan_status(store: &dyn Store, scan_run_id: i64) -> ScanResult<ScanRun> {
    store
        .get_scan_run(scan_run_id)
        .await?
        .ok_or_else(|| ScanError::not_found("scan run", scan_run_id))
}

pub async fn recent_scans(store: &dyn Store, limit: usize) -> ScanResult<Vec<ScanRun>> {
    Ok(store.recent_scan_runs(limit).await?)
}

/// Tables of a run sorted by name.
pub async fn tables_for_run(store: &dyn Store, scan_run_id: i64) -> ScanResult<Vec<TableRecord>> {
    scan_status(store, scan_run_id).await?;
    let mut tables = store.list_tables(scan_run_id).await?;
    tables.sort_by(|a, b| {
        a.table_name
            .cmp(&b.table_name)
            .then_with(|| a.schema_name.cmp(&b.schema_name))
    });
    Ok(tables)
}

pub async fn table(store: &dyn Store, table_id: i64) -> ScanResult<TableRecord> {
    store
        .get_table(table_id)
        .await?
        .ok_or_else(|| ScanError::not_found("table", table_id))
}

/// Columns of a table sorted by name.
pub async fn table_columns(store: &dyn Store, table_id: i64) -> ScanResult<Vec<ColumnRecord>> {
    table(store, table_id).await?;
    let mut columns = store.list_columns(table_id).await?;
    columns.sort_by(|a, b| a.column_name.cmp(&b.column_name));
    Ok(columns)
}

/// Run relationships with either end on the table, in stored order.
pub async fn table_relationships(store: &dyn Store, table_id: i64) -> ScanResult<Vec<JoinRef>> {
    let t = table(store, table_id).await?;
    let relationships = store.list_relationships(t.scan_run_id).await?;
    Ok(crate::docs::joins_for_table(
        &relationships,
        &t.schema_name,
        &t.table_name,
    ))
}

pub async fn table_quality(store: &dyn Store, table_id: i64) -> ScanResult<TableQuality> {
    table(store, table_id).await?;
    let metrics = store.get_table_metrics(table_id).await?;
    let mut columns = Vec::new();
    for c in table_columns(store, table_id).await? {
        columns.push(ColumnQuality {
            metrics: store.get_column_metrics(c.id).await?,
            column_name: c.column_name,
        });
    }
    Ok(TableQuality {
        table_id,
        quality_score: metrics.as_ref().map(|m| m.quality_score),
        reasons: metrics
            .as_ref()
            .map(|m| m.reasons.clone())
            .unwrap_or_default(),
        table_metrics: metrics,
        columns,
    })
}

pub async fn table_doc(store: &dyn Store, table_id: i64) -> ScanResult<TableDocRecord> {
    table(store, table_id).await?;
    store
        .get_table_doc(table_id)
        .await?
        .ok_or_else(|| ScanError::not_found("table doc", table_id))
}

/// A table's document as rendered markdown or pretty JSON.
pub async fn export_doc(store: &dyn Store, table_id: i64, format: ExportFormat) -> ScanResult<String> {
    let record = table_doc(store, table_id).await?;
    match format {
        ExportFormat::Markdown => Ok(record.markdown),
        ExportFormat::Json => serde_json::to_string_pretty(&record.doc)
            .map_err(|e| ScanError::Persistence(anyhow::Error::new(e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docs::TableDoc;
    use crate::models::{EngineKind, ScanMode, ScanStatus};
    use crate::progress::NoProgress;
    use crate::scan::{start_scan, ScanRequest};
    use crate::store::memory::InMemoryStore;
    use crate::testing::{new_source, shop};

    async fn scanned() -> (InMemoryStore, i64) {
        let store = InMemoryStore::new();
        let ds = store
            .register_data_source(&new_source(EngineKind::Postgres))
            .await
            .unwrap();
        let run = start_scan(
            &store,
            &shop(),
            ScanRequest {
                data_source_id: ds.id,
                mode: ScanMode::Full,
                sample_size: 50,
            },
            &NoProgress,
        )
        .await
        .unwrap();
        (store, run)
    }

    async fn table_id(store: &InMemoryStore, run: i64, name: &str) -> i64 {
        tables_for_run(store, run)
            .await
            .unwrap()
            .into_iter()
            .find(|t| t.table_name == name)
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn status_and_recent() {
        let (store, run) = scanned().await;
        let status = scan_status(&store, run).await.unwrap();
        assert_eq!(status.status, ScanStatus::Completed);
        assert_eq!(status.mode, ScanMode::Full);
        assert_eq!(recent_scans(&store, RECENT_SCANS_LIMIT).await.unwrap().len(), 1);
        assert!(matches!(
            scan_status(&store, 77).await,
            Err(ScanError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn tables_and_columns_are_sorted() {
        let (store, run) = scanned().await;
        let names: Vec<String> = tables_for_run(&store, run)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.table_name)
            .collect();
        assert_eq!(names, vec!["customers", "orders", "payments"]);

        let orders = table_id(&store, run, "orders").await;
        let cols: Vec<String> = table_columns(&store, orders)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.column_name)
            .collect();
        assert_eq!(cols, vec!["customer_id", "note", "order_id"]);
    }

    #[tokio::test]
    async fn relationships_touch_the_table() {
        let (store, run) = scanned().await;
        let orders = table_id(&store, run, "orders").await;
        let joins = table_relationships(&store, orders).await.unwrap();
        assert_eq!(joins.len(), 2);
        let customers = table_id(&store, run, "customers").await;
        let joins = table_relationships(&store, customers).await.unwrap();
        assert_eq!(joins.len(), 1);
        assert_eq!(joins[0].constraint_name.as_deref(), Some("orders_customer_id_fkey"));
    }

    #[tokio::test]
    async fn quality_includes_column_metrics() {
        let (store, run) = scanned().await;
        let orders = table_id(&store, run, "orders").await;
        let q = table_quality(&store, orders).await.unwrap();
        assert_eq!(q.quality_score, Some(90));
        assert_eq!(q.reasons.len(), 1);
        let note = q.columns.iter().find(|c| c.column_name == "note").unwrap();
        assert_eq!(note.metrics.as_ref().unwrap().null_pct, 75.0);
    }

    #[tokio::test]
    async fn export_in_both_formats() {
        let (store, run) = scanned().await;
        let orders = table_id(&store, run, "orders").await;
        let md = export_doc(&store, orders, ExportFormat::Markdown).await.unwrap();
        assert!(md.starts_with("# public.orders"));
        let json = export_doc(&store, orders, ExportFormat::Json).await.unwrap();
        let doc: TableDoc = serde_json::from_str(&json).unwrap();
        assert_eq!(doc.table, "public.orders");
        assert_eq!(doc.quality_score, Some(90));

        assert!(matches!(
            export_doc(&store, 999, ExportFormat::Json).await,
            Err(ScanError::NotFound { entity: "table", .. })
        ));
        assert_eq!("md".parse::<ExportFormat>().unwrap(), ExportFormat::Markdown);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }
}
