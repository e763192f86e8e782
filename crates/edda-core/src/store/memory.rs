//! In-memory [`Store`] implementation for tests and embedding.
//!
//! Uses `Vec`s and `HashMap`s behind a single `std::sync::RwLock`, so
//! every operation (including [`Store::replace_run_schema`]) is atomic.
//! Identities come from per-entity counters starting at 1.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;

use crate::docs::TableDoc;
use crate::models::{
    ColumnRecord, DataSource, NewDataSource, PiiRisk, RelationshipRecord, ScanMode, ScanRun,
    ScanStatus, TableDocRecord, TableMetrics, TableRecord,
};
use crate::profile::ColumnProfile;
use crate::schema::RunSchema;
use crate::store::check_same_profile;

use super::Store;

#[derive(Default)]
struct Ids {
    data_source: i64,
    scan_run: i64,
    table: i64,
    column: i64,
    relationship: i64,
}

#[derive(Default)]
struct State {
    ids: Ids,
    data_sources: Vec<DataSource>,
    scan_runs: Vec<ScanRun>,
    tables: Vec<TableRecord>,
    columns: Vec<ColumnRecord>,
    relationships: Vec<RelationshipRecord>,
    table_metrics: HashMap<i64, TableMetrics>,
    column_metrics: HashMap<i64, ColumnProfile>,
    table_docs: HashMap<i64, TableDocRecord>,
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

/// In-memory store for tests.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn register_data_source(&self, ds: &NewDataSource) -> Result<DataSource> {
        let mut state = self.write()?;
        if let Some(existing) = state.data_sources.iter().find(|d| d.name == ds.name) {
            return check_same_profile(existing.clone(), ds);
        }
        let record = DataSource {
            id: next(&mut state.ids.data_source),
            name: ds.name.clone(),
            engine: ds.engine,
            host: ds.host.clone(),
            port: ds.port,
            database: ds.database.clone(),
            schema: ds.schema.clone(),
            username: ds.username.clone(),
            password: ds.password.clone(),
            created_at: Utc::now(),
        };
        state.data_sources.push(record.clone());
        Ok(record)
    }

    async fn get_data_source(&self, id: i64) -> Result<Option<DataSource>> {
        Ok(self.read()?.data_sources.iter().find(|d| d.id == id).cloned())
    }

    async fn find_data_source(&self, name: &str) -> Result<Option<DataSource>> {
        Ok(self
            .read()?
            .data_sources
            .iter()
            .find(|d| d.name == name)
            .cloned())
    }

    async fn list_data_sources(&self) -> Result<Vec<DataSource>> {
        let mut all = self.read()?.data_sources.clone();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(all)
    }

    async fn create_scan_run(
        &self,
        data_source_id: i64,
        mode: ScanMode,
        sample_size: u32,
    ) -> Result<ScanRun> {
        let mut state = self.write()?;
        if !state.data_sources.iter().any(|d| d.id == data_source_id) {
            return Err(anyhow!("data source {} does not exist", data_source_id));
        }
        let run = ScanRun {
            id: next(&mut state.ids.scan_run),
            data_source_id,
            mode,
            status: ScanStatus::Running,
            sample_size,
            fingerprint: None,
            error: None,
            started_at: Utc::now(),
            finished_at: None,
        };
        state.scan_runs.push(run.clone());
        Ok(run)
    }

    async fn get_scan_run(&self, id: i64) -> Result<Option<ScanRun>> {
        Ok(self.read()?.scan_runs.iter().find(|r| r.id == id).cloned())
    }

    async fn recent_scan_runs(&self, limit: usize) -> Result<Vec<ScanRun>> {
        Ok(self
            .read()?
            .scan_runs
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect())
    }

    async fn set_scan_fingerprint(&self, id: i64, fingerprint: &str) -> Result<()> {
        let mut state = self.write()?;
        let run = state
            .scan_runs
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| anyhow!("scan run {} does not exist", id))?;
        run.fingerprint = Some(fingerprint.to_string());
        Ok(())
    }

    async fn finish_scan_run(
        &self,
        id: i64,
        status: ScanStatus,
        error: Option<&str>,
    ) -> Result<bool> {
        let mut state = self.write()?;
        let Some(run) = state.scan_runs.iter_mut().find(|r| r.id == id) else {
            return Ok(false);
        };
        if !run.status.can_transition_to(status) {
            return Ok(false);
        }
        run.status = status;
        run.error = error.map(str::to_string);
        run.finished_at = Some(Utc::now());
        Ok(true)
    }

    async fn replace_run_schema(&self, scan_run_id: i64, schema: &RunSchema) -> Result<()> {
        let mut state = self.write()?;
        let state = &mut *state;

        let old_tables: Vec<i64> = state
            .tables
            .iter()
            .filter(|t| t.scan_run_id == scan_run_id)
            .map(|t| t.id)
            .collect();
        let old_columns: Vec<i64> = state
            .columns
            .iter()
            .filter(|c| old_tables.contains(&c.table_id))
            .map(|c| c.id)
            .collect();
        for id in &old_columns {
            state.column_metrics.remove(id);
        }
        for id in &old_tables {
            state.table_metrics.remove(id);
            state.table_docs.remove(id);
        }
        state.columns.retain(|c| !old_tables.contains(&c.table_id));
        state.tables.retain(|t| t.scan_run_id != scan_run_id);
        state.relationships.retain(|r| r.scan_run_id != scan_run_id);

        for t in &schema.tables {
            let table_id = next(&mut state.ids.table);
            state.tables.push(TableRecord {
                id: table_id,
                scan_run_id,
                schema_name: t.schema_name.clone(),
                table_name: t.table_name.clone(),
                table_type: t.table_type.clone(),
                row_estimate: t.row_estimate,
            });
            for c in &t.columns {
                let column_id = next(&mut state.ids.column);
                state.columns.push(ColumnRecord {
                    id: column_id,
                    table_id,
                    column_name: c.column_name.clone(),
                    data_type: c.data_type.clone(),
                    nullable: c.nullable,
                    default_value: c.default_value.clone(),
                    is_pk: c.is_pk,
                    is_fk: c.is_fk,
                    pii_risk: None,
                });
            }
        }

        for r in &schema.relationships {
            let id = next(&mut state.ids.relationship);
            state.relationships.push(RelationshipRecord {
                id,
                scan_run_id,
                from_schema: r.from_schema.clone(),
                from_table: r.from_table.clone(),
                from_column: r.from_column.clone(),
                to_schema: r.to_schema.clone(),
                to_table: r.to_table.clone(),
                to_column: r.to_column.clone(),
                constraint_name: r.constraint_name.clone(),
            });
        }
        Ok(())
    }

    async fn list_tables(&self, scan_run_id: i64) -> Result<Vec<TableRecord>> {
        Ok(self
            .read()?
            .tables
            .iter()
            .filter(|t| t.scan_run_id == scan_run_id)
            .cloned()
            .collect())
    }

    async fn get_table(&self, table_id: i64) -> Result<Option<TableRecord>> {
        Ok(self.read()?.tables.iter().find(|t| t.id == table_id).cloned())
    }

    async fn list_columns(&self, table_id: i64) -> Result<Vec<ColumnRecord>> {
        Ok(self
            .read()?
            .columns
            .iter()
            .filter(|c| c.table_id == table_id)
            .cloned()
            .collect())
    }

    async fn list_run_columns(&self, scan_run_id: i64) -> Result<Vec<ColumnRecord>> {
        let state = self.read()?;
        let tables: Vec<i64> = state
            .tables
            .iter()
            .filter(|t| t.scan_run_id == scan_run_id)
            .map(|t| t.id)
            .collect();
        Ok(state
            .columns
            .iter()
            .filter(|c| tables.contains(&c.table_id))
            .cloned()
            .collect())
    }

    async fn list_relationships(&self, scan_run_id: i64) -> Result<Vec<RelationshipRecord>> {
        Ok(self
            .read()?
            .relationships
            .iter()
            .filter(|r| r.scan_run_id == scan_run_id)
            .cloned()
            .collect())
    }

    async fn set_column_pii(&self, column_id: i64, risk: Option<PiiRisk>) -> Result<()> {
        let mut state = self.write()?;
        let column = state
            .columns
            .iter_mut()
            .find(|c| c.id == column_id)
            .ok_or_else(|| anyhow!("column {} does not exist", column_id))?;
        column.pii_risk = risk;
        Ok(())
    }

    async fn upsert_table_metrics(&self, table_id: i64, metrics: &TableMetrics) -> Result<()> {
        let mut state = self.write()?;
        if !state.tables.iter().any(|t| t.id == table_id) {
            return Err(anyhow!("table {} does not exist", table_id));
        }
        state.table_metrics.insert(table_id, metrics.clone());
        Ok(())
    }

    async fn get_table_metrics(&self, table_id: i64) -> Result<Option<TableMetrics>> {
        Ok(self.read()?.table_metrics.get(&table_id).cloned())
    }

    async fn upsert_column_metrics(&self, column_id: i64, profile: &ColumnProfile) -> Result<()> {
        let mut state = self.write()?;
        if !state.columns.iter().any(|c| c.id == column_id) {
            return Err(anyhow!("column {} does not exist", column_id));
        }
        state.column_metrics.insert(column_id, profile.clone());
        Ok(())
    }

    async fn get_column_metrics(&self, column_id: i64) -> Result<Option<ColumnProfile>> {
        Ok(self.read()?.column_metrics.get(&column_id).cloned())
    }

    async fn upsert_table_doc(&self, table_id: i64, doc: &TableDoc, markdown: &str) -> Result<()> {
        let mut state = self.write()?;
        if !state.tables.iter().any(|t| t.id == table_id) {
            return Err(anyhow!("table {} does not exist", table_id));
        }
        state.table_docs.insert(
            table_id,
            TableDocRecord {
                table_id,
                doc: doc.clone(),
                markdown: markdown.to_string(),
                generated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn get_table_doc(&self, table_id: i64) -> Result<Option<TableDocRecord>> {
        Ok(self.read()?.table_docs.get(&table_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EngineKind;
    use crate::schema::{NewColumn, NewTable};

    fn source(name: &str) -> NewDataSource {
        NewDataSource {
            name: name.into(),
            engine: EngineKind::Postgres,
            host: "localhost".into(),
            port: None,
            database: "shop".into(),
            schema: None,
            username: "edda".into(),
            password: "secret".into(),
        }
    }

    fn run_schema(tables: &[&str]) -> RunSchema {
        RunSchema {
            tables: tables
                .iter()
                .map(|name| NewTable {
                    schema_name: "public".into(),
                    table_name: name.to_string(),
                    table_type: "BASE TABLE".into(),
                    row_estimate: None,
                    columns: vec![NewColumn {
                        column_name: "id".into(),
                        data_type: "integer".into(),
                        nullable: false,
                        default_value: None,
                        is_pk: true,
                        is_fk: false,
                    }],
                })
                .collect(),
            relationships: Vec::new(),
        }
    }

    #[tokio::test]
    async fn registered_profile_is_immutable() {
        let store = InMemoryStore::new();
        let a = store.register_data_source(&source("shop")).await.unwrap();

        let again = store.register_data_source(&source("shop")).await.unwrap();
        assert_eq!(again, a);

        let mut changed = source("shop");
        changed.host = "other-host".into();
        changed.database = "other_db".into();
        let err = store.register_data_source(&changed).await.unwrap_err();
        assert!(err.to_string().contains("different profile"));

        let stored = store.get_data_source(a.id).await.unwrap().unwrap();
        assert_eq!(stored.host, "localhost");
        assert_eq!(stored.database, "shop");
        assert_eq!(store.list_data_sources().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn terminal_runs_do_not_transition_again() {
        let store = InMemoryStore::new();
        let ds = store.register_data_source(&source("shop")).await.unwrap();
        let run = store.create_scan_run(ds.id, ScanMode::Quick, 10).await.unwrap();
        assert_eq!(run.status, ScanStatus::Running);

        assert!(store
            .finish_scan_run(run.id, ScanStatus::Failed, Some("boom"))
            .await
            .unwrap());
        assert!(!store
            .finish_scan_run(run.id, ScanStatus::Completed, None)
            .await
            .unwrap());

        let stored = store.get_scan_run(run.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ScanStatus::Failed);
        assert_eq!(stored.error.as_deref(), Some("boom"));
        assert!(stored.finished_at.is_some());
    }

    #[tokio::test]
    async fn replace_run_schema_clears_previous_attempt() {
        let store = InMemoryStore::new();
        let ds = store.register_data_source(&source("shop")).await.unwrap();
        let run = store.create_scan_run(ds.id, ScanMode::Quick, 10).await.unwrap();

        store
            .replace_run_schema(run.id, &run_schema(&["orders", "payments"]))
            .await
            .unwrap();
        let first = store.list_tables(run.id).await.unwrap();
        store
            .upsert_table_metrics(
                first[0].id,
                &TableMetrics {
                    profile: crate::profile::TableProfile {
                        row_sampled: 1,
                        avg_null_pct: Some(0.0),
                    },
                    quality_score: 100,
                    reasons: Vec::new(),
                },
            )
            .await
            .unwrap();

        store
            .replace_run_schema(run.id, &run_schema(&["customers"]))
            .await
            .unwrap();
        let second = store.list_tables(run.id).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].table_name, "customers");
        assert!(store.get_table_metrics(first[0].id).await.unwrap().is_none());
        assert_eq!(store.list_run_columns(run.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn recent_runs_newest_first() {
        let store = InMemoryStore::new();
        let ds = store.register_data_source(&source("shop")).await.unwrap();
        for _ in 0..3 {
            store.create_scan_run(ds.id, ScanMode::Full, 5).await.unwrap();
        }
        let recent = store.recent_scan_runs(2).await.unwrap();
        let ids: Vec<i64> = recent.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 2]);
    }
}
