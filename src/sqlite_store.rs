//! SQLite-backed [`Store`] implementation.
//!
//! Maps each [`Store`] operation onto the schema created by
//! [`crate::migrate`]. Metrics and docs upsert with `ON CONFLICT DO
//! UPDATE`, while data sources insert with `ON CONFLICT DO NOTHING` and
//! are never rewritten. Run schema replacement is a single transaction.
//! Terminal transitions are guarded with `WHERE status = 'running'`.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use edda_core::docs::TableDoc;
use edda_core::models::{
    ColumnRecord, DataSource, NewDataSource, PiiRisk, RelationshipRecord, ScanMode, ScanRun,
    ScanStatus, TableDocRecord, TableMetrics, TableRecord,
};
use edda_core::profile::{ColumnProfile, TableProfile};
use edda_core::schema::RunSchema;
use edda_core::store::{check_same_profile, Store};

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn from_ts(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_default()
}

fn parse<T: std::str::FromStr<Err = String>>(s: &str) -> Result<T> {
    s.parse::<T>().map_err(|e| anyhow!(e))
}

const DATA_SOURCE_COLUMNS: &str =
    "id, name, engine, host, port, database_name, schema_name, username, password, created_at";

fn data_source_from_row(row: &SqliteRow) -> Result<DataSource> {
    let engine: String = row.get("engine");
    let port: Option<i64> = row.get("port");
    Ok(DataSource {
        id: row.get("id"),
        name: row.get("name"),
        engine: parse(&engine)?,
        host: row.get("host"),
        port: port.map(u16::try_from).transpose()?,
        database: row.get("database_name"),
        schema: row.get("schema_name"),
        username: row.get("username"),
        password: row.get("password"),
        created_at: from_ts(row.get("created_at")),
    })
}

const SCAN_RUN_COLUMNS: &str =
    "id, data_source_id, mode, status, sample_size, fingerprint, error, started_at, finished_at";

fn scan_run_from_row(row: &SqliteRow) -> Result<ScanRun> {
    let mode: String = row.get("mode");
    let status: String = row.get("status");
    let sample_size: i64 = row.get("sample_size");
    let finished_at: Option<i64> = row.get("finished_at");
    Ok(ScanRun {
        id: row.get("id"),
        data_source_id: row.get("data_source_id"),
        mode: parse::<ScanMode>(&mode)?,
        status: parse::<ScanStatus>(&status)?,
        sample_size: u32::try_from(sample_size)?,
        fingerprint: row.get("fingerprint"),
        error: row.get("error"),
        started_at: from_ts(row.get("started_at")),
        finished_at: finished_at.map(from_ts),
    })
}

const TABLE_COLUMNS: &str = "id, scan_run_id, schema_name, table_name, table_type, row_estimate";

fn table_from_row(row: &SqliteRow) -> TableRecord {
    TableRecord {
        id: row.get("id"),
        scan_run_id: row.get("scan_run_id"),
        schema_name: row.get("schema_name"),
        table_name: row.get("table_name"),
        table_type: row.get("table_type"),
        row_estimate: row.get("row_estimate"),
    }
}

const COLUMN_COLUMNS: &str = "c.id AS id, c.table_id AS table_id, c.column_name AS column_name, \
     c.data_type AS data_type, c.nullable AS nullable, c.default_value AS default_value, \
     c.is_pk AS is_pk, c.is_fk AS is_fk, c.pii_risk AS pii_risk";

fn column_from_row(row: &SqliteRow) -> Result<ColumnRecord> {
    let pii: Option<String> = row.get("pii_risk");
    Ok(ColumnRecord {
        id: row.get("id"),
        table_id: row.get("table_id"),
        column_name: row.get("column_name"),
        data_type: row.get("data_type"),
        nullable: row.get("nullable"),
        default_value: row.get("default_value"),
        is_pk: row.get("is_pk"),
        is_fk: row.get("is_fk"),
        pii_risk: pii.as_deref().map(parse::<PiiRisk>).transpose()?,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn register_data_source(&self, ds: &NewDataSource) -> Result<DataSource> {
        sqlx::query(
            r#"
            INSERT INTO data_sources (name, engine, host, port, database_name, schema_name,
                                      username, password, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(name) DO NOTHING
            "#,
        )
        .bind(&ds.name)
        .bind(ds.engine.as_str())
        .bind(&ds.host)
        .bind(ds.port.map(i64::from))
        .bind(&ds.database)
        .bind(&ds.schema)
        .bind(&ds.username)
        .bind(&ds.password)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        self.find_data_source(&ds.name)
            .await?
            .ok_or_else(|| anyhow!("data source '{}' vanished after insert", ds.name))
            .and_then(|existing| check_same_profile(existing, ds))
    }

    async fn get_data_source(&self, id: i64) -> Result<Option<DataSource>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM data_sources WHERE id = ?",
            DATA_SOURCE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(data_source_from_row).transpose()
    }

    async fn find_data_source(&self, name: &str) -> Result<Option<DataSource>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM data_sources WHERE name = ?",
            DATA_SOURCE_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(data_source_from_row).transpose()
    }

    async fn list_data_sources(&self) -> Result<Vec<DataSource>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM data_sources ORDER BY name",
            DATA_SOURCE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(data_source_from_row).collect()
    }

    async fn create_scan_run(
        &self,
        data_source_id: i64,
        mode: ScanMode,
        sample_size: u32,
    ) -> Result<ScanRun> {
        let result = sqlx::query(
            r#"
            INSERT INTO scan_runs (data_source_id, mode, status, sample_size, started_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(data_source_id)
        .bind(mode.as_str())
        .bind(ScanStatus::Running.as_str())
        .bind(i64::from(sample_size))
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_scan_run(id)
            .await?
            .ok_or_else(|| anyhow!("scan run {} vanished after insert", id))
    }

    async fn get_scan_run(&self, id: i64) -> Result<Option<ScanRun>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM scan_runs WHERE id = ?",
            SCAN_RUN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(scan_run_from_row).transpose()
    }

    async fn recent_scan_runs(&self, limit: usize) -> Result<Vec<ScanRun>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM scan_runs ORDER BY id DESC LIMIT ?",
            SCAN_RUN_COLUMNS
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(scan_run_from_row).collect()
    }

    async fn set_scan_fingerprint(&self, id: i64, fingerprint: &str) -> Result<()> {
        sqlx::query("UPDATE scan_runs SET fingerprint = ? WHERE id = ?")
            .bind(fingerprint)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn finish_scan_run(
        &self,
        id: i64,
        status: ScanStatus,
        error: Option<&str>,
    ) -> Result<bool> {
        if !ScanStatus::Running.can_transition_to(status) {
            return Ok(false);
        }
        let result = sqlx::query(
            r#"
            UPDATE scan_runs
            SET status = ?, error = ?, finished_at = ?
            WHERE id = ? AND status = 'running'
            "#,
        )
        .bind(status.as_str())
        .bind(error)
        .bind(Utc::now().timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn replace_run_schema(&self, scan_run_id: i64, schema: &RunSchema) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM tables WHERE scan_run_id = ?")
            .bind(scan_run_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM relationships WHERE scan_run_id = ?")
            .bind(scan_run_id)
            .execute(&mut *tx)
            .await?;

        for t in &schema.tables {
            let table_id = sqlx::query(
                r#"
                INSERT INTO tables (scan_run_id, schema_name, table_name, table_type, row_estimate)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(scan_run_id)
            .bind(&t.schema_name)
            .bind(&t.table_name)
            .bind(&t.table_type)
            .bind(t.row_estimate)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

            for c in &t.columns {
                sqlx::query(
                    r#"
                    INSERT INTO columns (table_id, column_name, data_type, nullable,
                                         default_value, is_pk, is_fk)
                    VALUES (?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(table_id)
                .bind(&c.column_name)
                .bind(&c.data_type)
                .bind(c.nullable)
                .bind(&c.default_value)
                .bind(c.is_pk)
                .bind(c.is_fk)
                .execute(&mut *tx)
                .await?;
            }
        }

        for r in &schema.relationships {
            sqlx::query(
                r#"
                INSERT INTO relationships (scan_run_id, from_schema, from_table, from_column,
                                           to_schema, to_table, to_column, constraint_name)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(scan_run_id)
            .bind(&r.from_schema)
            .bind(&r.from_table)
            .bind(&r.from_column)
            .bind(&r.to_schema)
            .bind(&r.to_table)
            .bind(&r.to_column)
            .bind(&r.constraint_name)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_tables(&self, scan_run_id: i64) -> Result<Vec<TableRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM tables WHERE scan_run_id = ? ORDER BY id",
            TABLE_COLUMNS
        ))
        .bind(scan_run_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(table_from_row).collect())
    }

    async fn get_table(&self, table_id: i64) -> Result<Option<TableRecord>> {
        let row = sqlx::query(&format!("SELECT {} FROM tables WHERE id = ?", TABLE_COLUMNS))
            .bind(table_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(table_from_row))
    }

    async fn list_columns(&self, table_id: i64) -> Result<Vec<ColumnRecord>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM columns c WHERE c.table_id = ? ORDER BY c.id",
            COLUMN_COLUMNS
        ))
        .bind(table_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(column_from_row).collect()
    }

    async fn list_run_columns(&self, scan_run_id: i64) -> Result<Vec<ColumnRecord>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM columns c
            JOIN tables t ON t.id = c.table_id
            WHERE t.scan_run_id = ?
            ORDER BY c.id
            "#,
            COLUMN_COLUMNS
        ))
        .bind(scan_run_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(column_from_row).collect()
    }

    async fn list_relationships(&self, scan_run_id: i64) -> Result<Vec<RelationshipRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, scan_run_id, from_schema, from_table, from_column,
                   to_schema, to_table, to_column, constraint_name
            FROM relationships
            WHERE scan_run_id = ?
            ORDER BY id
            "#,
        )
        .bind(scan_run_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| RelationshipRecord {
                id: row.get("id"),
                scan_run_id: row.get("scan_run_id"),
                from_schema: row.get("from_schema"),
                from_table: row.get("from_table"),
                from_column: row.get("from_column"),
                to_schema: row.get("to_schema"),
                to_table: row.get("to_table"),
                to_column: row.get("to_column"),
                constraint_name: row.get("constraint_name"),
            })
            .collect())
    }

    async fn set_column_pii(&self, column_id: i64, risk: Option<PiiRisk>) -> Result<()> {
        sqlx::query("UPDATE columns SET pii_risk = ? WHERE id = ?")
            .bind(risk.map(|r| r.as_str()))
            .bind(column_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn upsert_table_metrics(&self, table_id: i64, metrics: &TableMetrics) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO table_metrics (table_id, metrics_json, quality_score, reasons_json)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(table_id) DO UPDATE SET
                metrics_json = excluded.metrics_json,
                quality_score = excluded.quality_score,
                reasons_json = excluded.reasons_json
            "#,
        )
        .bind(table_id)
        .bind(serde_json::to_string(&metrics.profile)?)
        .bind(i64::from(metrics.quality_score))
        .bind(serde_json::to_string(&metrics.reasons)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_table_metrics(&self, table_id: i64) -> Result<Option<TableMetrics>> {
        let row = sqlx::query(
            "SELECT metrics_json, quality_score, reasons_json FROM table_metrics WHERE table_id = ?",
        )
        .bind(table_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let metrics_json: String = row.get("metrics_json");
        let reasons_json: String = row.get("reasons_json");
        let score: i64 = row.get("quality_score");
        Ok(Some(TableMetrics {
            profile: serde_json::from_str::<TableProfile>(&metrics_json)?,
            quality_score: u8::try_from(score)?,
            reasons: serde_json::from_str(&reasons_json)?,
        }))
    }

    async fn upsert_column_metrics(&self, column_id: i64, profile: &ColumnProfile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO column_metrics (column_id, metrics_json)
            VALUES (?, ?)
            ON CONFLICT(column_id) DO UPDATE SET metrics_json = excluded.metrics_json
            "#,
        )
        .bind(column_id)
        .bind(serde_json::to_string(profile)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_column_metrics(&self, column_id: i64) -> Result<Option<ColumnProfile>> {
        let json: Option<String> =
            sqlx::query_scalar("SELECT metrics_json FROM column_metrics WHERE column_id = ?")
                .bind(column_id)
                .fetch_optional(&self.pool)
                .await?;
        match json {
            Some(j) => Ok(Some(serde_json::from_str(&j)?)),
            None => Ok(None),
        }
    }

    async fn upsert_table_doc(&self, table_id: i64, doc: &TableDoc, markdown: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO table_docs (table_id, doc_json, markdown, generated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(table_id) DO UPDATE SET
                doc_json = excluded.doc_json,
                markdown = excluded.markdown,
                generated_at = excluded.generated_at
            "#,
        )
        .bind(table_id)
        .bind(serde_json::to_string(doc)?)
        .bind(markdown)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_table_doc(&self, table_id: i64) -> Result<Option<TableDocRecord>> {
        let row = sqlx::query(
            "SELECT doc_json, markdown, generated_at FROM table_docs WHERE table_id = ?",
        )
        .bind(table_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let doc_json: String = row.get("doc_json");
        Ok(Some(TableDocRecord {
            table_id,
            doc: serde_json::from_str(&doc_json)?,
            markdown: row.get("markdown"),
            generated_at: from_ts(row.get("generated_at")),
        }))
    }
}
