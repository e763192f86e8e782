//! Idempotent schema migrations for the metadata store.
//!
//! Timestamps are unix seconds. Metrics and document payloads are JSON
//! text. Child rows reference their parents with `ON DELETE CASCADE` so
//! replacing a run's tables also drops their columns, metrics and docs.

use anyhow::Result;
use sqlx::SqlitePool;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS data_sources (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        engine TEXT NOT NULL,
        host TEXT NOT NULL,
        port INTEGER,
        database_name TEXT NOT NULL,
        schema_name TEXT,
        username TEXT NOT NULL,
        password TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS scan_runs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        data_source_id INTEGER NOT NULL REFERENCES data_sources(id),
        mode TEXT NOT NULL,
        status TEXT NOT NULL,
        sample_size INTEGER NOT NULL,
        fingerprint TEXT,
        error TEXT,
        started_at INTEGER NOT NULL,
        finished_at INTEGER
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tables (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        scan_run_id INTEGER NOT NULL REFERENCES scan_runs(id) ON DELETE CASCADE,
        schema_name TEXT NOT NULL,
        table_name TEXT NOT NULL,
        table_type TEXT NOT NULL,
        row_estimate INTEGER,
        UNIQUE(scan_run_id, schema_name, table_name)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS columns (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        table_id INTEGER NOT NULL REFERENCES tables(id) ON DELETE CASCADE,
        column_name TEXT NOT NULL,
        data_type TEXT NOT NULL,
        nullable INTEGER NOT NULL,
        default_value TEXT,
        is_pk INTEGER NOT NULL DEFAULT 0,
        is_fk INTEGER NOT NULL DEFAULT 0,
        pii_risk TEXT,
        UNIQUE(table_id, column_name)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS relationships (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        scan_run_id INTEGER NOT NULL REFERENCES scan_runs(id) ON DELETE CASCADE,
        from_schema TEXT NOT NULL,
        from_table TEXT NOT NULL,
        from_column TEXT NOT NULL,
        to_schema TEXT NOT NULL,
        to_table TEXT NOT NULL,
        to_column TEXT NOT NULL,
        constraint_name TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS table_metrics (
        table_id INTEGER PRIMARY KEY REFERENCES tables(id) ON DELETE CASCADE,
        metrics_json TEXT NOT NULL,
        quality_score INTEGER NOT NULL,
        reasons_json TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS column_metrics (
        column_id INTEGER PRIMARY KEY REFERENCES columns(id) ON DELETE CASCADE,
        metrics_json TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS table_docs (
        table_id INTEGER PRIMARY KEY REFERENCES tables(id) ON DELETE CASCADE,
        doc_json TEXT NOT NULL,
        markdown TEXT NOT NULL,
        generated_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_tables_scan_run ON tables(scan_run_id)",
    "CREATE INDEX IF NOT EXISTS idx_columns_table ON columns(table_id)",
    "CREATE INDEX IF NOT EXISTS idx_relationships_scan_run ON relationships(scan_run_id)",
    "CREATE INDEX IF NOT EXISTS idx_scan_runs_started ON scan_runs(started_at DESC)",
];

/// Apply every statement of the schema to an open pool.
pub async fn migrate_pool(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
