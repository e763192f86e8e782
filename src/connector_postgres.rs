//! PostgreSQL connector.
//!
//! Reads the catalog through `information_schema`, `pg_indexes` and
//! `pg_class`, and samples rows with `row_to_json` so every column type
//! arrives as a JSON scalar (or array/object for composite types) in the
//! table's column order.
//!
//! The pool is opened lazily on first use and shared by every call made
//! through one connector instance.
//!
//! # Error mapping
//!
//! | Failure | Error |
//! |---------|-------|
//! | pool / connection / auth | `ScanError::Connection` |
//! | catalog query | `ScanError::Extraction` |
//! | sample query or row decode | `ScanError::Sampling` |

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::Row as _;
use tokio::sync::OnceCell;
use tracing::debug;

use edda_core::connector::{
    ColumnRef, Connector, ForeignKey, IndexInfo, RawCatalog, RawColumn, RawTable, RowEstimate,
    UniqueColumn,
};
use edda_core::error::{ScanError, ScanResult};
use edda_core::models::{DataSource, EngineKind, Row};

/// Schema scanned when the data source names none.
pub const DEFAULT_SCHEMA: &str = "public";

const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct PostgresConnector {
    options: PgConnectOptions,
    schema: String,
    pool: OnceCell<PgPool>,
}

impl PostgresConnector {
    pub fn new(source: &DataSource) -> Self {
        let options = PgConnectOptions::new()
            .host(&source.host)
            .port(source.port_or_default())
            .database(&source.database)
            .username(&source.username)
            .password(&source.password)
            .application_name("edda");
        Self {
            options,
            schema: source
                .schema
                .clone()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
            pool: OnceCell::new(),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    async fn pool(&self) -> ScanResult<&PgPool> {
        self.pool
            .get_or_try_init(|| async {
                PgPoolOptions::new()
                    .max_connections(2)
                    .acquire_timeout(ACQUIRE_TIMEOUT)
                    .connect_with(self.options.clone())
                    .await
                    .map_err(|e| ScanError::Connection(e.to_string()))
            })
            .await
    }

    async fn fetch(&self, sql: &str) -> ScanResult<Vec<sqlx::postgres::PgRow>> {
        let pool = self.pool().await?;
        sqlx::query(sql)
            .bind(&self.schema)
            .fetch_all(pool)
            .await
            .map_err(|e| ScanError::Extraction(e.to_string()))
    }
}

/// Double-quote an identifier for interpolation into SQL.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn text(row: &sqlx::postgres::PgRow, column: &str) -> ScanResult<String> {
    row.try_get::<String, _>(column)
        .map_err(|e| ScanError::Extraction(e.to_string()))
}

fn opt_text(row: &sqlx::postgres::PgRow, column: &str) -> ScanResult<Option<String>> {
    row.try_get::<Option<String>, _>(column)
        .map_err(|e| ScanError::Extraction(e.to_string()))
}

const TABLES_SQL: &str = r#"
    SELECT table_schema::text AS table_schema, table_name::text AS table_name,
           table_type::text AS table_type
    FROM information_schema.tables
    WHERE table_schema = $1
    ORDER BY table_name
"#;

const COLUMNS_SQL: &str = r#"
    SELECT table_schema::text AS table_schema, table_name::text AS table_name,
           column_name::text AS column_name, data_type::text AS data_type,
           is_nullable::text AS is_nullable, column_default::text AS column_default,
           ordinal_position::int AS ordinal_position
    FROM information_schema.columns
    WHERE table_schema = $1
    ORDER BY table_name, ordinal_position
"#;

const PRIMARY_KEYS_SQL: &str = r#"
    SELECT tc.table_schema::text AS table_schema, tc.table_name::text AS table_name,
           kcu.column_name::text AS column_name
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
      ON tc.constraint_name = kcu.constraint_name
     AND tc.table_schema = kcu.table_schema
    WHERE tc.constraint_type = 'PRIMARY KEY'
      AND tc.table_schema = $1
"#;

const FOREIGN_KEYS_SQL: &str = r#"
    SELECT tc.table_schema::text AS from_schema, tc.table_name::text AS from_table,
           kcu.column_name::text AS from_column, ccu.table_schema::text AS to_schema,
           ccu.table_name::text AS to_table, ccu.column_name::text AS to_column,
           tc.constraint_name::text AS constraint_name
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
      ON tc.constraint_name = kcu.constraint_name
     AND tc.table_schema = kcu.table_schema
    JOIN information_schema.constraint_column_usage ccu
      ON ccu.constraint_name = tc.constraint_name
     AND ccu.table_schema = tc.table_schema
    WHERE tc.constraint_type = 'FOREIGN KEY'
      AND tc.table_schema = $1
"#;

const UNIQUE_SQL: &str = r#"
    SELECT tc.table_schema::text AS table_schema, tc.table_name::text AS table_name,
           kcu.column_name::text AS column_name, tc.constraint_name::text AS constraint_name
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
      ON tc.constraint_name = kcu.constraint_name
     AND tc.table_schema = kcu.table_schema
    WHERE tc.constraint_type = 'UNIQUE'
      AND tc.table_schema = $1
"#;

const INDEXES_SQL: &str = r#"
    SELECT schemaname::text AS table_schema, tablename::text AS table_name,
           indexname::text AS indexname, indexdef::text AS indexdef
    FROM pg_indexes
    WHERE schemaname = $1
"#;

const ESTIMATES_SQL: &str = r#"
    SELECT n.nspname::text AS table_schema, c.relname::text AS table_name,
           c.reltuples::bigint AS est_rows
    FROM pg_class c
    JOIN pg_namespace n ON n.oid = c.relnamespace
    WHERE n.nspname = $1 AND c.relkind = 'r'
"#;

#[async_trait]
impl Connector for PostgresConnector {
    fn engine(&self) -> EngineKind {
        EngineKind::Postgres
    }

    async fn test_connection(&self) -> ScanResult<()> {
        let pool = self.pool().await?;
        sqlx::query("SELECT 1")
            .execute(pool)
            .await
            .map_err(|e| ScanError::Connection(e.to_string()))?;
        Ok(())
    }

    async fn extract_catalog(&self) -> ScanResult<RawCatalog> {
        let mut catalog = RawCatalog {
            schema: self.schema.clone(),
            ..Default::default()
        };

        for row in self.fetch(TABLES_SQL).await? {
            catalog.tables.push(RawTable {
                schema: text(&row, "table_schema")?,
                name: text(&row, "table_name")?,
                table_type: opt_text(&row, "table_type")?.unwrap_or_default(),
            });
        }

        for row in self.fetch(COLUMNS_SQL).await? {
            catalog.columns.push(RawColumn {
                schema: text(&row, "table_schema")?,
                table: text(&row, "table_name")?,
                name: text(&row, "column_name")?,
                data_type: text(&row, "data_type")?,
                nullable: text(&row, "is_nullable")? == "YES",
                default_value: opt_text(&row, "column_default")?,
                ordinal_position: row
                    .try_get::<i32, _>("ordinal_position")
                    .map_err(|e| ScanError::Extraction(e.to_string()))?,
            });
        }

        for row in self.fetch(PRIMARY_KEYS_SQL).await? {
            catalog.primary_keys.push(ColumnRef {
                schema: text(&row, "table_schema")?,
                table: text(&row, "table_name")?,
                column: text(&row, "column_name")?,
            });
        }

        for row in self.fetch(FOREIGN_KEYS_SQL).await? {
            catalog.foreign_keys.push(ForeignKey {
                from_schema: text(&row, "from_schema")?,
                from_table: text(&row, "from_table")?,
                from_column: text(&row, "from_column")?,
                to_schema: text(&row, "to_schema")?,
                to_table: text(&row, "to_table")?,
                to_column: text(&row, "to_column")?,
                constraint_name: opt_text(&row, "constraint_name")?,
            });
        }

        for row in self.fetch(UNIQUE_SQL).await? {
            catalog.unique_constraints.push(UniqueColumn {
                schema: text(&row, "table_schema")?,
                table: text(&row, "table_name")?,
                column: text(&row, "column_name")?,
                constraint_name: opt_text(&row, "constraint_name")?,
            });
        }

        for row in self.fetch(INDEXES_SQL).await? {
            catalog.indexes.push(IndexInfo {
                schema: text(&row, "table_schema")?,
                table: text(&row, "table_name")?,
                name: text(&row, "indexname")?,
                definition: opt_text(&row, "indexdef")?,
            });
        }

        for row in self.fetch(ESTIMATES_SQL).await? {
            let rows: i64 = row
                .try_get("est_rows")
                .map_err(|e| ScanError::Extraction(e.to_string()))?;
            // Never-analyzed tables report -1.
            if rows < 0 {
                continue;
            }
            catalog.row_estimates.push(RowEstimate {
                schema: text(&row, "table_schema")?,
                table: text(&row, "table_name")?,
                rows,
            });
        }

        debug!(
            schema = %self.schema,
            tables = catalog.tables.len(),
            columns = catalog.columns.len(),
            "postgres catalog read"
        );
        Ok(catalog)
    }

    async fn sample_table(&self, schema: &str, table: &str, limit: usize) -> ScanResult<Vec<Row>> {
        let pool = self.pool().await?;
        let sql = format!(
            "SELECT row_to_json(t)::text AS row FROM {}.{} t LIMIT $1",
            quote_ident(schema),
            quote_ident(table)
        );
        let rows = sqlx::query(&sql)
            .bind(limit as i64)
            .fetch_all(pool)
            .await
            .map_err(|e| ScanError::Sampling(e.to_string()))?;

        rows.iter()
            .map(|row| {
                let json: String = row
                    .try_get("row")
                    .map_err(|e| ScanError::Sampling(e.to_string()))?;
                serde_json::from_str::<Row>(&json).map_err(|e| ScanError::Sampling(e.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn source(schema: Option<&str>) -> DataSource {
        DataSource {
            id: 1,
            name: "shop".into(),
            engine: EngineKind::Postgres,
            host: "localhost".into(),
            port: None,
            database: "shop".into(),
            schema: schema.map(str::to_string),
            username: "edda".into(),
            password: "edda".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn schema_defaults_to_public() {
        assert_eq!(PostgresConnector::new(&source(None)).schema(), "public");
        assert_eq!(PostgresConnector::new(&source(Some(""))).schema(), "public");
        assert_eq!(PostgresConnector::new(&source(Some("sales"))).schema(), "sales");
    }

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_ident("orders"), "\"orders\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
