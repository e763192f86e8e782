//! Schema extraction and structural fingerprinting.
//!
//! Turns a connector's [`RawCatalog`] into a canonical [`SchemaSnapshot`]:
//! tables sorted by name, columns sorted by table then ordinal position,
//! relationships kept in catalog order. The snapshot carries a SHA-256
//! fingerprint over structural facts only (never row estimates or
//! profiling output), so an unchanged schema always hashes the same.
//!
//! # Fingerprint input
//!
//! ```text
//! T|schema|name|type                       one per table, snapshot order
//! C|schema|table|column|type|YES|NO        one per column, snapshot order
//! R|from_table|from_col|to_table|to_col    one per relationship, sorted
//! ```
//!
//! Each line is newline-terminated. Relationship lines are sorted before
//! hashing because engines do not guarantee foreign-key enumeration
//! order; the stored relationship list itself keeps catalog order.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::connector::{ColumnRef, Connector, ForeignKey, IndexInfo, RawCatalog, UniqueColumn};
use crate::error::ScanResult;

/// Table type used when the catalog leaves it blank.
pub const DEFAULT_TABLE_TYPE: &str = "BASE TABLE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    pub schema: String,
    pub name: String,
    pub table_type: String,
    pub row_estimate: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub ordinal_position: i32,
    pub is_pk: bool,
}

/// Canonical structural catalog of one schema at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaSnapshot {
    pub schema: String,
    pub tables: Vec<TableInfo>,
    pub columns: Vec<ColumnInfo>,
    pub primary_keys: BTreeSet<ColumnRef>,
    pub relationships: Vec<ForeignKey>,
    pub unique_constraints: Vec<UniqueColumn>,
    pub indexes: Vec<IndexInfo>,
    pub fingerprint: String,
}

/// A named unique constraint with its columns, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, serde::Deserialize)]
pub struct UniqueGroup {
    pub name: Option<String>,
    pub columns: Vec<String>,
}

/// Records to persist for one run, derived from a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSchema {
    pub tables: Vec<NewTable>,
    pub relationships: Vec<ForeignKey>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTable {
    pub schema_name: String,
    pub table_name: String,
    pub table_type: String,
    pub row_estimate: Option<i64>,
    pub columns: Vec<NewColumn>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewColumn {
    pub column_name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default_value: Option<String>,
    pub is_pk: bool,
    pub is_fk: bool,
}

/// Run the connector's catalog queries and canonicalize the result.
///
/// Any connector failure propagates unchanged; no partial snapshot is
/// ever produced.
pub async fn extract_snapshot<C: Connector + ?Sized>(connector: &C) -> ScanResult<SchemaSnapshot> {
    let raw = connector.extract_catalog().await?;
    Ok(SchemaSnapshot::from_catalog(raw))
}

impl SchemaSnapshot {
    pub fn from_catalog(raw: RawCatalog) -> Self {
        let estimates: HashMap<(&str, &str), i64> = raw
            .row_estimates
            .iter()
            .map(|e| ((e.schema.as_str(), e.table.as_str()), e.rows))
            .collect();

        let mut tables: Vec<TableInfo> = raw
            .tables
            .iter()
            .map(|t| TableInfo {
                schema: t.schema.clone(),
                name: t.name.clone(),
                table_type: if t.table_type.is_empty() {
                    DEFAULT_TABLE_TYPE.to_string()
                } else {
                    t.table_type.clone()
                },
                row_estimate: estimates.get(&(t.schema.as_str(), t.name.as_str())).copied(),
            })
            .collect();
        tables.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.schema.cmp(&b.schema)));

        let primary_keys: BTreeSet<ColumnRef> = raw.primary_keys.into_iter().collect();

        let mut columns: Vec<ColumnInfo> = raw
            .columns
            .into_iter()
            .map(|c| {
                let is_pk = primary_keys.contains(&ColumnRef::new(&c.schema, &c.table, &c.name));
                ColumnInfo {
                    schema: c.schema,
                    table: c.table,
                    name: c.name,
                    data_type: c.data_type,
                    nullable: c.nullable,
                    default_value: c.default_value,
                    ordinal_position: c.ordinal_position,
                    is_pk,
                }
            })
            .collect();
        columns.sort_by(|a, b| {
            a.table
                .cmp(&b.table)
                .then_with(|| a.ordinal_position.cmp(&b.ordinal_position))
                .then_with(|| a.schema.cmp(&b.schema))
        });

        let fingerprint = fingerprint(&tables, &columns, &raw.foreign_keys);

        Self {
            schema: raw.schema,
            tables,
            columns,
            primary_keys,
            relationships: raw.foreign_keys,
            unique_constraints: raw.unique_constraints,
            indexes: raw.indexes,
            fingerprint,
        }
    }

    /// Build the per-run table/column/relationship records.
    ///
    /// Columns whose table is absent from the table list are dropped.
    /// `is_fk` marks columns on the referencing side of a relationship.
    pub fn to_run_schema(&self) -> RunSchema {
        let fk_sources: HashSet<(&str, &str, &str)> = self
            .relationships
            .iter()
            .map(|r| (r.from_schema.as_str(), r.from_table.as_str(), r.from_column.as_str()))
            .collect();

        let mut tables: Vec<NewTable> = self
            .tables
            .iter()
            .map(|t| NewTable {
                schema_name: t.schema.clone(),
                table_name: t.name.clone(),
                table_type: t.table_type.clone(),
                row_estimate: t.row_estimate,
                columns: Vec::new(),
            })
            .collect();

        let index: HashMap<(String, String), usize> = tables
            .iter()
            .enumerate()
            .map(|(i, t)| ((t.schema_name.clone(), t.table_name.clone()), i))
            .collect();

        for c in &self.columns {
            let Some(&i) = index.get(&(c.schema.clone(), c.table.clone())) else {
                continue;
            };
            let table = &mut tables[i];
            if table.columns.iter().any(|existing| existing.column_name == c.name) {
                continue;
            }
            table.columns.push(NewColumn {
                column_name: c.name.clone(),
                data_type: c.data_type.clone(),
                nullable: c.nullable,
                default_value: c.default_value.clone(),
                is_pk: c.is_pk,
                is_fk: fk_sources.contains(&(c.schema.as_str(), c.table.as_str(), c.name.as_str())),
            });
        }

        RunSchema {
            tables,
            relationships: self.relationships.clone(),
        }
    }

    /// Unique constraints of `schema.table`, grouped by constraint name
    /// in first-seen order.
    pub fn unique_groups(&self, schema: &str, table: &str) -> Vec<UniqueGroup> {
        let mut groups: Vec<UniqueGroup> = Vec::new();
        for u in self
            .unique_constraints
            .iter()
            .filter(|u| u.schema == schema && u.table == table)
        {
            match groups.iter_mut().find(|g| g.name == u.constraint_name) {
                Some(group) => group.columns.push(u.column.clone()),
                None => groups.push(UniqueGroup {
                    name: u.constraint_name.clone(),
                    columns: vec![u.column.clone()],
                }),
            }
        }
        groups
    }

    /// Index names of `schema.table`, in catalog order.
    pub fn index_names(&self, schema: &str, table: &str) -> Vec<String> {
        self.indexes
            .iter()
            .filter(|i| i.schema == schema && i.table == table)
            .map(|i| i.name.clone())
            .collect()
    }
}

/// Hex SHA-256 over the canonical structural lines.
pub fn fingerprint(tables: &[TableInfo], columns: &[ColumnInfo], relationships: &[ForeignKey]) -> String {
    let mut hasher = Sha256::new();

    for t in tables {
        hasher.update(format!("T|{}|{}|{}\n", t.schema, t.name, t.table_type).as_bytes());
    }
    for c in columns {
        let nullable = if c.nullable { "YES" } else { "NO" };
        hasher.update(
            format!(
                "C|{}|{}|{}|{}|{}\n",
                c.schema, c.table, c.name, c.data_type, nullable
            )
            .as_bytes(),
        );
    }

    let mut rel_lines: Vec<String> = relationships
        .iter()
        .map(|r| {
            format!(
                "R|{}|{}|{}|{}\n",
                r.from_table, r.from_column, r.to_table, r.to_column
            )
        })
        .collect();
    rel_lines.sort();
    for line in &rel_lines {
        hasher.update(line.as_bytes());
    }

    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::{RawColumn, RawTable, RowEstimate};

    fn col(table: &str, name: &str, pos: i32) -> RawColumn {
        RawColumn {
            schema: "public".into(),
            table: table.into(),
            name: name.into(),
            data_type: "integer".into(),
            nullable: false,
            default_value: None,
            ordinal_position: pos,
        }
    }

    fn fk(from: &str, from_col: &str, to: &str, to_col: &str) -> ForeignKey {
        ForeignKey {
            from_schema: "public".into(),
            from_table: from.into(),
            from_column: from_col.into(),
            to_schema: "public".into(),
            to_table: to.into(),
            to_column: to_col.into(),
            constraint_name: Some(format!("{}_{}_fkey", from, from_col)),
        }
    }

    fn catalog() -> RawCatalog {
        RawCatalog {
            schema: "public".into(),
            tables: vec![
                RawTable {
                    schema: "public".into(),
                    name: "payments".into(),
                    table_type: "BASE TABLE".into(),
                },
                RawTable {
                    schema: "public".into(),
                    name: "orders".into(),
                    table_type: String::new(),
                },
                RawTable {
                    schema: "public".into(),
                    name: "customers".into(),
                    table_type: "BASE TABLE".into(),
                },
            ],
            columns: vec![
                col("payments", "amount", 3),
                col("orders", "customer_id", 2),
                col("payments", "payment_id", 1),
                col("orders", "order_id", 1),
                col("payments", "order_id", 2),
                col("customers", "customer_id", 1),
                col("ghost", "id", 1),
            ],
            primary_keys: vec![
                ColumnRef::new("public", "orders", "order_id"),
                ColumnRef::new("public", "payments", "payment_id"),
                ColumnRef::new("public", "customers", "customer_id"),
            ],
            foreign_keys: vec![
                fk("payments", "order_id", "orders", "order_id"),
                fk("orders", "customer_id", "customers", "customer_id"),
            ],
            unique_constraints: vec![
                UniqueColumn {
                    schema: "public".into(),
                    table: "orders".into(),
                    column: "customer_id".into(),
                    constraint_name: Some("orders_natural_key".into()),
                },
                UniqueColumn {
                    schema: "public".into(),
                    table: "orders".into(),
                    column: "order_id".into(),
                    constraint_name: Some("orders_natural_key".into()),
                },
            ],
            indexes: vec![IndexInfo {
                schema: "public".into(),
                table: "orders".into(),
                name: "orders_pkey".into(),
                definition: None,
            }],
            row_estimates: vec![RowEstimate {
                schema: "public".into(),
                table: "orders".into(),
                rows: 1200,
            }],
        }
    }

    #[test]
    fn tables_and_columns_are_sorted() {
        let snap = SchemaSnapshot::from_catalog(catalog());
        let names: Vec<&str> = snap.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["customers", "orders", "payments"]);

        let cols: Vec<(&str, &str)> = snap
            .columns
            .iter()
            .map(|c| (c.table.as_str(), c.name.as_str()))
            .collect();
        assert_eq!(
            cols,
            vec![
                ("customers", "customer_id"),
                ("ghost", "id"),
                ("orders", "order_id"),
                ("orders", "customer_id"),
                ("payments", "payment_id"),
                ("payments", "order_id"),
                ("payments", "amount"),
            ]
        );
    }

    #[test]
    fn blank_table_type_defaults_and_estimates_attach() {
        let snap = SchemaSnapshot::from_catalog(catalog());
        let orders = snap.tables.iter().find(|t| t.name == "orders").unwrap();
        assert_eq!(orders.table_type, DEFAULT_TABLE_TYPE);
        assert_eq!(orders.row_estimate, Some(1200));
        let payments = snap.tables.iter().find(|t| t.name == "payments").unwrap();
        assert_eq!(payments.row_estimate, None);
    }

    #[test]
    fn relationships_keep_catalog_order() {
        let snap = SchemaSnapshot::from_catalog(catalog());
        assert_eq!(snap.relationships[0].from_table, "payments");
        assert_eq!(snap.relationships[1].from_table, "orders");
    }

    #[test]
    fn fingerprint_is_stable_across_input_order() {
        let a = SchemaSnapshot::from_catalog(catalog());

        let mut shuffled = catalog();
        shuffled.tables.reverse();
        shuffled.columns.reverse();
        shuffled.foreign_keys.reverse();
        let b = SchemaSnapshot::from_catalog(shuffled);

        assert_eq!(a.fingerprint, b.fingerprint);
        assert_eq!(a.fingerprint.len(), 64);
    }

    #[test]
    fn fingerprint_ignores_row_estimates() {
        let a = SchemaSnapshot::from_catalog(catalog());
        let mut changed = catalog();
        changed.row_estimates[0].rows = 99_999;
        changed.indexes.clear();
        let b = SchemaSnapshot::from_catalog(changed);
        assert_eq!(a.fingerprint, b.fingerprint);
    }

    #[test]
    fn fingerprint_changes_with_structure() {
        let a = SchemaSnapshot::from_catalog(catalog());

        let mut nullable = catalog();
        nullable.columns[0].nullable = true;
        assert_ne!(a.fingerprint, SchemaSnapshot::from_catalog(nullable).fingerprint);

        let mut no_fk = catalog();
        no_fk.foreign_keys.pop();
        assert_ne!(a.fingerprint, SchemaSnapshot::from_catalog(no_fk).fingerprint);
    }

    #[test]
    fn run_schema_flags_keys_and_drops_orphans() {
        let snap = SchemaSnapshot::from_catalog(catalog());
        let run = snap.to_run_schema();
        assert_eq!(run.tables.len(), 3);

        let payments = run.tables.iter().find(|t| t.table_name == "payments").unwrap();
        let order_id = payments.columns.iter().find(|c| c.column_name == "order_id").unwrap();
        assert!(order_id.is_fk);
        assert!(!order_id.is_pk);
        let payment_id = payments.columns.iter().find(|c| c.column_name == "payment_id").unwrap();
        assert!(payment_id.is_pk);
        assert!(!payment_id.is_fk);

        let total_columns: usize = run.tables.iter().map(|t| t.columns.len()).sum();
        assert_eq!(total_columns, 6, "ghost table column must be dropped");
    }

    #[test]
    fn unique_constraints_group_by_name() {
        let snap = SchemaSnapshot::from_catalog(catalog());
        let groups = snap.unique_groups("public", "orders");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name.as_deref(), Some("orders_natural_key"));
        assert_eq!(groups[0].columns, vec!["customer_id", "order_id"]);
        assert!(snap.unique_groups("public", "payments").is_empty());
        assert_eq!(snap.index_names("public", "orders"), vec!["orders_pkey"]);
    }
}
