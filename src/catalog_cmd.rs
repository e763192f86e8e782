//! Read commands over persisted scan output.
//!
//! Each command resolves through [`edda_core::catalog`] and prints pretty
//! JSON on stdout.

use anyhow::Result;
use serde::Serialize;

use edda_core::catalog;
use edda_core::store::Store;

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn status(store: &dyn Store, scan_run_id: i64) -> Result<()> {
    print_json(&catalog::scan_status(store, scan_run_id).await?)
}

pub async fn recent(store: &dyn Store, limit: usize) -> Result<()> {
    print_json(&catalog::recent_scans(store, limit).await?)
}

pub async fn tables(store: &dyn Store, scan_run_id: i64) -> Result<()> {
    print_json(&catalog::tables_for_run(store, scan_run_id).await?)
}

pub async fn columns(store: &dyn Store, table_id: i64) -> Result<()> {
    print_json(&catalog::table_columns(store, table_id).await?)
}

pub async fn relationships(store: &dyn Store, table_id: i64) -> Result<()> {
    print_json(&catalog::table_relationships(store, table_id).await?)
}

pub async fn quality(store: &dyn Store, table_id: i64) -> Result<()> {
    print_json(&catalog::table_quality(store, table_id).await?)
}

/// Print the stored document, as markdown unless `json` is set.
pub async fn docs(store: &dyn Store, table_id: i64, json: bool) -> Result<()> {
    let doc = catalog::table_doc(store, table_id).await?;
    if json {
        print_json(&doc)
    } else {
        println!("{}", doc.markdown);
        Ok(())
    }
}
