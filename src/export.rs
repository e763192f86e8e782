//! Export a table document as markdown or JSON.
//!
//! Writes to a file when `--output` is given, otherwise to stdout for
//! piping.

use anyhow::{Context, Result};
use std::path::Path;

use edda_core::catalog::{self, ExportFormat};
use edda_core::store::Store;

pub async fn run_export(
    store: &dyn Store,
    table_id: i64,
    format: ExportFormat,
    output: Option<&Path>,
) -> Result<()> {
    let body = catalog::export_doc(store, table_id, format).await?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(path, &body)
                .with_context(|| format!("Failed to write export: {}", path.display()))?;
            eprintln!("Exported table {} to {}", table_id, path.display());
        }
        None => println!("{}", body),
    }

    Ok(())
}
