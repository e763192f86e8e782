//! Configured data sources: registration, listing and connectivity checks.

use anyhow::Result;

use edda_core::models::DataSource;
use edda_core::store::Store;

use crate::config::Config;
use crate::registry::ConnectorRegistry;

/// Register the named data source from config and return the stored
/// profile with its identity.
pub async fn register_configured(
    store: &dyn Store,
    config: &Config,
    name: &str,
) -> Result<DataSource> {
    let ds = config.datasource(name)?;
    store.register_data_source(&ds.to_new_data_source(name)).await
}

pub async fn list_datasources(store: &dyn Store, config: &Config) -> Result<()> {
    let registered = store.list_data_sources().await?;

    println!(
        "{:<16} {:<10} {:<28} {:<16} {:<12} ID",
        "NAME", "ENGINE", "HOST", "DATABASE", "SCHEMA"
    );
    for (name, ds) in &config.datasources {
        let id = registered
            .iter()
            .find(|r| &r.name == name)
            .map(|r| r.id.to_string())
            .unwrap_or_else(|| "-".to_string());
        let host = match ds.port {
            Some(port) => format!("{}:{}", ds.host, port),
            None => ds.host.clone(),
        };
        println!(
            "{:<16} {:<10} {:<28} {:<16} {:<12} {}",
            name,
            ds.engine,
            host,
            ds.database,
            ds.schema.as_deref().unwrap_or("(default)"),
            id
        );
    }
    if config.datasources.is_empty() {
        println!("(no data sources configured)");
    }
    Ok(())
}

/// Run the engine's connection test. Returns `false` on failure after
/// printing the reason.
pub async fn test_datasource(
    store: &dyn Store,
    config: &Config,
    registry: &ConnectorRegistry,
    name: &str,
) -> Result<bool> {
    let source = register_configured(store, config, name).await?;
    let connector = registry.build(&source)?;
    match connector.test_connection().await {
        Ok(()) => {
            println!("{}: OK ({})", name, source.engine);
            Ok(true)
        }
        Err(e) => {
            println!("{}: FAILED: {}", name, e);
            Ok(false)
        }
    }
}
