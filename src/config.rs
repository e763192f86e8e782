//! TOML configuration.
//!
//! One immutable [`Config`] is loaded per process and passed explicitly
//! to every command. Data sources are declared as `[datasources.<name>]`
//! tables and registered in the metadata store by name on first use.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use edda_core::models::{EngineKind, NewDataSource, ScanMode};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub datasources: BTreeMap<String, DataSourceConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScanConfig {
    #[serde(default)]
    pub default_mode: ScanMode,
    #[serde(default = "default_sample_size")]
    pub default_sample_size: u32,
    #[serde(default = "default_max_sample_size")]
    pub max_sample_size: u32,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            default_mode: ScanMode::Quick,
            default_sample_size: default_sample_size(),
            max_sample_size: default_max_sample_size(),
        }
    }
}

fn default_sample_size() -> u32 {
    500
}
fn default_max_sample_size() -> u32 {
    100_000
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            format: LogFormat::Pretty,
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

#[derive(Deserialize, Clone)]
pub struct DataSourceConfig {
    pub engine: EngineKind,
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    pub database: String,
    #[serde(default)]
    pub schema: Option<String>,
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for DataSourceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSourceConfig")
            .field("engine", &self.engine)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl DataSourceConfig {
    pub fn to_new_data_source(&self, name: &str) -> NewDataSource {
        NewDataSource {
            name: name.to_string(),
            engine: self.engine,
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
            schema: self.schema.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

impl Config {
    pub fn datasource(&self, name: &str) -> Result<&DataSourceConfig> {
        self.datasources.get(name).with_context(|| {
            let known: Vec<&str> = self.datasources.keys().map(String::as_str).collect();
            format!(
                "Unknown data source '{}'. Configured: {}",
                name,
                if known.is_empty() {
                    "(none)".to_string()
                } else {
                    known.join(", ")
                }
            )
        })
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    // Validate scan
    if config.scan.default_sample_size == 0 {
        anyhow::bail!("scan.default_sample_size must be > 0");
    }
    if config.scan.max_sample_size == 0 {
        anyhow::bail!("scan.max_sample_size must be > 0");
    }
    if config.scan.default_sample_size > config.scan.max_sample_size {
        anyhow::bail!(
            "scan.default_sample_size ({}) must be <= scan.max_sample_size ({})",
            config.scan.default_sample_size,
            config.scan.max_sample_size
        );
    }

    // Validate datasources
    for (name, ds) in &config.datasources {
        if ds.host.trim().is_empty() {
            anyhow::bail!("datasources.{}.host must not be empty", name);
        }
        if ds.database.trim().is_empty() {
            anyhow::bail!("datasources.{}.database must not be empty", name);
        }
        if ds.username.trim().is_empty() {
            anyhow::bail!("datasources.{}.username must not be empty", name);
        }
    }

    Ok(config)
}
