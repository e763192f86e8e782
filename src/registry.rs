//! Engine → connector registry.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │            ConnectorRegistry             │
//! │  ┌──────────┐ ┌───────────┐ ┌─────────┐  │
//! │  │ postgres │ │ sqlserver │ │snowflake│  │
//! │  │  (sqlx)  │ │  (stub)   │ │ (stub)  │  │
//! │  └──────────┘ └───────────┘ └─────────┘  │
//! └──────────────┬───────────────────────────┘
//!                ▼
//!        Scanner::start_scan() → scan pipeline
//! ```
//!
//! Custom engines replace an entry with [`ConnectorRegistry::register`].

use std::collections::HashMap;

use edda_core::connector::{Connector, ConnectorProvider};
use edda_core::error::{ScanError, ScanResult};
use edda_core::models::{DataSource, EngineKind};

use crate::connector_postgres::PostgresConnector;
use crate::connector_stub::UnsupportedConnector;

/// Builds a connector bound to one data source.
pub type ConnectorFactory = Box<dyn Fn(&DataSource) -> Box<dyn Connector> + Send + Sync>;

pub struct ConnectorRegistry {
    factories: HashMap<EngineKind, ConnectorFactory>,
}

impl ConnectorRegistry {
    /// Create an empty registry. Every engine is unsupported until registered.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry with the built-in PostgreSQL connector and stubs for the
    /// other engines.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(
            EngineKind::Postgres,
            Box::new(|ds: &DataSource| -> Box<dyn Connector> {
                Box::new(PostgresConnector::new(ds))
            }),
        );
        for engine in [EngineKind::Sqlserver, EngineKind::Snowflake] {
            registry.register(
                engine,
                Box::new(move |_: &DataSource| -> Box<dyn Connector> {
                    Box::new(UnsupportedConnector::new(engine))
                }),
            );
        }
        registry
    }

    /// Register (or replace) the factory for an engine.
    pub fn register(&mut self, engine: EngineKind, factory: ConnectorFactory) {
        self.factories.insert(engine, factory);
    }

    pub fn build(&self, source: &DataSource) -> ScanResult<Box<dyn Connector>> {
        self.factories
            .get(&source.engine)
            .map(|factory| factory(source))
            .ok_or(ScanError::UnsupportedEngine(source.engine))
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ConnectorProvider for ConnectorRegistry {
    fn connector_for(&self, source: &DataSource) -> ScanResult<Box<dyn Connector>> {
        self.build(source)
    }
}
