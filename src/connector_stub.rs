//! Placeholder connector for engines without a driver.
//!
//! Constructible for any engine so data sources can be registered and
//! listed; every capability fails with `UnsupportedEngine`.

use async_trait::async_trait;

use edda_core::connector::{Connector, RawCatalog};
use edda_core::error::{ScanError, ScanResult};
use edda_core::models::{EngineKind, Row};

pub struct UnsupportedConnector {
    engine: EngineKind,
}

impl UnsupportedConnector {
    pub fn new(engine: EngineKind) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Connector for UnsupportedConnector {
    fn engine(&self) -> EngineKind {
        self.engine
    }

    async fn test_connection(&self) -> ScanResult<()> {
        Err(ScanError::UnsupportedEngine(self.engine))
    }

    async fn extract_catalog(&self) -> ScanResult<RawCatalog> {
        Err(ScanError::UnsupportedEngine(self.engine))
    }

    async fn sample_table(&self, _schema: &str, _table: &str, _limit: usize) -> ScanResult<Vec<Row>> {
        Err(ScanError::UnsupportedEngine(self.engine))
    }
}
