//! Scan orchestration.
//!
//! One scan run is a small state machine, `running → {completed,
//! failed}`, driven sequentially:
//!
//! ```text
//! create run (running)
//!   → extract snapshot, store fingerprint
//!   → replace run tables/columns/relationships
//!   → per table: sample → profile → score → metrics → joins → doc
//!   → completed
//! ```
//!
//! Any error after the run exists terminalizes it as `failed` with the
//! error text stored verbatim. Artifacts already written for earlier
//! tables are left in place.

use tracing::{debug, error, info};

use crate::connector::{Connector, ConnectorProvider};
use crate::docs::{generate_doc, joins_for_table, render_markdown, DocInput};
use crate::error::{ScanError, ScanResult};
use crate::models::{ScanMode, ScanRun, ScanStatus, TableMetrics, TableRecord};
use crate::profile::profile_sample;
use crate::progress::{ScanProgressEvent, ScanProgressReporter};
use crate::quality::QualityScorer;
use crate::schema::{extract_snapshot, SchemaSnapshot};
use crate::store::Store;

/// Parameters of one scan run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRequest {
    pub data_source_id: i64,
    /// Recorded on the run; both modes execute the same pipeline.
    pub mode: ScanMode,
    /// Maximum rows sampled per table.
    pub sample_size: u32,
}

/// Runs scans against a store with a given quality policy.
pub struct Scanner<'a> {
    store: &'a dyn Store,
    connectors: &'a dyn ConnectorProvider,
    scorer: QualityScorer,
}

impl<'a> Scanner<'a> {
    pub fn new(store: &'a dyn Store, connectors: &'a dyn ConnectorProvider) -> Self {
        Self {
            store,
            connectors,
            scorer: QualityScorer::default(),
        }
    }

    pub fn with_scorer(mut self, scorer: QualityScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Execute a full scan run and return its id.
    ///
    /// # Errors
    ///
    /// - `NotFound` when the data source does not exist (no run is created)
    /// - `RunFailed` when the run was created and then terminalized as
    ///   `failed`; the run id stays queryable
    pub async fn start_scan(
        &self,
        request: ScanRequest,
        progress: &dyn ScanProgressReporter,
    ) -> ScanResult<i64> {
        let source = self
            .store
            .get_data_source(request.data_source_id)
            .await?
            .ok_or_else(|| ScanError::not_found("data source", request.data_source_id))?;

        let run = self
            .store
            .create_scan_run(source.id, request.mode, request.sample_size)
            .await?;
        info!(
            scan_run_id = run.id,
            data_source = %source.name,
            engine = %source.engine,
            mode = %run.mode,
            sample_size = run.sample_size,
            "scan started"
        );

        let outcome = match self.connectors.connector_for(&source) {
            Ok(connector) => self.execute(&run, connector.as_ref(), progress).await,
            Err(e) => Err(e),
        };
        // A failed completion write still has to terminalize the run.
        let outcome = match outcome {
            Ok(()) => self
                .store
                .finish_scan_run(run.id, ScanStatus::Completed, None)
                .await
                .map(|_| ())
                .map_err(ScanError::from),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => {
                progress.report(ScanProgressEvent::Finished {
                    scan_run_id: run.id,
                    status: ScanStatus::Completed,
                });
                info!(scan_run_id = run.id, "scan completed");
                Ok(run.id)
            }
            Err(cause) => {
                let message = cause.to_string();
                error!(scan_run_id = run.id, error = %message, "scan failed");
                if let Err(e) = self
                    .store
                    .finish_scan_run(run.id, ScanStatus::Failed, Some(&message))
                    .await
                {
                    error!(scan_run_id = run.id, error = %e, "could not mark run failed");
                }
                progress.report(ScanProgressEvent::Finished {
                    scan_run_id: run.id,
                    status: ScanStatus::Failed,
                });
                Err(ScanError::RunFailed {
                    scan_run_id: run.id,
                    source: Box::new(cause),
                })
            }
        }
    }

    async fn execute(
        &self,
        run: &ScanRun,
        connector: &dyn Connector,
        progress: &dyn ScanProgressReporter,
    ) -> ScanResult<()> {
        progress.report(ScanProgressEvent::Extracting {
            scan_run_id: run.id,
        });
        let snapshot = extract_snapshot(connector).await?;
        info!(
            scan_run_id = run.id,
            tables = snapshot.tables.len(),
            columns = snapshot.columns.len(),
            relationships = snapshot.relationships.len(),
            fingerprint = %snapshot.fingerprint,
            "schema extracted"
        );
        self.store
            .set_scan_fingerprint(run.id, &snapshot.fingerprint)
            .await?;

        self.store
            .replace_run_schema(run.id, &snapshot.to_run_schema())
            .await?;

        let tables = self.store.list_tables(run.id).await?;
        let total = tables.len() as u64;
        for (i, table) in tables.iter().enumerate() {
            progress.report(ScanProgressEvent::Profiling {
                scan_run_id: run.id,
                table: table.qualified_name(),
                n: i as u64 + 1,
                total,
            });
            self.process_table(run, connector, &snapshot, table).await?;
        }
        Ok(())
    }

    async fn process_table(
        &self,
        run: &ScanRun,
        connector: &dyn Connector,
        snapshot: &SchemaSnapshot,
        table: &TableRecord,
    ) -> ScanResult<()> {
        let rows = connector
            .sample_table(&table.schema_name, &table.table_name, run.sample_size as usize)
            .await?;
        let profile = profile_sample(&rows);
        let quality = self.scorer.score(&profile.table);
        debug!(
            scan_run_id = run.id,
            table = %table.qualified_name(),
            rows = profile.table.row_sampled,
            score = quality.score,
            "table profiled"
        );

        self.store
            .upsert_table_metrics(
                table.id,
                &TableMetrics {
                    profile: profile.table.clone(),
                    quality_score: quality.score,
                    reasons: quality.reasons.clone(),
                },
            )
            .await?;

        let columns = self.store.list_columns(table.id).await?;
        for summary in &profile.columns {
            let Some(column) = columns.iter().find(|c| c.column_name == summary.name) else {
                continue;
            };
            self.store.set_column_pii(column.id, summary.pii_risk).await?;
            self.store
                .upsert_column_metrics(column.id, &summary.profile)
                .await?;
        }

        let relationships = self.store.list_relationships(run.id).await?;
        let doc = generate_doc(DocInput {
            schema_name: &table.schema_name,
            table_name: &table.table_name,
            primary_keys: columns
                .iter()
                .filter(|c| c.is_pk)
                .map(|c| c.column_name.clone())
                .collect(),
            foreign_keys: columns
                .iter()
                .filter(|c| c.is_fk)
                .map(|c| c.column_name.clone())
                .collect(),
            joins: joins_for_table(&relationships, &table.schema_name, &table.table_name),
            unique: snapshot.unique_groups(&table.schema_name, &table.table_name),
            indexes: snapshot.index_names(&table.schema_name, &table.table_name),
            quality: Some(&quality),
        });
        let markdown = render_markdown(&doc);
        self.store.upsert_table_doc(table.id, &doc, &markdown).await?;
        Ok(())
    }
}

/// Convenience wrapper: scan with the default quality policy.
pub async fn start_scan(
    store: &dyn Store,
    connectors: &dyn ConnectorProvider,
    request: ScanRequest,
    progress: &dyn ScanProgressReporter,
) -> ScanResult<i64> {
    Scanner::new(store, connectors)
        .start_scan(request, progress)
        .await
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::models::{EngineKind, PiiRisk};
    use crate::progress::NoProgress;
    use crate::store::memory::InMemoryStore;
    use crate::testing::{new_source, shop, RejectCompletion};

    #[derive(Default)]
    struct Recorder(Mutex<Vec<ScanProgressEvent>>);

    impl ScanProgressReporter for Recorder {
        fn report(&self, event: ScanProgressEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    async fn setup(engine: EngineKind) -> (InMemoryStore, i64) {
        let store = InMemoryStore::new();
        let ds = store.register_data_source(&new_source(engine)).await.unwrap();
        (store, ds.id)
    }

    fn request(data_source_id: i64) -> ScanRequest {
        ScanRequest {
            data_source_id,
            mode: ScanMode::Quick,
            sample_size: 100,
        }
    }

    #[tokio::test]
    async fn completed_run_persists_every_artifact() {
        let (store, ds) = setup(EngineKind::Postgres).await;
        let connector = shop();
        let recorder = Recorder::default();

        let run_id = start_scan(&store, &connector, request(ds), &recorder)
            .await
            .unwrap();

        let run = store.get_scan_run(run_id).await.unwrap().unwrap();
        assert_eq!(run.status, ScanStatus::Completed);
        assert!(run.finished_at.is_some());
        assert_eq!(run.error, None);
        let expected = SchemaSnapshot::from_catalog(connector.catalog.clone()).fingerprint;
        assert_eq!(run.fingerprint.as_deref(), Some(expected.as_str()));

        let tables = store.list_tables(run_id).await.unwrap();
        assert_eq!(tables.len(), 3);
        for t in &tables {
            assert!(store.get_table_metrics(t.id).await.unwrap().is_some());
            assert!(store.get_table_doc(t.id).await.unwrap().is_some());
        }

        let orders = tables.iter().find(|t| t.table_name == "orders").unwrap();
        let metrics = store.get_table_metrics(orders.id).await.unwrap().unwrap();
        assert_eq!(metrics.profile.row_sampled, 4);
        assert_eq!(metrics.profile.avg_null_pct, Some(25.0));
        assert_eq!(metrics.quality_score, 90);
        assert_eq!(metrics.reasons.len(), 1);

        let customers = tables.iter().find(|t| t.table_name == "customers").unwrap();
        let cols = store.list_columns(customers.id).await.unwrap();
        let email = cols.iter().find(|c| c.column_name == "email").unwrap();
        assert_eq!(email.pii_risk, Some(PiiRisk::High));
        let doc = store.get_table_doc(customers.id).await.unwrap().unwrap();
        assert!(doc.markdown.contains("## Unique constraints"));
        assert!(doc.markdown.contains("customers_email_key: email"));

        let events = recorder.0.lock().unwrap();
        assert_eq!(events.first(), Some(&ScanProgressEvent::Extracting { scan_run_id: run_id }));
        assert_eq!(
            events.last(),
            Some(&ScanProgressEvent::Finished {
                scan_run_id: run_id,
                status: ScanStatus::Completed
            })
        );
    }

    #[tokio::test]
    async fn empty_table_scores_full() {
        let (store, ds) = setup(EngineKind::Postgres).await;
        let run_id = start_scan(&store, &shop(), request(ds), &NoProgress)
            .await
            .unwrap();
        let tables = store.list_tables(run_id).await.unwrap();
        let payments = tables.iter().find(|t| t.table_name == "payments").unwrap();
        let metrics = store.get_table_metrics(payments.id).await.unwrap().unwrap();
        assert_eq!(metrics.profile.row_sampled, 0);
        assert_eq!(metrics.quality_score, 100);
        assert!(metrics.reasons.is_empty());
        for c in store.list_columns(payments.id).await.unwrap() {
            assert!(store.get_column_metrics(c.id).await.unwrap().is_none());
            assert_eq!(c.pii_risk, None);
        }
    }

    #[tokio::test]
    async fn extraction_failure_persists_nothing() {
        let (store, ds) = setup(EngineKind::Postgres).await;
        let mut connector = shop();
        connector.fail_extract = Some("relation pg_class does not exist".into());

        let err = start_scan(&store, &connector, request(ds), &NoProgress)
            .await
            .unwrap_err();
        let run_id = err.scan_run_id().unwrap();
        let run = store.get_scan_run(run_id).await.unwrap().unwrap();
        assert_eq!(run.status, ScanStatus::Failed);
        assert_eq!(
            run.error.as_deref(),
            Some("schema extraction failed: relation pg_class does not exist")
        );
        assert!(run.fingerprint.is_none());
        assert!(store.list_tables(run_id).await.unwrap().is_empty());
        assert!(store.list_relationships(run_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sampling_failure_keeps_earlier_tables() {
        let (store, ds) = setup(EngineKind::Postgres).await;
        let mut connector = shop();
        connector.fail_sample_on = Some("orders".into());

        let err = start_scan(&store, &connector, request(ds), &NoProgress)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScanError::RunFailed { ref source, .. } if matches!(**source, ScanError::Sampling(_))
        ));
        let run_id = err.scan_run_id().unwrap();
        let run = store.get_scan_run(run_id).await.unwrap().unwrap();
        assert_eq!(run.status, ScanStatus::Failed);

        let tables = store.list_tables(run_id).await.unwrap();
        let customers = tables.iter().find(|t| t.table_name == "customers").unwrap();
        let orders = tables.iter().find(|t| t.table_name == "orders").unwrap();
        let payments = tables.iter().find(|t| t.table_name == "payments").unwrap();
        assert!(store.get_table_doc(customers.id).await.unwrap().is_some());
        assert!(store.get_table_metrics(orders.id).await.unwrap().is_none());
        assert!(store.get_table_doc(payments.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_data_source_creates_no_run() {
        let (store, _) = setup(EngineKind::Postgres).await;
        let err = start_scan(&store, &shop(), request(99), &NoProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::NotFound { entity: "data source", .. }));
        assert!(store.recent_scan_runs(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unsupported_engine_fails_the_run() {
        let (store, ds) = setup(EngineKind::Snowflake).await;
        let err = start_scan(&store, &shop(), request(ds), &NoProgress)
            .await
            .unwrap_err();
        let run = store
            .get_scan_run(err.scan_run_id().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(run.status, ScanStatus::Failed);
        assert_eq!(run.error.as_deref(), Some("unsupported engine: snowflake"));
    }

    #[tokio::test]
    async fn rescanning_unchanged_schema_keeps_fingerprint() {
        let (store, ds) = setup(EngineKind::Postgres).await;
        let first = start_scan(&store, &shop(), request(ds), &NoProgress)
            .await
            .unwrap();
        let mut reordered = shop();
        reordered.catalog.foreign_keys.reverse();
        let second = start_scan(&store, &reordered, request(ds), &NoProgress)
            .await
            .unwrap();
        let a = store.get_scan_run(first).await.unwrap().unwrap();
        let b = store.get_scan_run(second).await.unwrap().unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.fingerprint, b.fingerprint);
    }

    #[tokio::test]
    async fn failed_completion_write_marks_run_failed() {
        let store = RejectCompletion::default();
        let ds = store
            .register_data_source(&new_source(EngineKind::Postgres))
            .await
            .unwrap();
        let recorder = Recorder::default();

        let err = start_scan(&store, &shop(), request(ds.id), &recorder)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ScanError::RunFailed { ref source, .. } if matches!(**source, ScanError::Persistence(_))
        ));
        let run = store
            .get_scan_run(err.scan_run_id().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(run.status, ScanStatus::Failed);
        assert!(run.finished_at.is_some());
        assert_eq!(run.error.as_deref(), Some("persistence failed: disk I/O error"));
        assert_eq!(
            recorder.0.lock().unwrap().last(),
            Some(&ScanProgressEvent::Finished {
                scan_run_id: run.id,
                status: ScanStatus::Failed
            })
        );
    }

    #[tokio::test]
    async fn custom_scorer_replaces_default_rules() {
        let (store, ds) = setup(EngineKind::Postgres).await;
        let connector = shop();
        let run_id = Scanner::new(&store, &connector)
            .with_scorer(QualityScorer::new(Vec::new()))
            .start_scan(request(ds), &NoProgress)
            .await
            .unwrap();

        let tables = store.list_tables(run_id).await.unwrap();
        let orders = tables.iter().find(|t| t.table_name == "orders").unwrap();
        let metrics = store.get_table_metrics(orders.id).await.unwrap().unwrap();
        assert_eq!(metrics.profile.avg_null_pct, Some(25.0));
        assert_eq!(metrics.quality_score, 100);
        assert!(metrics.reasons.is_empty());
    }
}
