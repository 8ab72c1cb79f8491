//! Orchestrator module for the trial indexer pipeline.
//!
//! Coordinates the source, processor, and loader components for one full
//! rebuild of the search index.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::PipelineError;
use crate::loader::SearchLoader;
use crate::processor::{
    group_by_key, ChildGroups, DocumentAssembler, FieldEnricher, RowFailure,
};
use crate::source::{Table, TableLoader, TableRow};
use trial_indexer_shared::TrialDocument;

/// Base table every document starts from.
pub const DEFAULT_BASE_TABLE: &str = "studies";

/// Column joining child tables to the base table.
pub const DEFAULT_KEY_COLUMN: &str = "nct_id";

/// Child tables nested into each document.
pub const DEFAULT_CHILD_TABLES: &[&str] = &[
    "brief_summaries",
    "study_references",
    "interventions",
    "conditions",
    "keywords",
    "detailed_descriptions",
    "drop_withdrawals",
    "sponsors",
    "outcomes",
    "outcome_counts",
    "milestones",
    "facilities",
    "facility_contacts",
    "facility_investigators",
    "designs",
    "design_groups",
    "design_outcomes",
    "countries",
    "baseline_counts",
    "calculated_values",
    "central_contacts",
    "links",
];

/// Produced documents between progress log lines.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 10_000;

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub base_table: String,
    pub child_tables: Vec<String>,
    pub key_column: String,
    /// Size of the document channel buffer.
    pub channel_buffer_size: usize,
    /// Documents enriched concurrently.
    pub enrich_concurrency: usize,
    pub progress_interval: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            base_table: DEFAULT_BASE_TABLE.to_string(),
            child_tables: DEFAULT_CHILD_TABLES.iter().map(|t| t.to_string()).collect(),
            key_column: DEFAULT_KEY_COLUMN.to_string(),
            channel_buffer_size: 1000,
            enrich_concurrency: 4,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.base_table.trim().is_empty() {
            return Err(PipelineError::config("base table must not be empty"));
        }
        if self.key_column.trim().is_empty() {
            return Err(PipelineError::config("key column must not be empty"));
        }
        if self.channel_buffer_size == 0 {
            return Err(PipelineError::config("channel buffer size must be positive"));
        }
        if self.enrich_concurrency == 0 {
            return Err(PipelineError::config("enrich concurrency must be positive"));
        }
        if self.progress_interval == 0 {
            return Err(PipelineError::config("progress interval must be positive"));
        }

        let mut seen = HashSet::new();
        for table in &self.child_tables {
            if table.trim().is_empty() {
                return Err(PipelineError::config("child table names must not be empty"));
            }
            if *table == self.base_table {
                return Err(PipelineError::config(format!(
                    "{} is the base table and cannot be a child table",
                    table
                )));
            }
            if !seen.insert(table.as_str()) {
                return Err(PipelineError::config(format!(
                    "child table {} listed twice",
                    table
                )));
            }
        }

        Ok(())
    }
}

/// Counters and timing of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Documents assembled and handed to the loader.
    pub documents_produced: usize,
    /// Base rows that did not become a document.
    pub rows_skipped: usize,
    /// Documents the index accepted.
    pub succeeded: usize,
    /// Documents the index rejected or never acknowledged.
    pub failed: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elapsed = self.finished_at - self.started_at;
        write!(
            f,
            "run {}: {} documents produced, {} rows skipped, {} indexed, {} failed in {:.1}s",
            self.run_id,
            self.documents_produced,
            self.rows_skipped,
            self.succeeded,
            self.failed,
            elapsed.num_milliseconds() as f64 / 1000.0
        )
    }
}

type Produced = Result<TrialDocument, RowFailure>;

/// Orchestrator that coordinates the pipeline components.
///
/// The orchestrator:
/// - Loads and groups the configured tables
/// - Recreates the index before any document is written
/// - Streams documents from the producer task to the loader
/// - Reports the run's counters
pub struct Orchestrator {
    tables: Arc<dyn TableLoader>,
    enricher: FieldEnricher,
    loader: SearchLoader,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Create a new orchestrator with the given components.
    pub fn new(
        tables: Arc<dyn TableLoader>,
        enricher: FieldEnricher,
        loader: SearchLoader,
    ) -> Self {
        Self::with_config(tables, enricher, loader, OrchestratorConfig::default())
    }

    /// Create a new orchestrator with custom configuration.
    pub fn with_config(
        tables: Arc<dyn TableLoader>,
        enricher: FieldEnricher,
        loader: SearchLoader,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            tables,
            enricher,
            loader,
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run the pipeline once.
    ///
    /// Table, configuration and index setup failures abort the run. Row and
    /// document failures are counted in the returned summary.
    #[instrument(skip(self), fields(base_table = %self.config.base_table))]
    pub async fn run(&mut self) -> Result<RunSummary, PipelineError> {
        self.config.validate()?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(run_id = %run_id, "Starting trial indexer run");

        let (base, children) = self.load_tables().await?;
        let assembler = self.build_assembler(&base, children);

        self.loader.recreate_index().await?;

        let (tx, mut rx) = mpsc::channel::<Produced>(self.config.channel_buffer_size);
        let producer = spawn_producer(
            assembler,
            base.rows,
            self.enricher.clone(),
            self.config.enrich_concurrency,
            tx,
        );

        let mut documents_produced = 0usize;
        let mut rows_skipped = 0usize;
        while let Some(produced) = rx.recv().await {
            match produced {
                Ok(document) => {
                    self.loader.load(&document).await;
                    documents_produced += 1;
                    if documents_produced % self.config.progress_interval == 0 {
                        info!(count = documents_produced, "Documents produced");
                    }
                }
                Err(failure) => {
                    warn!(
                        position = failure.position,
                        reason = %failure.reason,
                        "Skipping base row"
                    );
                    rows_skipped += 1;
                }
            }
        }

        self.loader.flush().await;
        producer.await?;

        let stats = self.loader.take_stats();
        let summary = RunSummary {
            run_id,
            started_at,
            finished_at: Utc::now(),
            documents_produced,
            rows_skipped,
            succeeded: stats.succeeded,
            failed: stats.failed,
        };

        info!(
            run_id = %run_id,
            documents_produced = summary.documents_produced,
            rows_skipped = summary.rows_skipped,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Trial indexer run complete"
        );
        Ok(summary)
    }

    /// Load the base table and every child table off the async runtime.
    async fn load_tables(&self) -> Result<(Table, Vec<Table>), PipelineError> {
        let loader = Arc::clone(&self.tables);
        let config = self.config.clone();

        tokio::task::spawn_blocking(move || -> Result<(Table, Vec<Table>), PipelineError> {
            let base = loader.load(&config.base_table)?;
            require_key_column(&base, &config.key_column)?;

            let children = config
                .child_tables
                .iter()
                .map(|name| {
                    let table = loader.load(name)?;
                    require_key_column(&table, &config.key_column)?;
                    Ok(table)
                })
                .collect::<Result<Vec<_>, PipelineError>>()?;

            Ok((base, children))
        })
        .await?
    }

    fn build_assembler(&self, base: &Table, children: Vec<Table>) -> DocumentAssembler {
        let key_column = self.config.key_column.as_str();
        let grouped = children
            .into_iter()
            .map(|table| {
                let name = table.name.clone();
                ChildGroups::new(name, group_by_key(table.into_valid_rows(), key_column))
            })
            .collect();

        let assembler = DocumentAssembler::new(key_column, grouped);
        for column in assembler.shadowed_columns(&base.columns) {
            warn!(
                table = %column,
                "Base column replaced by the child collection of the same name"
            );
        }
        assembler
    }
}

fn require_key_column(table: &Table, key_column: &str) -> Result<(), PipelineError> {
    if table.has_column(key_column) {
        Ok(())
    } else {
        Err(PipelineError::config(format!(
            "table {} has no {} column",
            table.name, key_column
        )))
    }
}

/// Assemble and enrich documents on a separate task.
///
/// At most `concurrency` documents are enriched at once and outcomes are
/// sent in base-table order. The bounded channel holds the producer back
/// when the loader falls behind.
fn spawn_producer(
    assembler: DocumentAssembler,
    rows: Vec<TableRow>,
    enricher: FieldEnricher,
    concurrency: usize,
    tx: mpsc::Sender<Produced>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut outcomes = futures::stream::iter(assembler.assemble_all(rows))
            .map(|outcome| {
                let enricher = enricher.clone();
                async move {
                    match outcome {
                        Ok(mut document) => {
                            enricher.enrich(&mut document).await;
                            Ok(document)
                        }
                        Err(failure) => Err(failure),
                    }
                }
            })
            .buffered(concurrency);

        while let Some(outcome) = outcomes.next().await {
            if tx.send(outcome).await.is_err() {
                warn!("Document channel closed, stopping producer");
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocoding::{DisabledGeocoder, GeocodeCache, DEFAULT_GEOCODE_TIMEOUT};
    use crate::loader::LoaderConfig;
    use crate::source::MalformedRow;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::sync::Mutex;
    use trial_indexer_repository::{
        BatchOperationResult, BatchOperationSummary, BulkDocument, SearchIndexClient,
        SearchIndexError, SearchIndexProvider,
    };
    use trial_indexer_shared::{RowRecord, Scalar};

    /// In-memory table loader.
    struct MemoryTables {
        tables: HashMap<String, Table>,
    }

    impl MemoryTables {
        fn new(tables: Vec<Table>) -> Self {
            Self {
                tables: tables.into_iter().map(|t| (t.name.clone(), t)).collect(),
            }
        }
    }

    impl TableLoader for MemoryTables {
        fn load(&self, table: &str) -> Result<Table, PipelineError> {
            self.tables
                .get(table)
                .cloned()
                .ok_or_else(|| PipelineError::table(table, "no such table"))
        }
    }

    /// In-memory index keeping the last body per id.
    #[derive(Default)]
    struct MemoryIndex {
        documents: Mutex<HashMap<String, Value>>,
        calls: Mutex<Vec<String>>,
        reject: Vec<String>,
        fail_create: bool,
    }

    #[async_trait]
    impl SearchIndexProvider for MemoryIndex {
        fn index_name(&self) -> &str {
            "trials"
        }

        async fn delete_index(&self, _timeout: Duration) -> Result<(), SearchIndexError> {
            self.calls.lock().await.push("delete".into());
            self.documents.lock().await.clear();
            Ok(())
        }

        async fn create_index(&self, _timeout: Duration) -> Result<(), SearchIndexError> {
            self.calls.lock().await.push("create".into());
            if self.fail_create {
                return Err(SearchIndexError::index_management("invalid mappings"));
            }
            Ok(())
        }

        async fn bulk_index_documents(
            &self,
            documents: &[BulkDocument],
        ) -> Result<BatchOperationSummary, SearchIndexError> {
            self.calls.lock().await.push("bulk".into());
            let mut stored = self.documents.lock().await;
            let results = documents
                .iter()
                .map(|doc| {
                    if self.reject.contains(&doc.id) {
                        BatchOperationResult::failed(
                            doc.id.clone(),
                            SearchIndexError::document_rejected("mapper_parsing_exception"),
                        )
                    } else {
                        stored.insert(doc.id.clone(), doc.body.clone());
                        BatchOperationResult::succeeded(doc.id.clone())
                    }
                })
                .collect();
            Ok(BatchOperationSummary::from_results(results))
        }
    }

    fn table(name: &str, columns: &[&str], rows: Vec<TableRow>) -> Table {
        let columns: Arc<[String]> = columns.iter().map(|c| c.to_string()).collect::<Vec<_>>().into();
        Table::new(name, columns, rows)
    }

    fn row(columns: &[&str], values: &[&str]) -> TableRow {
        Ok(RowRecord::from_pairs(
            columns
                .iter()
                .zip(values)
                .map(|(c, v)| (c.to_string(), Scalar::infer(v))),
        ))
    }

    fn studies(ids: &[&str]) -> Table {
        let columns = ["nct_id", "brief_title"];
        table(
            "studies",
            &columns,
            ids.iter().map(|id| row(&columns, &[*id, "A title"])).collect(),
        )
    }

    fn conditions() -> Table {
        let columns = ["id", "nct_id", "name"];
        table(
            "conditions",
            &columns,
            vec![
                row(&columns, &["1", "NCT1", "Asthma"]),
                row(&columns, &["2", "NCT2", "Flu"]),
                row(&columns, &["3", "NCT1", "COPD"]),
            ],
        )
    }

    fn config() -> OrchestratorConfig {
        OrchestratorConfig {
            child_tables: vec!["conditions".to_string()],
            enrich_concurrency: 2,
            channel_buffer_size: 4,
            ..OrchestratorConfig::default()
        }
    }

    fn orchestrator(tables: Vec<Table>, index: Arc<MemoryIndex>, chunk_size: usize) -> Orchestrator {
        let cache = Arc::new(GeocodeCache::new(Arc::new(DisabledGeocoder), DEFAULT_GEOCODE_TIMEOUT));
        let client = Arc::new(SearchIndexClient::new(index));
        Orchestrator::with_config(
            Arc::new(MemoryTables::new(tables)),
            FieldEnricher::new(cache),
            SearchLoader::with_config(client, LoaderConfig { chunk_size }),
            config(),
        )
    }

    #[tokio::test]
    async fn test_run_indexes_every_document() {
        let index = Arc::new(MemoryIndex::default());
        let mut orchestrator =
            orchestrator(vec![studies(&["NCT1", "NCT2", "NCT3"]), conditions()], index.clone(), 2);

        let summary = orchestrator.run().await.unwrap();

        assert_eq!(summary.documents_produced, 3);
        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.rows_skipped, 0);

        let documents = index.documents.lock().await;
        assert_eq!(documents["NCT1"]["conditions"].as_array().unwrap().len(), 2);
        assert_eq!(documents["NCT3"]["conditions"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_counters_match_rejections() {
        let index = Arc::new(MemoryIndex {
            reject: vec!["NCT2".to_string(), "NCT4".to_string()],
            ..MemoryIndex::default()
        });
        let ids = ["NCT1", "NCT2", "NCT3", "NCT4", "NCT5"];
        let mut orchestrator = orchestrator(vec![studies(&ids), conditions()], index, 2);

        let summary = orchestrator.run().await.unwrap();

        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.succeeded + summary.failed, summary.documents_produced);
    }

    #[tokio::test]
    async fn test_index_is_recreated_before_writes() {
        let index = Arc::new(MemoryIndex::default());
        let mut orchestrator = orchestrator(vec![studies(&["NCT1"]), conditions()], index.clone(), 10);

        orchestrator.run().await.unwrap();

        let calls = index.calls.lock().await;
        assert_eq!(calls.as_slice(), ["delete", "create", "bulk"]);
    }

    #[tokio::test]
    async fn test_empty_base_table() {
        let index = Arc::new(MemoryIndex::default());
        let mut orchestrator = orchestrator(vec![studies(&[]), conditions()], index.clone(), 10);

        let summary = orchestrator.run().await.unwrap();

        assert_eq!(summary.documents_produced, 0);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed, 0);
        assert!(index.documents.lock().await.is_empty());

        let calls = index.calls.lock().await;
        assert_eq!(calls.as_slice(), ["delete", "create"]);
    }

    #[tokio::test]
    async fn test_second_run_replaces_contents() {
        let index = Arc::new(MemoryIndex::default());

        orchestrator(vec![studies(&["NCT1", "NCT2", "OLD"]), conditions()], index.clone(), 10)
            .run()
            .await
            .unwrap();
        let summary = orchestrator(vec![studies(&["NCT1", "NCT2"]), conditions()], index.clone(), 10)
            .run()
            .await
            .unwrap();

        let documents = index.documents.lock().await;
        let mut ids: Vec<_> = documents.keys().cloned().collect();
        ids.sort();
        assert_eq!(ids, vec!["NCT1", "NCT2"]);
        assert_eq!(summary.succeeded, 2);
    }

    #[tokio::test]
    async fn test_row_failures_are_isolated() {
        let columns = ["nct_id", "brief_title"];
        let base = table(
            "studies",
            &columns,
            vec![
                row(&columns, &["NCT1", "ok"]),
                Err(MalformedRow {
                    position: 2,
                    reason: "expected 2 fields, found 3".into(),
                }),
                row(&columns, &["", "no id"]),
                row(&columns, &["NCT2", "ok"]),
            ],
        );
        let index = Arc::new(MemoryIndex::default());
        let mut orchestrator = orchestrator(vec![base, conditions()], index.clone(), 10);

        let summary = orchestrator.run().await.unwrap();

        assert_eq!(summary.documents_produced, 2);
        assert_eq!(summary.rows_skipped, 2);
        assert_eq!(index.documents.lock().await.len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_identifier_last_write_wins() {
        let columns = ["nct_id", "brief_title"];
        let base = table(
            "studies",
            &columns,
            vec![row(&columns, &["NCT1", "first"]), row(&columns, &["NCT1", "second"])],
        );
        let index = Arc::new(MemoryIndex::default());
        let mut orchestrator = orchestrator(vec![base, conditions()], index.clone(), 10);

        let summary = orchestrator.run().await.unwrap();

        assert_eq!(summary.documents_produced, 2);
        let documents = index.documents.lock().await;
        assert_eq!(documents.len(), 1);
        assert_eq!(documents["NCT1"]["brief_title"], "second");
    }

    #[tokio::test]
    async fn test_index_setup_failure_aborts_before_writes() {
        let index = Arc::new(MemoryIndex {
            fail_create: true,
            ..MemoryIndex::default()
        });
        let mut orchestrator = orchestrator(vec![studies(&["NCT1"]), conditions()], index.clone(), 10);

        let result = orchestrator.run().await;

        assert!(matches!(result, Err(PipelineError::SearchError(_))));
        assert!(!index.calls.lock().await.contains(&"bulk".to_string()));
    }

    #[tokio::test]
    async fn test_missing_base_table_is_fatal() {
        let index = Arc::new(MemoryIndex::default());
        let mut orchestrator = orchestrator(vec![conditions()], index.clone(), 10);

        let result = orchestrator.run().await;

        assert!(matches!(result, Err(PipelineError::TableError { .. })));
        assert!(index.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_child_table_is_fatal() {
        let index = Arc::new(MemoryIndex::default());
        let mut orchestrator = orchestrator(vec![studies(&["NCT1"])], index.clone(), 10);

        let result = orchestrator.run().await;

        assert!(matches!(
            result,
            Err(PipelineError::TableError { table, .. }) if table == "conditions"
        ));
    }

    #[tokio::test]
    async fn test_child_table_without_key_column_is_fatal() {
        let keywords = table("conditions", &["id", "name"], vec![]);
        let index = Arc::new(MemoryIndex::default());
        let mut orchestrator = orchestrator(vec![studies(&["NCT1"]), keywords], index, 10);

        let result = orchestrator.run().await;

        assert!(matches!(result, Err(PipelineError::ConfigError(_))));
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = OrchestratorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.child_tables.len(), 22);
    }

    #[test]
    fn test_invalid_config() {
        let zero_concurrency = OrchestratorConfig {
            enrich_concurrency: 0,
            ..OrchestratorConfig::default()
        };
        assert!(zero_concurrency.validate().is_err());

        let duplicated = OrchestratorConfig {
            child_tables: vec!["links".into(), "links".into()],
            ..OrchestratorConfig::default()
        };
        assert!(duplicated.validate().is_err());

        let base_as_child = OrchestratorConfig {
            child_tables: vec!["studies".into()],
            ..OrchestratorConfig::default()
        };
        assert!(base_as_child.validate().is_err());
    }
}
