//! Loader module for the trial indexer pipeline.
//!
//! Loads assembled documents into the search index in fixed-size chunks.

use std::sync::Arc;
use tracing::{debug, error, instrument, warn};

use crate::errors::PipelineError;
use trial_indexer_repository::{
    BatchOperationSummary, BulkDocument, SearchIndexClient, SearchIndexError,
};
use trial_indexer_shared::TrialDocument;

/// Default number of documents per bulk request.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;

/// Configuration for the search loader.
#[derive(Debug, Clone, Copy)]
pub struct LoaderConfig {
    /// Number of documents sent in one bulk request.
    pub chunk_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Per-document outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub succeeded: usize,
    pub failed: usize,
}

/// Loader that indexes documents into the search index.
///
/// The loader is responsible for:
/// - Buffering documents into chunks of `chunk_size`
/// - Retrying a chunk once when the whole request fails
/// - Counting every document as succeeded or failed
pub struct SearchLoader {
    client: Arc<SearchIndexClient>,
    config: LoaderConfig,
    pending: Vec<BulkDocument>,
    stats: LoadStats,
}

impl SearchLoader {
    /// Create a new search loader with the given client.
    pub fn new(client: Arc<SearchIndexClient>) -> Self {
        Self::with_config(client, LoaderConfig::default())
    }

    /// Create a new search loader with custom configuration.
    pub fn with_config(client: Arc<SearchIndexClient>, config: LoaderConfig) -> Self {
        Self {
            client,
            config,
            pending: Vec::with_capacity(config.chunk_size),
            stats: LoadStats::default(),
        }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn stats(&self) -> LoadStats {
        self.stats
    }

    /// Return the counters and reset them for the next run.
    pub fn take_stats(&mut self) -> LoadStats {
        std::mem::take(&mut self.stats)
    }

    /// Drop and recreate the destination index.
    pub async fn recreate_index(&self) -> Result<(), PipelineError> {
        self.client.recreate_index().await?;
        Ok(())
    }

    /// Queue one document, sending the chunk once it is full.
    ///
    /// A document that cannot be serialized is counted as failed.
    pub async fn load(&mut self, document: &TrialDocument) {
        match BulkDocument::try_from(document) {
            Ok(bulk) => self.pending.push(bulk),
            Err(e) => {
                error!(nct_id = %document.nct_id, error = %e, "Failed to serialize document");
                self.stats.failed += 1;
            }
        }

        if self.pending.len() >= self.config.chunk_size {
            self.flush().await;
        }
    }

    /// Send all pending documents to the search index.
    #[instrument(skip(self), fields(count = self.pending.len()))]
    pub async fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }

        let chunk: Vec<BulkDocument> = self.pending.drain(..).collect();
        let summary = self.send_chunk(&chunk).await;

        for result in summary.results.iter().filter(|r| !r.success) {
            match &result.error {
                Some(e) => warn!(nct_id = %result.document_id, error = %e, "Document failed"),
                None => warn!(nct_id = %result.document_id, "Document failed"),
            }
        }

        self.stats.succeeded += summary.succeeded;
        self.stats.failed += summary.failed;
        debug!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Flushed chunk"
        );
    }

    /// Send a chunk, retrying once if the request as a whole hits a
    /// transport failure.
    async fn send_chunk(&self, chunk: &[BulkDocument]) -> BatchOperationSummary {
        let first = match self.client.bulk_index(chunk).await {
            Ok(summary) => return summary,
            Err(e) => e,
        };

        if !first.is_transient() {
            error!(error = %first, count = chunk.len(), "Bulk request refused");
            return all_failed(chunk, &first);
        }

        warn!(error = %first, count = chunk.len(), "Bulk request failed, retrying");

        match self.client.bulk_index(chunk).await {
            Ok(summary) => summary,
            Err(e) => {
                error!(error = %e, count = chunk.len(), "Bulk request failed after retry");
                all_failed(chunk, &e)
            }
        }
    }
}

fn all_failed(chunk: &[BulkDocument], error: &SearchIndexError) -> BatchOperationSummary {
    BatchOperationSummary::all_failed(chunk.iter().map(|doc| doc.id.as_str()), error)
}

impl std::fmt::Debug for SearchLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchLoader")
            .field("index", &self.client.index_name())
            .field("config", &self.config)
            .field("pending", &self.pending.len())
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Mutex;
    use trial_indexer_repository::{BatchOperationResult, SearchIndexConfig, SearchIndexProvider};
    use trial_indexer_shared::RowRecord;

    /// Mock provider for testing.
    struct MockProvider {
        requests: Mutex<Vec<Vec<String>>>,
        reject: HashSet<String>,
        transport_failures: AtomicUsize,
    }

    impl MockProvider {
        fn new() -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                reject: HashSet::new(),
                transport_failures: AtomicUsize::new(0),
            }
        }

        fn rejecting(ids: &[&str]) -> Self {
            Self {
                reject: ids.iter().map(|id| id.to_string()).collect(),
                ..Self::new()
            }
        }

        fn failing_requests(count: usize) -> Self {
            Self {
                transport_failures: AtomicUsize::new(count),
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl SearchIndexProvider for MockProvider {
        fn index_name(&self) -> &str {
            "test-index"
        }

        async fn delete_index(&self, _timeout: Duration) -> Result<(), SearchIndexError> {
            Ok(())
        }

        async fn create_index(&self, _timeout: Duration) -> Result<(), SearchIndexError> {
            Ok(())
        }

        async fn bulk_index_documents(
            &self,
            documents: &[BulkDocument],
        ) -> Result<BatchOperationSummary, SearchIndexError> {
            self.requests
                .lock()
                .await
                .push(documents.iter().map(|d| d.id.clone()).collect());

            let remaining = self.transport_failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.transport_failures.store(remaining - 1, Ordering::SeqCst);
                return Err(SearchIndexError::connection("connection reset"));
            }

            Ok(BatchOperationSummary::from_results(
                documents
                    .iter()
                    .map(|doc| {
                        if self.reject.contains(&doc.id) {
                            BatchOperationResult::failed(
                                doc.id.clone(),
                                SearchIndexError::document_rejected("mapper_parsing_exception"),
                            )
                        } else {
                            BatchOperationResult::succeeded(doc.id.clone())
                        }
                    })
                    .collect(),
            ))
        }
    }

    fn document(id: &str) -> TrialDocument {
        TrialDocument::new(id, RowRecord::from_pairs([("nct_id", id)]))
    }

    fn loader(provider: Arc<MockProvider>, chunk_size: usize) -> SearchLoader {
        let client = Arc::new(SearchIndexClient::new(provider));
        SearchLoader::with_config(client, LoaderConfig { chunk_size })
    }

    #[tokio::test]
    async fn test_load_sends_full_chunks_and_flush_sends_rest() {
        let provider = Arc::new(MockProvider::new());
        let mut loader = loader(provider.clone(), 2);

        for id in ["NCT1", "NCT2", "NCT3", "NCT4", "NCT5"] {
            loader.load(&document(id)).await;
        }
        assert_eq!(provider.requests.lock().await.len(), 2);

        loader.flush().await;

        let requests = provider.requests.lock().await;
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[2], vec!["NCT5".to_string()]);
        assert_eq!(
            loader.stats(),
            LoadStats {
                succeeded: 5,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn test_rejections_are_counted() {
        let provider = Arc::new(MockProvider::rejecting(&["NCT2", "NCT4"]));
        let mut loader = loader(provider, 3);

        for id in ["NCT1", "NCT2", "NCT3", "NCT4", "NCT5"] {
            loader.load(&document(id)).await;
        }
        loader.flush().await;

        assert_eq!(
            loader.stats(),
            LoadStats {
                succeeded: 3,
                failed: 2
            }
        );
    }

    #[tokio::test]
    async fn test_failed_chunk_is_retried_once() {
        let provider = Arc::new(MockProvider::failing_requests(1));
        let mut loader = loader(provider.clone(), 10);

        loader.load(&document("NCT1")).await;
        loader.load(&document("NCT2")).await;
        loader.flush().await;

        assert_eq!(provider.requests.lock().await.len(), 2);
        assert_eq!(loader.stats().succeeded, 2);
        assert_eq!(loader.stats().failed, 0);
    }

    #[tokio::test]
    async fn test_chunk_failing_twice_counts_every_document() {
        let provider = Arc::new(MockProvider::failing_requests(2));
        let mut loader = loader(provider.clone(), 10);

        loader.load(&document("NCT1")).await;
        loader.load(&document("NCT2")).await;
        loader.flush().await;

        assert_eq!(provider.requests.lock().await.len(), 2);
        assert_eq!(
            loader.stats(),
            LoadStats {
                succeeded: 0,
                failed: 2
            }
        );
    }

    #[tokio::test]
    async fn test_refused_chunk_is_not_retried() {
        let provider = Arc::new(MockProvider::new());
        let client = SearchIndexClient::with_config(
            provider.clone(),
            SearchIndexConfig::with_max_batch_size(1),
        );
        let mut loader = SearchLoader::with_config(Arc::new(client), LoaderConfig { chunk_size: 2 });

        loader.load(&document("NCT1")).await;
        loader.load(&document("NCT2")).await;

        assert!(provider.requests.lock().await.is_empty());
        assert_eq!(
            loader.stats(),
            LoadStats {
                succeeded: 0,
                failed: 2
            }
        );
    }

    #[tokio::test]
    async fn test_flush_without_pending_documents() {
        let provider = Arc::new(MockProvider::new());
        let mut loader = loader(provider.clone(), 10);

        loader.flush().await;

        assert!(provider.requests.lock().await.is_empty());
        assert_eq!(loader.stats(), LoadStats::default());
    }
}
