//! Search index client implementation.
//!
//! This module provides the main client for interacting with the search index.
//! The pipeline uses it to recreate the destination index and to send bulk
//! chunks of documents.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument};

use crate::config::SearchIndexConfig;
use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::types::{BatchOperationSummary, BulkDocument};

/// The main client for interacting with the search index.
pub struct SearchIndexClient {
    provider: Arc<dyn SearchIndexProvider>,
    config: SearchIndexConfig,
}

impl SearchIndexClient {
    /// Create a new SearchIndexClient with default configuration.
    pub fn new(provider: Arc<dyn SearchIndexProvider>) -> Self {
        Self {
            provider,
            config: SearchIndexConfig::default(),
        }
    }

    /// Create a new SearchIndexClient with custom configuration.
    pub fn with_config(provider: Arc<dyn SearchIndexProvider>, config: SearchIndexConfig) -> Self {
        Self { provider, config }
    }

    pub fn index_name(&self) -> &str {
        self.provider.index_name()
    }

    pub fn config(&self) -> &SearchIndexConfig {
        &self.config
    }

    /// Check if batch size exceeds the configured limit.
    fn validate_batch_size(&self, size: usize) -> Result<(), SearchIndexError> {
        if let Some(max) = self.config.max_batch_size {
            if size > max {
                return Err(SearchIndexError::batch_size_exceeded(size, max));
            }
        }
        Ok(())
    }

    /// Drop the destination index and create it again with its schema.
    ///
    /// Every document indexed afterwards lands in an empty index, so a run
    /// fully replaces the previous contents.
    #[instrument(skip(self), fields(index = %self.index_name()))]
    pub async fn recreate_index(&self) -> Result<(), SearchIndexError> {
        let delete_timeout = self.config.delete_timeout;
        with_timeout(
            "index deletion",
            delete_timeout,
            self.provider.delete_index(delete_timeout),
        )
        .await?;
        info!("Deleted index");

        let create_timeout = self.config.create_timeout;
        with_timeout(
            "index creation",
            create_timeout,
            self.provider.create_index(create_timeout),
        )
        .await?;
        info!("Created index");

        Ok(())
    }

    /// Index a chunk of documents.
    /// Input: documents with a non-empty id
    /// Output: Result<BatchOperationSummary, SearchIndexError>
    ///
    /// Individual rejections are reported in the summary. An error means the
    /// request as a whole failed and none of its outcomes are known.
    ///
    /// The batch size is limited by the configured max_batch_size (default: 1000).
    pub async fn bulk_index(
        &self,
        documents: &[BulkDocument],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        if documents.is_empty() {
            return Ok(BatchOperationSummary::default());
        }

        self.validate_batch_size(documents.len())?;

        if documents.iter().any(|doc| doc.id.is_empty()) {
            return Err(SearchIndexError::validation(
                "All documents must have an id",
            ));
        }

        with_timeout(
            "bulk request",
            self.config.bulk_timeout,
            self.provider.bulk_index_documents(documents),
        )
        .await
    }
}

async fn with_timeout<T, F>(
    operation: &'static str,
    after: Duration,
    future: F,
) -> Result<T, SearchIndexError>
where
    F: Future<Output = Result<T, SearchIndexError>>,
{
    match tokio::time::timeout(after, future).await {
        Ok(result) => result,
        Err(_) => Err(SearchIndexError::timeout(operation, after)),
    }
}
