//! Search index provider trait definition.
//!
//! This module defines the abstract interface for search index operations,
//! allowing for different backend implementations (OpenSearch, Elasticsearch, etc.).

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::SearchIndexError;
use crate::types::{BatchOperationSummary, BulkDocument};

/// Abstracts the underlying search index implementation (OpenSearch, Elasticsearch, etc.).
///
/// Implementations are injected into `SearchIndexClient`, which enforces
/// timeouts and batch limits around them. This keeps providers thin and lets
/// tests swap in in-memory implementations.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Name of the destination index.
    fn index_name(&self) -> &str;

    /// Delete the destination index.
    ///
    /// An index that does not exist is not an error.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Server-side timeout to request for the operation
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the index was deleted or was already absent
    /// * `Err(SearchIndexError)` - If the deletion fails
    async fn delete_index(&self, timeout: Duration) -> Result<(), SearchIndexError>;

    /// Create the destination index with its schema.
    ///
    /// An index that already exists is not an error.
    ///
    /// # Arguments
    ///
    /// * `timeout` - Server-side timeout to request for the operation
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the index was created or already existed
    /// * `Err(SearchIndexError)` - If the creation fails
    async fn create_index(&self, timeout: Duration) -> Result<(), SearchIndexError>;

    /// Index multiple documents in one bulk request.
    ///
    /// A document whose id already exists is replaced. Per-document
    /// rejections are reported in the summary, in input order.
    ///
    /// # Arguments
    ///
    /// * `documents` - Slice of documents to index
    ///
    /// # Returns
    ///
    /// * `Ok(BatchOperationSummary)` - Contains aggregate statistics and individual results
    /// * `Err(SearchIndexError)` - If the bulk request fails entirely
    async fn bulk_index_documents(
        &self,
        documents: &[BulkDocument],
    ) -> Result<BatchOperationSummary, SearchIndexError>;
}
