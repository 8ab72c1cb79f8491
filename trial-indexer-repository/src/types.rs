//! Request and response types for bulk index operations.

use serde_json::Value;

use crate::errors::SearchIndexError;
use trial_indexer_shared::TrialDocument;

/// A document ready to be sent in a bulk request.
///
/// The body is rendered once, when the document leaves the pipeline, so a
/// retried chunk does not serialize it again.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkDocument {
    /// The search document id.
    pub id: String,
    /// The JSON document source.
    pub body: Value,
}

impl BulkDocument {
    pub fn new(id: impl Into<String>, body: Value) -> Self {
        Self {
            id: id.into(),
            body,
        }
    }
}

impl TryFrom<&TrialDocument> for BulkDocument {
    type Error = SearchIndexError;

    fn try_from(document: &TrialDocument) -> Result<Self, Self::Error> {
        let body = serde_json::to_value(document).map_err(|e| {
            SearchIndexError::serialization(format!("{}: {}", document.nct_id, e))
        })?;

        Ok(Self::new(document.nct_id.clone(), body))
    }
}

/// Result of a batch operation for a single item.
///
/// Indicates whether the document was accepted by the search engine and, if
/// not, the rejection detail it reported.
#[derive(Debug, Clone)]
pub struct BatchOperationResult {
    /// The search document id.
    pub document_id: String,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error if the operation failed.
    pub error: Option<SearchIndexError>,
}

impl BatchOperationResult {
    pub fn succeeded(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            success: true,
            error: None,
        }
    }

    pub fn failed(document_id: impl Into<String>, error: SearchIndexError) -> Self {
        Self {
            document_id: document_id.into(),
            success: false,
            error: Some(error),
        }
    }
}

/// Summary of a batch operation containing aggregate statistics and individual results.
///
/// This struct provides a complete overview of a bulk operation, including the total
/// number of items processed, how many succeeded and failed, and detailed results for
/// each individual item. This allows callers to handle partial failures gracefully.
#[derive(Debug, Clone, Default)]
pub struct BatchOperationSummary {
    /// Total number of items in the batch.
    pub total: usize,
    /// Number of successful operations.
    pub succeeded: usize,
    /// Number of failed operations.
    pub failed: usize,
    /// Individual results for each item.
    pub results: Vec<BatchOperationResult>,
}

impl BatchOperationSummary {
    /// Build a summary from per-item results, deriving the counters.
    pub fn from_results(results: Vec<BatchOperationResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();

        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }

    /// Mark every document of a chunk as failed with the same error.
    pub fn all_failed<'a>(
        document_ids: impl IntoIterator<Item = &'a str>,
        error: &SearchIndexError,
    ) -> Self {
        Self::from_results(
            document_ids
                .into_iter()
                .map(|id| BatchOperationResult::failed(id, error.clone()))
                .collect(),
        )
    }
}
