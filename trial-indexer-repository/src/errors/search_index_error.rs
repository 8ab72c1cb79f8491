//! Search index error types.
//!
//! This module defines the error types that can occur during search index operations.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during search index operations.
#[derive(Debug, Clone, Error)]
pub enum SearchIndexError {
    /// Validation error (e.g., missing document id).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Failed to establish connection to the search engine.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Failed to delete or create the destination index.
    #[error("Index management error: {0}")]
    IndexManagementError(String),

    /// The index schema could not be read or parsed.
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// A document could not be serialized.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// The search engine rejected a single document.
    #[error("Document rejected: {0}")]
    DocumentRejected(String),

    /// A bulk request failed as a whole.
    #[error("Bulk operation error: {0}")]
    BulkOperationError(String),

    /// The search engine did not answer in time.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Batch size exceeds configured maximum.
    #[error("Batch size {provided} exceeds maximum {max}")]
    BatchSizeExceeded { provided: usize, max: usize },
}

impl SearchIndexError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an index management error.
    pub fn index_management(msg: impl Into<String>) -> Self {
        Self::IndexManagementError(msg.into())
    }

    /// Create a schema error.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::SchemaError(msg.into())
    }

    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    /// Create a document rejected error.
    pub fn document_rejected(msg: impl Into<String>) -> Self {
        Self::DocumentRejected(msg.into())
    }

    /// Create a bulk operation error.
    pub fn bulk_operation(msg: impl Into<String>) -> Self {
        Self::BulkOperationError(msg.into())
    }

    /// Create a timeout error.
    pub fn timeout(operation: &'static str, after: Duration) -> Self {
        Self::Timeout { operation, after }
    }

    /// Create a batch size exceeded error.
    pub fn batch_size_exceeded(provided: usize, max: usize) -> Self {
        Self::BatchSizeExceeded { provided, max }
    }

    /// Whether the request may succeed if sent again.
    ///
    /// Only transport failures qualify. A rejected or oversized request fails
    /// the same way every time.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ConnectionError(_) | Self::BulkOperationError(_) | Self::Timeout { .. }
        )
    }
}
