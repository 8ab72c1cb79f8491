//! Error types for the trial indexer pipeline.

use thiserror::Error;
use trial_indexer_repository::SearchIndexError;

/// Errors that abort a pipeline run.
///
/// Row, field and per-document failures never surface here; they are
/// counted and logged where they happen.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A table could not be loaded.
    #[error("Table error: {table}: {message}")]
    TableError { table: String, message: String },

    /// Invalid pipeline configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Error from the search index.
    #[error("Search error: {0}")]
    SearchError(#[from] SearchIndexError),

    /// A pipeline task panicked or was cancelled.
    #[error("Task error: {0}")]
    TaskError(String),
}

impl PipelineError {
    /// Create a table error.
    pub fn table(table: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::TableError {
            table: table.into(),
            message: msg.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a task error.
    pub fn task(msg: impl Into<String>) -> Self {
        Self::TaskError(msg.into())
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::TaskError(err.to_string())
    }
}
