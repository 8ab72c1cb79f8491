//! Configuration types for the SearchIndexClient.

use std::time::Duration;

/// Configuration for the SearchIndexClient.
#[derive(Debug, Clone)]
pub struct SearchIndexConfig {
    /// Maximum number of documents allowed in a single bulk request.
    /// Set to None to disable the limit (not recommended for production).
    pub max_batch_size: Option<usize>,
    /// Time allowed for deleting the destination index.
    pub delete_timeout: Duration,
    /// Time allowed for creating the destination index.
    pub create_timeout: Duration,
    /// Time allowed for one bulk request.
    pub bulk_timeout: Duration,
}

impl Default for SearchIndexConfig {
    fn default() -> Self {
        Self {
            max_batch_size: Some(1000),
            delete_timeout: Duration::from_secs(300),
            create_timeout: Duration::from_secs(30),
            bulk_timeout: Duration::from_secs(120),
        }
    }
}

impl SearchIndexConfig {
    /// Create a config with no batch size limit (use with caution).
    pub fn unlimited() -> Self {
        Self {
            max_batch_size: None,
            ..Self::default()
        }
    }

    /// Create a config with a custom batch size limit.
    pub fn with_max_batch_size(max_batch_size: usize) -> Self {
        Self {
            max_batch_size: Some(max_batch_size),
            ..Self::default()
        }
    }
}
