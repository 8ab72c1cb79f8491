//! Error types for the trial indexer repository.

mod search_index_error;

pub use search_index_error::SearchIndexError;
