//! # Trial Indexer Repository
//!
//! This crate provides the bulk sink used by the clinical trials indexer. It
//! includes the error types, the provider interface, a client that validates
//! and times out provider calls, and a concrete implementation for OpenSearch.

pub mod client;
pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod types;

pub use client::SearchIndexClient;
pub use config::SearchIndexConfig;
pub use errors::SearchIndexError;
pub use interfaces::SearchIndexProvider;
pub use crate::opensearch::{IndexConfig, OpenSearchClient, DEFAULT_INDEX_NAME};
pub use types::{BatchOperationResult, BatchOperationSummary, BulkDocument};
