//! OpenSearch implementation of the bulk sink.
//!
//! This module provides a concrete implementation of `SearchIndexProvider`
//! using OpenSearch as the backend. The bulk and index APIs it uses are the
//! ones shared with Elasticsearch.

mod client;
mod index_config;

pub use client::OpenSearchClient;
pub use index_config::{IndexConfig, DEFAULT_INDEX_NAME};
