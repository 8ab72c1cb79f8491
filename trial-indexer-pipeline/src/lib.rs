//! # Trial Indexer Pipeline
//!
//! This crate provides the pipeline that turns the normalized clinical trial
//! extracts into denormalized search documents and loads them into the index.
//!
//! ## Architecture
//!
//! The pipeline follows the Source-Processor-Loader pattern:
//!
//! 1. **Source**: Reads the base and child tables from delimited files
//! 2. **Processor**: Groups child rows, assembles and enriches documents
//! 3. **Loader**: Sends documents to the search index in bulk chunks
//! 4. **Orchestrator**: Recreates the index and coordinates the run

pub mod errors;
pub mod geocoding;
pub mod loader;
pub mod orchestrator;
pub mod processor;
pub mod source;

pub use errors::PipelineError;
pub use orchestrator::{Orchestrator, OrchestratorConfig, RunSummary};
