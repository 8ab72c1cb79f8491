//! Processor module for the trial indexer pipeline.
//!
//! Groups child rows by trial, assembles denormalized documents and enriches
//! their nested records.

mod assembler;
mod enricher;
mod grouper;

pub use assembler::{Assembled, DocumentAssembler, RowFailure};
pub use enricher::{
    parse_reference_line, FieldEnricher, CITATION_FIELD, COUNTRIES_TABLE, COUNTRY_NAME_FIELD,
    REFERENCES_TABLE,
};
pub use grouper::{group_by_key, ChildGroups, GroupedChildTable};
