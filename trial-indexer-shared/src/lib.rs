//! # Trial Indexer Shared
//!
//! Shared types for the clinical trials indexer: the row records produced by
//! the table loader and the denormalized trial documents sent to the search
//! index.

pub mod document;
pub mod record;

pub use document::{ChildRecord, GeoPoint, TrialDocument};
pub use record::{RowRecord, Scalar};
