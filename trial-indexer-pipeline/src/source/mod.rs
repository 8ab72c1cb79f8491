//! Source module for the trial indexer pipeline.
//!
//! Provides the table loader that reads the normalized extracts.

mod delimited_file;

use std::sync::Arc;

use thiserror::Error;
use trial_indexer_shared::RowRecord;

use crate::errors::PipelineError;

pub use delimited_file::{DelimitedFileLoader, DEFAULT_DELIMITER};

/// A line the loader could not turn into a row.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("malformed row {position}: {reason}")]
pub struct MalformedRow {
    /// 1-based position of the row among the table's data rows.
    pub position: usize,
    pub reason: String,
}

/// Outcome of reading one data row.
pub type TableRow = Result<RowRecord, MalformedRow>;

/// A loaded table: its header and every data row in file order.
///
/// Malformed rows keep their slot so positions stay stable: the row at
/// index `i` is data row `i + 1`.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub columns: Arc<[String]>,
    pub rows: Vec<TableRow>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Arc<[String]>, rows: Vec<TableRow>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows,
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|name| name == column)
    }

    pub fn malformed_count(&self) -> usize {
        self.rows.iter().filter(|row| row.is_err()).count()
    }

    /// Consume the table, keeping only the rows that were read successfully.
    pub fn into_valid_rows(self) -> impl Iterator<Item = RowRecord> {
        self.rows.into_iter().filter_map(Result::ok)
    }
}

/// Loads one table by name.
///
/// Implementations must skip individually malformed lines, reporting them as
/// `MalformedRow`, and only fail when the table as a whole cannot be read.
pub trait TableLoader: Send + Sync {
    fn load(&self, table: &str) -> Result<Table, PipelineError>;
}
