//! Delimited file table loader.
//!
//! Reads `<data_dir>/<table>.txt` extracts: a header row followed by one row
//! per record, fields separated by a single-byte delimiter.

use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;

use csv::{ErrorKind, ReaderBuilder, StringRecord};
use tracing::{info, instrument, warn};
use trial_indexer_shared::{RowRecord, Scalar};

use crate::errors::PipelineError;
use crate::source::{MalformedRow, Table, TableLoader, TableRow};

/// Field delimiter of the extracts.
pub const DEFAULT_DELIMITER: u8 = b'|';

/// Loads tables from delimited text files.
#[derive(Debug, Clone)]
pub struct DelimitedFileLoader {
    data_dir: PathBuf,
    delimiter: u8,
    text_columns: HashSet<String>,
}

impl DelimitedFileLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            delimiter: DEFAULT_DELIMITER,
            text_columns: HashSet::new(),
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Columns whose cells are always kept as text, never inferred as numbers.
    pub fn with_text_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.text_columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn path_for(&self, table: &str) -> PathBuf {
        self.data_dir.join(format!("{}.txt", table))
    }

    fn to_row(
        &self,
        columns: &Arc<[String]>,
        text_mask: &[bool],
        record: &StringRecord,
        position: usize,
    ) -> TableRow {
        // Short rows are padded with nulls; extra fields cannot be attributed
        if record.len() > columns.len() {
            return Err(MalformedRow {
                position,
                reason: format!(
                    "expected {} fields, found {}",
                    columns.len(),
                    record.len()
                ),
            });
        }

        let values = record
            .iter()
            .zip(text_mask)
            .map(|(cell, &text_only)| {
                if text_only {
                    Scalar::text(cell)
                } else {
                    Scalar::infer(cell)
                }
            })
            .collect();

        Ok(RowRecord::new(Arc::clone(columns), values))
    }
}

impl TableLoader for DelimitedFileLoader {
    #[instrument(skip(self))]
    fn load(&self, table: &str) -> Result<Table, PipelineError> {
        let path = self.path_for(table);
        let file = File::open(&path)
            .map_err(|e| PipelineError::table(table, format!("{}: {}", path.display(), e)))?;

        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(BufReader::new(file));

        let columns: Arc<[String]> = reader
            .headers()
            .map_err(|e| PipelineError::table(table, format!("unreadable header: {}", e)))?
            .iter()
            .map(str::to_string)
            .collect::<Vec<_>>()
            .into();

        if columns.is_empty() || columns.iter().all(String::is_empty) {
            return Err(PipelineError::table(table, "missing header row"));
        }

        let text_mask: Vec<bool> = columns
            .iter()
            .map(|column| self.text_columns.contains(column))
            .collect();

        let mut rows = Vec::new();
        let mut record = StringRecord::new();
        loop {
            let position = rows.len() + 1;
            let row = match reader.read_record(&mut record) {
                Ok(false) => break,
                Ok(true) => self.to_row(&columns, &text_mask, &record, position),
                Err(e) if matches!(e.kind(), ErrorKind::Io(_)) => {
                    return Err(PipelineError::table(table, e.to_string()));
                }
                Err(e) => Err(MalformedRow {
                    position,
                    reason: e.to_string(),
                }),
            };

            if let Err(malformed) = &row {
                warn!(
                    table = %table,
                    position = malformed.position,
                    reason = %malformed.reason,
                    "Skipping malformed row"
                );
            }
            rows.push(row);
        }

        let loaded = Table::new(table, columns, rows);
        info!(
            table = %table,
            rows = loaded.rows.len(),
            malformed = loaded.malformed_count(),
            "Loaded table"
        );
        Ok(loaded)
    }
}
