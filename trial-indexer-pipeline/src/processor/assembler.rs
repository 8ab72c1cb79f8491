//! Document assembly.
//!
//! Joins each base row with its grouped child rows. The join is a left outer
//! join on the key column: every configured child table contributes a
//! collection to every document, empty when nothing matched.

use std::sync::Arc;
use std::vec;

use thiserror::Error;
use trial_indexer_shared::{ChildRecord, RowRecord, TrialDocument};

use crate::processor::grouper::ChildGroups;
use crate::source::TableRow;

/// A base row that could not become a document.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("base row {position}: {reason}")]
pub struct RowFailure {
    /// 1-based position among the base table's data rows.
    pub position: usize,
    pub reason: String,
}

/// Builds trial documents from base rows and grouped child tables.
///
/// Cheap to clone; the grouped tables are shared.
#[derive(Debug, Clone)]
pub struct DocumentAssembler {
    key_column: Arc<str>,
    children: Arc<[ChildGroups]>,
}

impl DocumentAssembler {
    pub fn new(key_column: impl Into<Arc<str>>, children: Vec<ChildGroups>) -> Self {
        Self {
            key_column: key_column.into(),
            children: children.into(),
        }
    }

    pub fn key_column(&self) -> &str {
        &self.key_column
    }

    /// Child table names that are also columns of the base table.
    ///
    /// The child collection replaces such a column in the indexed document.
    pub fn shadowed_columns<'a>(&'a self, base_columns: &[String]) -> Vec<&'a str> {
        self.children
            .iter()
            .map(|child| child.name.as_str())
            .filter(|name| base_columns.iter().any(|column| column == name))
            .collect()
    }

    /// Assemble the document for one base row.
    pub fn assemble(&self, row: RowRecord, position: usize) -> Result<TrialDocument, RowFailure> {
        let nct_id = row.key(&self.key_column).ok_or_else(|| RowFailure {
            position,
            reason: format!("missing {}", self.key_column),
        })?;

        let mut document = TrialDocument::new(nct_id, row);
        for child in self.children.iter() {
            let records = child
                .rows_for(&document.nct_id)
                .iter()
                .cloned()
                .map(ChildRecord::from)
                .collect();
            document.attach(child.name.clone(), records);
        }

        Ok(document)
    }

    /// Lazily assemble every base row, in order.
    ///
    /// Malformed rows and rows without an identifier come out as
    /// `RowFailure`s; iteration continues past them.
    pub fn assemble_all(&self, rows: Vec<TableRow>) -> Assembled {
        Assembled {
            assembler: self.clone(),
            rows: rows.into_iter().enumerate(),
        }
    }
}

/// Iterator returned by [`DocumentAssembler::assemble_all`].
pub struct Assembled {
    assembler: DocumentAssembler,
    rows: std::iter::Enumerate<vec::IntoIter<TableRow>>,
}

impl Iterator for Assembled {
    type Item = Result<TrialDocument, RowFailure>;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, row) = self.rows.next()?;
        let position = index + 1;

        Some(match row {
            Ok(row) => self.assembler.assemble(row, position),
            Err(malformed) => Err(RowFailure {
                position,
                reason: malformed.reason,
            }),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}
