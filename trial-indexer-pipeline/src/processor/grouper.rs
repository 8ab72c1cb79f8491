//! Child table grouping.

use std::collections::HashMap;

use tracing::debug;
use trial_indexer_shared::RowRecord;

/// Child rows keyed by trial identifier, each vector in file order.
pub type GroupedChildTable = HashMap<String, Vec<RowRecord>>;

/// One child table after grouping.
#[derive(Debug, Clone, Default)]
pub struct ChildGroups {
    /// Table name, also the name of the collection in each document.
    pub name: String,
    pub groups: GroupedChildTable,
}

impl ChildGroups {
    pub fn new(name: impl Into<String>, groups: GroupedChildTable) -> Self {
        Self {
            name: name.into(),
            groups,
        }
    }

    /// Rows belonging to `key`, empty when the trial has none.
    pub fn rows_for(&self, key: &str) -> &[RowRecord] {
        self.groups.get(key).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Partition rows by the textual value of `key_column`.
///
/// Rows without the column, or with a null value in it, belong to no group.
pub fn group_by_key<I>(rows: I, key_column: &str) -> GroupedChildTable
where
    I: IntoIterator<Item = RowRecord>,
{
    let mut groups = GroupedChildTable::new();
    let mut unkeyed = 0usize;

    for row in rows {
        match row.key(key_column) {
            Some(key) => groups.entry(key).or_default().push(row),
            None => unkeyed += 1,
        }
    }

    if unkeyed > 0 {
        debug!(
            key_column = %key_column,
            count = unkeyed,
            "Dropped child rows without a key"
        );
    }

    groups
}
