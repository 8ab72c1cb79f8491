//! Row records read from the delimited table extracts.

use std::sync::Arc;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// A single cell value.
///
/// Serializes to the matching JSON scalar: `null`, a number or a string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Infer a scalar from a raw cell.
    ///
    /// Empty cells are `Null`. Integers and finite floats become numbers,
    /// everything else is kept as text.
    pub fn infer(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::Null;
        }

        let trimmed = raw.trim();
        if let Ok(value) = trimmed.parse::<i64>() {
            return Self::Integer(value);
        }
        if let Ok(value) = trimmed.parse::<f64>() {
            // "nan" and "inf" parse as floats but are not numbers in JSON
            if value.is_finite() {
                return Self::Float(value);
            }
        }

        Self::Text(raw.to_string())
    }

    /// Build a scalar from a raw cell without numeric inference.
    pub fn text(raw: &str) -> Self {
        if raw.is_empty() {
            Self::Null
        } else {
            Self::Text(raw.to_string())
        }
    }

    /// Whether the cell holds no value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The string content of a `Text` cell.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Textual form of a non-null cell, used for key comparisons.
    pub fn to_key(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Integer(value) => Some(value.to_string()),
            Self::Float(value) => Some(value.to_string()),
            Self::Text(value) => Some(value.clone()),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// An ordered mapping from column name to cell value.
///
/// All rows of one table share the same column list, so cloning a row only
/// copies its values. Rows are immutable once read.
#[derive(Debug, Clone, PartialEq)]
pub struct RowRecord {
    columns: Arc<[String]>,
    values: Vec<Scalar>,
}

impl RowRecord {
    /// Create a row from a shared header and one value per column.
    ///
    /// Missing trailing values are filled with `Null`, extra values are
    /// dropped, so the row always matches its header.
    pub fn new(columns: Arc<[String]>, mut values: Vec<Scalar>) -> Self {
        values.resize(columns.len(), Scalar::Null);
        Self { columns, values }
    }

    /// Build a row from `(column, value)` pairs, mostly useful in tests.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Scalar>,
    {
        let (columns, values): (Vec<String>, Vec<Scalar>) = pairs
            .into_iter()
            .map(|(column, value)| (column.into(), value.into()))
            .unzip();

        Self {
            columns: columns.into(),
            values,
        }
    }

    /// Value of `column`, if the row has that column.
    pub fn get(&self, column: &str) -> Option<&Scalar> {
        self.columns
            .iter()
            .position(|name| name == column)
            .map(|index| &self.values[index])
    }

    /// String content of `column` when it holds text.
    pub fn text(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Scalar::as_str)
    }

    /// Textual key stored in `column`, or `None` if absent or null.
    pub fn key(&self, column: &str) -> Option<String> {
        self.get(column).and_then(Scalar::to_key)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|name| name == column)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Iterate `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for RowRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (column, value) in self.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}
