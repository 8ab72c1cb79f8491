//! Denormalized trial documents.
//!
//! A `TrialDocument` is one base-table row extended with one collection per
//! configured child table. The nested records can carry a few derived fields
//! added by enrichment; those are serialized as siblings of the source
//! columns.

use std::collections::BTreeMap;

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::record::RowRecord;

/// A resolved coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// One nested record of a child collection.
///
/// Serializes as the row's columns followed by the enrichment fields that are
/// set. A set `authors`, `title` or `location` replaces a source column of the
/// same name; an unset one leaves that column in place.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildRecord {
    /// The child-table row as read from the extract.
    pub row: RowRecord,
    /// Author names parsed from a citation.
    pub authors: Option<Vec<String>>,
    /// Title parsed from a citation.
    pub title: Option<String>,
    /// Coordinates resolved from a location name.
    pub location: Option<GeoPoint>,
}

impl ChildRecord {
    pub fn new(row: RowRecord) -> Self {
        Self {
            row,
            authors: None,
            title: None,
            location: None,
        }
    }

    fn shadows(&self, column: &str) -> bool {
        match column {
            "authors" => self.authors.is_some(),
            "title" => self.title.is_some(),
            "location" => self.location.is_some(),
            _ => false,
        }
    }
}

impl From<RowRecord> for ChildRecord {
    fn from(row: RowRecord) -> Self {
        Self::new(row)
    }
}

impl Serialize for ChildRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (column, value) in self.row.iter() {
            if !self.shadows(column) {
                map.serialize_entry(column, value)?;
            }
        }
        if let Some(authors) = &self.authors {
            map.serialize_entry("authors", authors)?;
        }
        if let Some(title) = &self.title {
            map.serialize_entry("title", title)?;
        }
        if let Some(location) = &self.location {
            map.serialize_entry("location", location)?;
        }
        map.end()
    }
}

/// A denormalized clinical trial, ready to be indexed.
///
/// `fields` is the base row untouched. `children` always holds one entry per
/// configured child table, empty when the trial has no rows in that table.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialDocument {
    /// Trial identifier, also used as the search document id.
    pub nct_id: String,
    /// The base-table row.
    pub fields: RowRecord,
    /// Child collections keyed by table name.
    pub children: BTreeMap<String, Vec<ChildRecord>>,
}

impl TrialDocument {
    pub fn new(nct_id: impl Into<String>, fields: RowRecord) -> Self {
        Self {
            nct_id: nct_id.into(),
            fields,
            children: BTreeMap::new(),
        }
    }

    /// Attach a child collection, replacing any previous one with that name.
    pub fn attach(&mut self, table: impl Into<String>, records: Vec<ChildRecord>) {
        self.children.insert(table.into(), records);
    }

    pub fn collection(&self, table: &str) -> Option<&[ChildRecord]> {
        self.children.get(table).map(Vec::as_slice)
    }

    pub fn collection_mut(&mut self, table: &str) -> Option<&mut Vec<ChildRecord>> {
        self.children.get_mut(table)
    }
}

impl Serialize for TrialDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        // A child collection named like a base column replaces it
        for (column, value) in self.fields.iter() {
            if !self.children.contains_key(column) {
                map.serialize_entry(column, value)?;
            }
        }
        for (table, records) in &self.children {
            map.serialize_entry(table, records)?;
        }
        map.end()
    }
}
