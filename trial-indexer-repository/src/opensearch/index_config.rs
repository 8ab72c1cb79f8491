//! OpenSearch index configuration.
//!
//! The index settings and mappings are maintained outside the indexer, in a
//! JSON file passed verbatim as the body of the create-index request.

use std::path::Path;

use serde_json::Value;

use crate::errors::SearchIndexError;

/// The default name of the search index.
pub const DEFAULT_INDEX_NAME: &str = "clinical-trials-gov-complete";

/// Name and schema of the destination index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexConfig {
    /// The index name.
    pub name: String,
    /// Settings and mappings, opaque to the indexer.
    pub schema: Value,
}

impl IndexConfig {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }

    /// Read the schema from a JSON mappings file.
    ///
    /// The file must hold a JSON object; its content is not inspected further.
    pub fn from_mappings_file(
        name: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<Self, SearchIndexError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SearchIndexError::schema(format!("{}: {}", path.display(), e)))?;
        let schema: Value = serde_json::from_str(&content)
            .map_err(|e| SearchIndexError::schema(format!("{}: {}", path.display(), e)))?;

        if !schema.is_object() {
            return Err(SearchIndexError::schema(format!(
                "{}: expected a JSON object",
                path.display()
            )));
        }

        Ok(Self::new(name, schema))
    }
}
