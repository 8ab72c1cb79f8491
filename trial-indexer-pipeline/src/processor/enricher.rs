//! Field enrichment.
//!
//! Adds derived fields to nested records: citation authors and title for
//! study references, coordinates for countries. Records whose source field
//! is missing or unparseable are left as they are.

use std::sync::Arc;

use tracing::trace;
use trial_indexer_shared::TrialDocument;

use crate::geocoding::GeocodeCache;

/// Collection holding the study references.
pub const REFERENCES_TABLE: &str = "study_references";
/// Reference field holding the free-text citation.
pub const CITATION_FIELD: &str = "citation";
/// Collection holding the trial countries.
pub const COUNTRIES_TABLE: &str = "countries";
/// Country field holding the place name to geocode.
pub const COUNTRY_NAME_FIELD: &str = "name";

const SENTENCE_BREAK: &str = ". ";

/// Split a citation into its author list and title.
///
/// Citations read `Authors. Title. Journal...`. Returns `None` when the
/// line has no sentence break. A title containing `". "` is cut at it.
pub fn parse_reference_line(line: &str) -> Option<(Vec<String>, String)> {
    let mut segments = line.split(SENTENCE_BREAK);
    let author_segment = segments.next()?;
    let title = segments.next()?.trim().to_string();

    let authors = author_segment
        .split(',')
        .map(|author| author.trim().to_string())
        .collect();

    Some((authors, title))
}

/// Enriches assembled documents in place.
#[derive(Clone)]
pub struct FieldEnricher {
    cache: Arc<GeocodeCache>,
}

impl FieldEnricher {
    pub fn new(cache: Arc<GeocodeCache>) -> Self {
        Self { cache }
    }

    /// Apply every enrichment to `document`.
    ///
    /// Never fails; running it twice gives the same document.
    pub async fn enrich(&self, document: &mut TrialDocument) {
        self.parse_citations(document);
        self.geocode_countries(document).await;
    }

    fn parse_citations(&self, document: &mut TrialDocument) {
        let Some(references) = document.collection_mut(REFERENCES_TABLE) else {
            return;
        };

        for reference in references.iter_mut() {
            let Some(citation) = reference.row.text(CITATION_FIELD) else {
                continue;
            };
            match parse_reference_line(citation) {
                Some((authors, title)) => {
                    reference.authors = Some(authors);
                    reference.title = Some(title);
                }
                None => trace!(citation = %citation, "Citation has no title"),
            }
        }
    }

    async fn geocode_countries(&self, document: &mut TrialDocument) {
        let Some(countries) = document.collection_mut(COUNTRIES_TABLE) else {
            return;
        };

        for country in countries.iter_mut() {
            let Some(name) = country.row.text(COUNTRY_NAME_FIELD) else {
                continue;
            };
            if let Some(point) = self.cache.resolve(name).await {
                country.location = Some(point);
            }
        }
    }
}
