//! Dependency initialization and wiring for the trial indexer.

use std::sync::Arc;
use tracing::info;

use crate::config::Settings;
use crate::IndexingError;
use trial_indexer_pipeline::{
    geocoding::{DisabledGeocoder, GeocodeCache, Geocoder, NominatimGeocoder},
    loader::SearchLoader,
    orchestrator::Orchestrator,
    processor::FieldEnricher,
    source::DelimitedFileLoader,
};
use trial_indexer_repository::{IndexConfig, OpenSearchClient, SearchIndexClient};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Initialize all dependencies from the parsed settings.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If a setting is invalid or the mappings file
    ///   cannot be read
    pub async fn new(settings: &Settings) -> Result<Self, IndexingError> {
        settings.validate()?;

        info!(
            data_dir = %settings.data_dir.display(),
            opensearch_url = %settings.opensearch_url,
            index = %settings.index_name,
            geocoding = !settings.no_geocoding,
            "Initializing dependencies"
        );

        let tables = DelimitedFileLoader::new(&settings.data_dir)
            .with_delimiter(settings.delimiter)
            .with_text_columns(settings.text_columns());

        let index_config =
            IndexConfig::from_mappings_file(settings.index_name.clone(), &settings.mappings_path)?;
        let search_client = OpenSearchClient::new(&settings.opensearch_url, index_config).await?;
        let client = SearchIndexClient::with_config(
            Arc::new(search_client),
            settings.search_index_config(),
        );

        let geocoder: Arc<dyn Geocoder> = if settings.no_geocoding {
            Arc::new(DisabledGeocoder)
        } else {
            let nominatim = NominatimGeocoder::new(
                &settings.geocoder_url,
                &settings.geocoder_user_agent,
                settings.geocoder_timeout(),
            )
            .map_err(|e| IndexingError::config(format!("Failed to create geocoder: {}", e)))?;
            Arc::new(nominatim)
        };
        let cache = Arc::new(GeocodeCache::new(geocoder, settings.geocoder_timeout()));

        let loader = SearchLoader::with_config(Arc::new(client), settings.loader_config());

        let orchestrator = Orchestrator::with_config(
            Arc::new(tables),
            FieldEnricher::new(cache),
            loader,
            settings.orchestrator_config(),
        );

        Ok(Self { orchestrator })
    }
}
