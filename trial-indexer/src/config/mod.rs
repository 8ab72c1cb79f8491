//! Configuration for the trial indexer.
//!
//! Every setting is a command line flag that falls back to an environment
//! variable, then to a default. A `.env` file is loaded before parsing.

mod dependencies;

pub use dependencies::Dependencies;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use trial_indexer_pipeline::loader::LoaderConfig;
use trial_indexer_pipeline::orchestrator::{
    DEFAULT_BASE_TABLE, DEFAULT_CHILD_TABLES, DEFAULT_KEY_COLUMN,
};
use trial_indexer_pipeline::OrchestratorConfig;
use trial_indexer_repository::{SearchIndexConfig, DEFAULT_INDEX_NAME};

use crate::IndexingError;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Rebuild the clinical trials search index from the pipe-delimited export.
#[derive(Parser, Debug, Clone)]
#[command(name = "trial-indexer")]
#[command(about = "Denormalize clinical trial tables and load them into a search index", long_about = None)]
pub struct Settings {
    /// Directory holding the `<table>.txt` extracts
    #[arg(long, env = "DATA_DIR", default_value = "data/20170416_pipe-delimited-export")]
    pub data_dir: PathBuf,

    /// Table every document starts from
    #[arg(long, env = "BASE_TABLE", default_value = DEFAULT_BASE_TABLE)]
    pub base_table: String,

    /// Child tables nested into each document (comma separated)
    #[arg(long, env = "CHILD_TABLES", value_delimiter = ',')]
    pub child_tables: Vec<String>,

    /// Column joining child tables to the base table
    #[arg(long, env = "KEY_COLUMN", default_value = DEFAULT_KEY_COLUMN)]
    pub key_column: String,

    /// Columns never inferred as numbers (comma separated)
    #[arg(long, env = "TEXT_COLUMNS", value_delimiter = ',', default_value = "last_known_status")]
    pub text_columns: Vec<String>,

    /// Single-byte field delimiter of the extracts
    #[arg(long, env = "DELIMITER", default_value = "|", value_parser = parse_delimiter)]
    pub delimiter: u8,

    /// OpenSearch URL
    #[arg(long, env = "OPENSEARCH_URL", default_value = "http://localhost:9200")]
    pub opensearch_url: String,

    /// Index name
    #[arg(long, env = "INDEX_NAME", default_value = DEFAULT_INDEX_NAME)]
    pub index_name: String,

    /// JSON file sent as the index creation body
    #[arg(long, env = "MAPPINGS_PATH", default_value = "mappings.json")]
    pub mappings_path: PathBuf,

    /// Documents per bulk request
    #[arg(long, env = "CHUNK_SIZE", default_value_t = 1000)]
    pub chunk_size: usize,

    /// Finished documents allowed to wait for the loader
    #[arg(long, env = "CHANNEL_BUFFER_SIZE", default_value_t = 1000)]
    pub channel_buffer_size: usize,

    /// Documents enriched concurrently
    #[arg(long, env = "ENRICH_CONCURRENCY", default_value_t = 4)]
    pub enrich_concurrency: usize,

    /// Nominatim instance used to geocode countries
    #[arg(long, env = "GEOCODER_URL", default_value = "https://nominatim.openstreetmap.org")]
    pub geocoder_url: String,

    /// User agent sent to the geocoder
    #[arg(long, env = "GEOCODER_USER_AGENT", default_value = "trial-indexer")]
    pub geocoder_user_agent: String,

    /// Seconds allowed for one geocoder call
    #[arg(long, env = "GEOCODER_TIMEOUT_SECS", default_value_t = 10)]
    pub geocoder_timeout_secs: u64,

    /// Skip geocoding; countries get no location
    #[arg(long, env = "DISABLE_GEOCODING")]
    pub no_geocoding: bool,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

fn parse_delimiter(raw: &str) -> Result<u8, String> {
    match raw.as_bytes() {
        [byte] => Ok(*byte),
        _ => Err(format!("delimiter must be a single byte, got {:?}", raw)),
    }
}

impl Settings {
    /// Child tables to nest, the built-in list when none were given.
    pub fn child_tables(&self) -> Vec<String> {
        if self.child_tables.is_empty() {
            DEFAULT_CHILD_TABLES.iter().map(|t| t.to_string()).collect()
        } else {
            self.child_tables.clone()
        }
    }

    /// Columns kept as text; the key column always is.
    pub fn text_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self
            .text_columns
            .iter()
            .filter(|c| !c.is_empty())
            .cloned()
            .collect();
        if !columns.contains(&self.key_column) {
            columns.push(self.key_column.clone());
        }
        columns
    }

    pub fn geocoder_timeout(&self) -> Duration {
        Duration::from_secs(self.geocoder_timeout_secs)
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            base_table: self.base_table.clone(),
            child_tables: self.child_tables(),
            key_column: self.key_column.clone(),
            channel_buffer_size: self.channel_buffer_size,
            enrich_concurrency: self.enrich_concurrency,
            ..OrchestratorConfig::default()
        }
    }

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            chunk_size: self.chunk_size,
        }
    }

    /// Client limits matching the chunk size, so a full chunk is never refused.
    pub fn search_index_config(&self) -> SearchIndexConfig {
        SearchIndexConfig::with_max_batch_size(self.chunk_size)
    }

    /// Check values clap cannot check on its own.
    pub fn validate(&self) -> Result<(), IndexingError> {
        if self.chunk_size == 0 {
            return Err(IndexingError::config("chunk size must be positive"));
        }
        if self.geocoder_timeout_secs == 0 {
            return Err(IndexingError::config("geocoder timeout must be positive"));
        }
        if self.index_name.trim().is_empty() {
            return Err(IndexingError::config("index name must not be empty"));
        }
        self.orchestrator_config().validate()?;
        Ok(())
    }
}

/// Parse `args` with every environment fallback removed, so tests only see
/// the flags they pass.
#[cfg(test)]
pub(crate) fn settings_from_args(args: &[&str]) -> Result<Settings, clap::Error> {
    use clap::{CommandFactory, FromArgMatches};

    let mut argv = vec!["trial-indexer"];
    argv.extend_from_slice(args);
    let matches = Settings::command()
        .mut_args(|arg| arg.env(None::<&'static str>))
        .try_get_matches_from(argv)?;
    Settings::from_arg_matches(&matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Settings {
        settings_from_args(args).unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = parse(&[]);

        assert_eq!(settings.base_table, "studies");
        assert_eq!(settings.key_column, "nct_id");
        assert_eq!(settings.delimiter, b'|');
        assert_eq!(settings.index_name, "clinical-trials-gov-complete");
        assert_eq!(settings.chunk_size, 1000);
        assert_eq!(settings.child_tables().len(), 22);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_key_column_is_always_text() {
        let settings = parse(&["--text-columns", "status,phase"]);

        assert_eq!(settings.text_columns(), vec!["status", "phase", "nct_id"]);
    }

    #[test]
    fn test_child_table_list() {
        let settings = parse(&["--child-tables", "conditions,countries"]);

        let config = settings.orchestrator_config();
        assert_eq!(config.child_tables, vec!["conditions", "countries"]);
    }

    #[test]
    fn test_multi_byte_delimiter_is_rejected() {
        let result = settings_from_args(&["--delimiter", "||"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_env_fallbacks_are_stripped_for_tests() {
        let chunk_size_env = Settings::command()
            .get_arguments()
            .find(|arg| arg.get_id() == "chunk_size")
            .and_then(|arg| arg.get_env().map(|e| e.to_os_string()));
        assert_eq!(chunk_size_env.as_deref(), Some(std::ffi::OsStr::new("CHUNK_SIZE")));

        let stripped = Settings::command().mut_args(|arg| arg.env(None::<&'static str>));
        assert!(stripped.get_arguments().all(|arg| arg.get_env().is_none()));
    }

    #[test]
    fn test_zero_chunk_size_is_invalid() {
        let settings = parse(&["--chunk-size", "0"]);
        assert!(matches!(settings.validate(), Err(IndexingError::ConfigError(_))));
    }

    #[test]
    fn test_zero_concurrency_is_invalid() {
        let settings = parse(&["--enrich-concurrency", "0"]);
        assert!(matches!(settings.validate(), Err(IndexingError::PipelineError(_))));
    }

    #[test]
    fn test_json_logs() {
        let settings = parse(&["--log-format", "json", "--no-geocoding"]);

        assert_eq!(settings.log_format, LogFormat::Json);
        assert!(settings.no_geocoding);
    }
}
