//! OpenSearch client implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust client.

use std::time::Duration;

use async_trait::async_trait;
use opensearch::{
    http::request::JsonBody,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesDeleteParts},
    BulkParts, OpenSearch,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::index_config::IndexConfig;
use crate::types::{BatchOperationResult, BatchOperationSummary, BulkDocument};

/// OpenSearch client implementation.
///
/// # Example
///
/// ```ignore
/// use trial_indexer_repository::opensearch::IndexConfig;
/// let config = IndexConfig::from_mappings_file("clinical-trials-gov-complete", "mappings.json")?;
/// let client = OpenSearchClient::new("http://localhost:9200", config).await?;
///
/// client.delete_index(Duration::from_secs(300)).await?;
/// client.create_index(Duration::from_secs(30)).await?;
/// ```
pub struct OpenSearchClient {
    client: OpenSearch,
    index_config: IndexConfig,
}

impl OpenSearchClient {
    /// Create a new OpenSearch client connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `index_config` - The destination index name and schema
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchClient)` - A new client instance
    /// * `Err(SearchIndexError)` - If connection setup fails
    pub async fn new(url: &str, index_config: IndexConfig) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            index = %index_config.name,
            "Created OpenSearch client"
        );

        Ok(Self {
            client,
            index_config,
        })
    }

    /// Render a duration as an OpenSearch time unit, e.g. `300s`.
    fn time_unit(timeout: Duration) -> String {
        format!("{}s", timeout.as_secs().max(1))
    }

    /// One `index` action per document, so an existing id is overwritten.
    fn bulk_actions(documents: &[BulkDocument]) -> Vec<Value> {
        documents
            .iter()
            .map(|doc| json!({"index": {"_id": doc.id}}))
            .collect()
    }

    /// Interleave actions with the document sources, borrowing both.
    fn bulk_body<'a>(actions: &'a [Value], documents: &'a [BulkDocument]) -> Vec<&'a Value> {
        actions
            .iter()
            .zip(documents)
            .flat_map(|(action, doc)| [action, &doc.body])
            .collect()
    }

    /// Map the items of a bulk response onto the submitted documents.
    ///
    /// Items come back in request order. A document with no matching item is
    /// counted as failed since its outcome is unknown.
    fn parse_bulk_response(documents: &[BulkDocument], response: &Value) -> BatchOperationSummary {
        let items = response
            .get("items")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let results = documents
            .iter()
            .enumerate()
            .map(|(position, doc)| {
                let Some(item) = items.get(position).and_then(|item| item.get("index")) else {
                    return BatchOperationResult::failed(
                        doc.id.clone(),
                        SearchIndexError::bulk_operation("missing item in bulk response"),
                    );
                };

                if let Some(reason) = item.get("error") {
                    return BatchOperationResult::failed(
                        doc.id.clone(),
                        SearchIndexError::document_rejected(reason.to_string()),
                    );
                }

                match item.get("status").and_then(Value::as_u64) {
                    Some(status) if (200..300).contains(&status) => {
                        BatchOperationResult::succeeded(doc.id.clone())
                    }
                    status => BatchOperationResult::failed(
                        doc.id.clone(),
                        SearchIndexError::document_rejected(format!(
                            "unexpected item status {:?}",
                            status
                        )),
                    ),
                }
            })
            .collect();

        BatchOperationSummary::from_results(results)
    }
}

#[async_trait]
impl SearchIndexProvider for OpenSearchClient {
    fn index_name(&self) -> &str {
        &self.index_config.name
    }

    /// Delete the index. A 404 means it was already absent.
    async fn delete_index(&self, timeout: Duration) -> Result<(), SearchIndexError> {
        let time_unit = Self::time_unit(timeout);
        let response = self
            .client
            .indices()
            .delete(IndicesDeleteParts::Index(&[self.index_config.name.as_str()]))
            .timeout(&time_unit)
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            debug!(index = %self.index_config.name, "Index did not exist");
            return Ok(());
        }

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Delete index request failed");
            return Err(SearchIndexError::index_management(format!(
                "Delete index failed with status {}: {}",
                status, error_body
            )));
        }

        Ok(())
    }

    /// Create the index with the configured schema. An index that already
    /// exists is left as is.
    async fn create_index(&self, timeout: Duration) -> Result<(), SearchIndexError> {
        let time_unit = Self::time_unit(timeout);
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(&self.index_config.name))
            .timeout(&time_unit)
            .body(self.index_config.schema.clone())
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if status.is_success() {
            return Ok(());
        }

        let error_body = response.text().await.unwrap_or_default();
        if status.as_u16() == 400 && error_body.contains("resource_already_exists_exception") {
            warn!(index = %self.index_config.name, "Index already exists");
            return Ok(());
        }

        error!(status = %status, body = %error_body, "Create index request failed");
        Err(SearchIndexError::index_management(format!(
            "Create index failed with status {}: {}",
            status, error_body
        )))
    }

    async fn bulk_index_documents(
        &self,
        documents: &[BulkDocument],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        let actions = Self::bulk_actions(documents);
        let body: Vec<JsonBody<&Value>> = Self::bulk_body(&actions, documents)
            .into_iter()
            .map(JsonBody::new)
            .collect();

        let response = self
            .client
            .bulk(BulkParts::Index(&self.index_config.name))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::bulk_operation(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SearchIndexError::bulk_operation(format!(
                "Bulk request failed with status {}: {}",
                status, error_body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::bulk_operation(e.to_string()))?;

        let summary = Self::parse_bulk_response(documents, &body);
        debug!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Bulk request completed"
        );
        Ok(summary)
    }
}
