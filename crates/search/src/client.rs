//! HTTP client for the OpenSearch REST API, using [`reqwest`].

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use vitrine_core::document::EnginePage;

use crate::response;
use crate::SearchBackend;

/// Errors from the engine adapter layer.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("Engine request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The engine returned a non-2xx status code.
    #[error("Engine error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl SearchError {
    /// Whether the underlying failure was a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, SearchError::Request(err) if err.is_timeout())
    }
}

/// HTTP client for a single OpenSearch node and index.
pub struct OpenSearchClient {
    client: reqwest::Client,
    node: String,
    index: String,
}

impl OpenSearchClient {
    /// Create a client for the given node and index.
    ///
    /// * `node` - Base HTTP URL, e.g. `http://localhost:9200`.
    /// * `index` - The variants index name.
    /// * `timeout` - Per-request deadline; a timed-out call surfaces as
    ///   [`SearchError::Request`] with `is_timeout() == true`.
    pub fn new(
        node: String,
        index: String,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, SearchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self {
            client,
            node,
            index,
        })
    }

    /// Delete a document by id. A 404 is swallowed (the document was
    /// already gone, which is what the caller wanted); no other status is.
    pub async fn delete_document(&self, id: &str) -> Result<(), SearchError> {
        let response = self
            .client
            .delete(format!("{}/{}/_doc/{}", self.node, self.index, id))
            .send()
            .await?;

        if response.status().as_u16() == 404 {
            tracing::debug!(doc_id = %id, "Delete of missing document ignored");
            return Ok(());
        }
        Self::check_status(response).await?;
        Ok(())
    }

    async fn post_search(&self, body: &Value) -> Result<Value, SearchError> {
        let response = self
            .client
            .post(format!("{}/{}/_search", self.node, self.index))
            .json(body)
            .send()
            .await?;

        let response = Self::check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Ensure the response has a success status code, or turn the status
    /// and body text into a [`SearchError::Api`].
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SearchError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(SearchError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl SearchBackend for OpenSearchClient {
    async fn search(&self, body: &Value) -> Result<EnginePage, SearchError> {
        let raw = self.post_search(body).await?;
        Ok(response::parse_page(&raw))
    }

    async fn raw_search(&self, body: &Value) -> Result<Value, SearchError> {
        self.post_search(body).await
    }

    async fn ping(&self) -> Result<(), SearchError> {
        let response = self.client.get(&self.node).send().await?;
        Self::check_status(response).await?;
        Ok(())
    }
}
