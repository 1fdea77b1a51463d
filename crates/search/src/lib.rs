//! OpenSearch adapter for the vitrine gateway.
//!
//! A thin HTTP wrapper around the engine's `_search` endpoint. The trait
//! seam exists so the api crate can run against an in-process fake in
//! tests; production wires in [`OpenSearchClient`].

pub mod client;
pub mod response;

pub use client::{OpenSearchClient, SearchError};

use async_trait::async_trait;
use serde_json::Value;
use vitrine_core::document::EnginePage;

/// The engine operations the gateway needs.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Execute a search and return the structured page (hits + normalized
    /// total).
    async fn search(&self, body: &Value) -> Result<EnginePage, SearchError>;

    /// Execute a search and return the raw response body. Used by the
    /// facet and suggestion pipelines, which read aggregations and
    /// suggest blocks the structured shape drops.
    async fn raw_search(&self, body: &Value) -> Result<Value, SearchError>;

    /// Cheap reachability probe for health checks.
    async fn ping(&self) -> Result<(), SearchError>;
}
