//! Response envelope types shared by the handlers and the response cache.
//!
//! Everything is `Serialize + Deserialize`: cached responses are stored as
//! the serialized envelope and revived verbatim on a hit (with the
//! timestamp and correlation id rewritten).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use vitrine_core::facets::Facet;
use vitrine_core::group::ProductResult;
use vitrine_core::suggest::Suggestion;
use vitrine_core::types::Timestamp;

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    /// Total matching variants (engine-reported, variant-level).
    pub total: i64,
    /// Number of products on this page.
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMeta {
    pub timestamp: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    pub pagination: Pagination,
    /// Milliseconds the gateway spent producing this payload. Kept from
    /// the original on cache hits, so cached responses visibly declare
    /// their near-zero cost.
    pub took: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub data: Vec<ProductResult>,
    pub meta: SearchMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<Suggestion>>,
}

// ---------------------------------------------------------------------------
// Facets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetsMeta {
    pub timestamp: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    pub total_matches: i64,
    pub took: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacetsResponse {
    pub data: Vec<Facet>,
    pub meta: FacetsMeta,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMeta {
    pub timestamp: Timestamp,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub meta: ErrorMeta,
}
