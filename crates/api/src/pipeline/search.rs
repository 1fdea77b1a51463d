//! The search pipeline: cache check, engine query, catalog enrichment,
//! product grouping, response assembly, and the detached cache write.

use std::time::Instant;

use vitrine_core::dsl;
use vitrine_core::group;
use vitrine_core::query::SearchQuery;

use crate::error::AppResult;
use crate::pipeline::profile::{ms_since, SearchProfile};
use crate::response::{Pagination, SearchMeta, SearchResponse};
use crate::state::AppState;

/// Result of one pipeline run, with its timing breakdown.
pub struct SearchOutcome {
    pub response: SearchResponse,
    pub profile: SearchProfile,
    pub cache_hit: bool,
}

pub async fn run(
    state: &AppState,
    query: SearchQuery,
    correlation_id: &str,
) -> AppResult<SearchOutcome> {
    let started = Instant::now();
    let mut profile = SearchProfile::default();
    let cache_key = query.cache_key();

    // -- cache check --------------------------------------------------------
    let phase = Instant::now();
    let cached = super::cache_get(state, &cache_key).await;
    profile.cache_check = ms_since(phase);

    if let Some(serialized) = cached {
        match serde_json::from_str::<SearchResponse>(&serialized) {
            Ok(mut response) => {
                state.metrics.record_cache_hit();
                // Fresh identity, original `took`: the response declares
                // the cost of producing it, not of replaying it.
                response.meta.timestamp = chrono::Utc::now();
                response.meta.correlation_id = Some(correlation_id.to_string());
                profile.total = ms_since(started);
                return Ok(SearchOutcome {
                    response,
                    profile,
                    cache_hit: true,
                });
            }
            Err(err) => {
                tracing::warn!(error = %err, key = %cache_key, "Discarding undecodable cache entry");
            }
        }
    }
    state.metrics.record_cache_miss();

    // -- engine -------------------------------------------------------------
    let phase = Instant::now();
    let body = dsl::search_body(&query, &state.config.sales_boost);
    let page = super::engine_page(state, &body).await?;
    profile.opensearch = ms_since(phase);

    // -- catalog enrichment -------------------------------------------------
    let phase = Instant::now();
    let product_ids = unique_product_ids(&page);
    let options = super::catalog_options(state, &product_ids).await;
    profile.postgres = ms_since(phase);

    // -- grouping -----------------------------------------------------------
    let phase = Instant::now();
    let grouped = group::group_hits(&page, &options, query.limit);
    profile.grouping = ms_since(phase);

    // -- suggestions (zero-result searches only) ----------------------------
    let suggestions = if page.total == 0 {
        let list = super::suggest::fetch(state, &query.text).await;
        (!list.is_empty()).then_some(list)
    } else {
        None
    };

    // -- response assembly --------------------------------------------------
    let phase = Instant::now();
    let response = SearchResponse {
        meta: SearchMeta {
            timestamp: chrono::Utc::now(),
            correlation_id: Some(correlation_id.to_string()),
            pagination: Pagination {
                total: page.total,
                count: grouped.products.len(),
                next_cursor: grouped.next_cursor,
            },
            took: ms_since(started),
        },
        data: grouped.products,
        suggestions,
    };
    profile.build_response = ms_since(phase);

    // -- cache write (detached) ---------------------------------------------
    let phase = Instant::now();
    match serde_json::to_string(&response) {
        Ok(serialized) => {
            super::spawn_cache_write(state, cache_key, serialized, state.config.cache_ttl_search);
        }
        Err(err) => {
            tracing::warn!(error = %err, "Skipping cache write, response failed to serialize");
        }
    }
    profile.cache_write = ms_since(phase);

    profile.total = ms_since(started);
    Ok(SearchOutcome {
        response,
        profile,
        cache_hit: false,
    })
}

/// Distinct productIds of a page, in hit order.
fn unique_product_ids(page: &vitrine_core::document::EnginePage) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for hit in &page.hits {
        if !ids.contains(&hit.source.product_id) {
            ids.push(hit.source.product_id.clone());
        }
    }
    ids
}
