//! The facet pipeline: same filters as search, aggregation-only query,
//! transformation into client-facing facets.

use std::time::Instant;

use vitrine_core::dsl;
use vitrine_core::facets;
use vitrine_core::query::FacetQuery;
use vitrine_search::response::normalize_total;

use crate::error::AppResult;
use crate::response::{FacetsMeta, FacetsResponse};
use crate::state::AppState;

pub struct FacetsOutcome {
    pub response: FacetsResponse,
    pub cache_hit: bool,
}

pub async fn run(
    state: &AppState,
    query: FacetQuery,
    correlation_id: &str,
) -> AppResult<FacetsOutcome> {
    let started = Instant::now();
    let cache_key = query.cache_key();

    if let Some(serialized) = super::cache_get(state, &cache_key).await {
        match serde_json::from_str::<FacetsResponse>(&serialized) {
            Ok(mut response) => {
                state.metrics.record_cache_hit();
                response.meta.timestamp = chrono::Utc::now();
                response.meta.correlation_id = Some(correlation_id.to_string());
                return Ok(FacetsOutcome {
                    response,
                    cache_hit: true,
                });
            }
            Err(err) => {
                tracing::warn!(error = %err, key = %cache_key, "Discarding undecodable cache entry");
            }
        }
    }
    state.metrics.record_cache_miss();

    let body = dsl::facet_body(&query);
    let raw = super::engine_raw(state, &body).await?;

    let data = facets::transform_aggregations(&query.facet_keys, &raw["aggregations"]);
    let response = FacetsResponse {
        data,
        meta: FacetsMeta {
            timestamp: chrono::Utc::now(),
            correlation_id: Some(correlation_id.to_string()),
            total_matches: normalize_total(&raw),
            took: started.elapsed().as_millis() as u64,
        },
    };

    match serde_json::to_string(&response) {
        Ok(serialized) => {
            super::spawn_cache_write(state, cache_key, serialized, state.config.cache_ttl_facets);
        }
        Err(err) => {
            tracing::warn!(error = %err, "Skipping cache write, response failed to serialize");
        }
    }

    Ok(FacetsOutcome {
        response,
        cache_hit: false,
    })
}
