//! Handlers for product search and facets.
//!
//! Parameter parsing is done by hand from optional strings so every
//! validation failure produces the gateway's own error envelope instead of
//! the framework's default rejection body.

use std::collections::BTreeMap;

use axum::extract::{OriginalUri, Query, State};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use vitrine_core::query::{FacetQuery, FilterValue, SearchInput, SearchQuery};

use crate::error::{error_response, AppError};
use crate::middleware::correlation::CorrelationId;
use crate::pipeline;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Raw query parameters
// ---------------------------------------------------------------------------

/// Query parameters as they arrive on the wire. Everything is optional
/// text; validation happens in [`parse_input`] and the normalizer.
#[derive(Debug, Default, Deserialize)]
pub struct RawSearchParams {
    pub q: Option<String>,
    #[serde(rename = "categoryId")]
    pub category_id: Option<String>,
    pub brand: Option<String>,
    #[serde(rename = "priceRange[min]")]
    pub price_min: Option<String>,
    #[serde(rename = "priceRange[max]")]
    pub price_max: Option<String>,
    /// JSON object string mapping filter keys to a value or value list.
    pub filters: Option<String>,
    pub limit: Option<String>,
    pub cursor: Option<String>,
    /// Comma-separated facet keys (facets endpoint only).
    #[serde(rename = "facetKeys")]
    pub facet_keys: Option<String>,
}

fn parse_input(params: &RawSearchParams) -> Result<SearchInput, AppError> {
    let filters: BTreeMap<String, FilterValue> = match params.filters.as_deref() {
        None | Some("") => BTreeMap::new(),
        Some(raw) => serde_json::from_str(raw)
            .map_err(|_| AppError::BadRequest("filters must be a JSON object".into()))?,
    };

    Ok(SearchInput {
        q: params.q.clone().unwrap_or_default(),
        category_id: params.category_id.clone(),
        brand: params.brand.clone(),
        price_min: parse_number("priceRange[min]", params.price_min.as_deref())?,
        price_max: parse_number("priceRange[max]", params.price_max.as_deref())?,
        filters,
        limit: parse_integer("limit", params.limit.as_deref())?,
        cursor: params.cursor.clone(),
    })
}

fn parse_number(name: &str, raw: Option<&str>) -> Result<Option<f64>, AppError> {
    match raw {
        None | Some("") => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("{name} must be a number"))),
    }
}

fn parse_integer(name: &str, raw: Option<&str>) -> Result<Option<i64>, AppError> {
    match raw {
        None | Some("") => Ok(None),
        Some(v) => v
            .parse()
            .map(Some)
            .map_err(|_| AppError::BadRequest(format!("{name} must be an integer"))),
    }
}

// ---------------------------------------------------------------------------
// GET /search
// ---------------------------------------------------------------------------

/// Full-text product search with filtering, ranking, grouping, and cursor
/// pagination.
pub async fn search(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<RawSearchParams>,
) -> Response {
    let path = uri.path().to_string();

    let query = match parse_input(&params).and_then(|input| {
        SearchQuery::normalize(input).map_err(AppError::from)
    }) {
        Ok(query) => query,
        Err(err) => return error_response(err, Some(&correlation.0), &path),
    };

    match pipeline::search::run(&state, query, &correlation.0).await {
        Ok(outcome) => {
            state
                .metrics
                .record_search_latency(outcome.profile.total as f64);
            outcome.profile.log(&path, &correlation.0, outcome.cache_hit);
            Json(outcome.response).into_response()
        }
        Err(err) => error_response(err, Some(&correlation.0), &path),
    }
}

// ---------------------------------------------------------------------------
// GET /search/facets
// ---------------------------------------------------------------------------

/// Facet aggregation over the same filter surface as `/search`.
pub async fn facets(
    State(state): State<AppState>,
    Extension(correlation): Extension<CorrelationId>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<RawSearchParams>,
) -> Response {
    let path = uri.path().to_string();

    let facet_keys: Vec<String> = params
        .facet_keys
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();

    let query = match parse_input(&params).and_then(|input| {
        FacetQuery::normalize(input, facet_keys).map_err(AppError::from)
    }) {
        Ok(query) => query,
        Err(err) => return error_response(err, Some(&correlation.0), &path),
    };

    match pipeline::facets::run(&state, query, &correlation.0).await {
        Ok(outcome) => {
            tracing::debug!(
                correlation_id = %correlation.0,
                facets = outcome.response.data.len(),
                total_matches = outcome.response.meta.total_matches,
                cache_hit = outcome.cache_hit,
                "Facets computed"
            );
            Json(outcome.response).into_response()
        }
        Err(err) => error_response(err, Some(&correlation.0), &path),
    }
}
