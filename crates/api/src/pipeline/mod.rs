//! The request pipelines and their breaker-wrapped dependency calls.
//!
//! Every external call goes through its dependency's circuit breaker and
//! its configured deadline. The fallback policy lives here too:
//!
//! - engine: errors propagate (the search path cannot degrade),
//! - catalog: errors collapse to an empty options map,
//! - cache: errors collapse to a miss / dropped write.

pub mod facets;
pub mod profile;
pub mod search;
pub mod suggest;

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use serde_json::Value;
use vitrine_core::document::{EnginePage, VariantOption};
use vitrine_core::error::CoreError;
use vitrine_search::SearchError;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Deadline for individual cache operations. Deliberately tight: the cache
/// is an optimization and must never dominate request latency.
const CACHE_OP_TIMEOUT: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Engine calls
// ---------------------------------------------------------------------------

async fn with_engine_breaker<T, F>(state: &AppState, call: F) -> AppResult<T>
where
    F: Future<Output = Result<T, SearchError>>,
{
    state.breakers.engine.try_acquire()?;

    match tokio::time::timeout(state.config.timeout_opensearch, call).await {
        Ok(Ok(value)) => {
            state.breakers.engine.record_success();
            Ok(value)
        }
        Ok(Err(err)) => {
            state.breakers.engine.record_failure();
            Err(err.into())
        }
        Err(_) => {
            state.breakers.engine.record_failure();
            Err(AppError::Core(CoreError::Timeout(
                "engine search deadline exceeded".into(),
            )))
        }
    }
}

/// Structured search through the engine breaker.
pub(crate) async fn engine_page(state: &AppState, body: &Value) -> AppResult<EnginePage> {
    with_engine_breaker(state, state.engine.search(body)).await
}

/// Raw search through the engine breaker (facets, suggesters).
pub(crate) async fn engine_raw(state: &AppState, body: &Value) -> AppResult<Value> {
    with_engine_breaker(state, state.engine.raw_search(body)).await
}

// ---------------------------------------------------------------------------
// Catalog calls
// ---------------------------------------------------------------------------

/// Batched variant-options lookup. Degrades to an empty map on circuit
/// open, timeout, or query failure; the grouper then falls back to the
/// variants observed in the hits.
pub(crate) async fn catalog_options(
    state: &AppState,
    product_ids: &[String],
) -> HashMap<String, Vec<VariantOption>> {
    if product_ids.is_empty() {
        return HashMap::new();
    }
    if state.breakers.catalog.try_acquire().is_err() {
        tracing::warn!("Catalog circuit open, serving without variant options");
        return HashMap::new();
    }

    match tokio::time::timeout(
        state.config.timeout_database,
        state.catalog.variant_options(product_ids),
    )
    .await
    {
        Ok(Ok(options)) => {
            state.breakers.catalog.record_success();
            options
        }
        Ok(Err(err)) => {
            state.breakers.catalog.record_failure();
            tracing::warn!(error = %err, "Catalog lookup failed, serving without variant options");
            HashMap::new()
        }
        Err(_) => {
            state.breakers.catalog.record_failure();
            tracing::warn!("Catalog lookup timed out, serving without variant options");
            HashMap::new()
        }
    }
}

// ---------------------------------------------------------------------------
// Cache calls
// ---------------------------------------------------------------------------

/// Cache read. Any failure reads as a miss.
pub(crate) async fn cache_get(state: &AppState, key: &str) -> Option<String> {
    if state.breakers.cache.try_acquire().is_err() {
        return None;
    }
    match tokio::time::timeout(CACHE_OP_TIMEOUT, state.cache.get(key)).await {
        Ok(Ok(value)) => {
            state.breakers.cache.record_success();
            value
        }
        Ok(Err(err)) => {
            state.breakers.cache.record_failure();
            tracing::warn!(error = %err, "Cache read failed, treating as miss");
            None
        }
        Err(_) => {
            state.breakers.cache.record_failure();
            tracing::warn!("Cache read timed out, treating as miss");
            None
        }
    }
}

/// Cache write, detached from the request so a client disconnect cannot
/// cancel it; the warmed entry serves the next caller either way.
pub(crate) fn spawn_cache_write(state: &AppState, key: String, value: String, ttl: Duration) {
    let cache = state.cache.clone();
    let breakers = state.breakers.clone();
    tokio::spawn(async move {
        if breakers.cache.try_acquire().is_err() {
            return;
        }
        match tokio::time::timeout(CACHE_OP_TIMEOUT, cache.set(&key, &value, ttl)).await {
            Ok(Ok(())) => breakers.cache.record_success(),
            Ok(Err(err)) => {
                breakers.cache.record_failure();
                tracing::warn!(error = %err, key = %key, "Cache write dropped");
            }
            Err(_) => {
                breakers.cache.record_failure();
                tracing::warn!(key = %key, "Cache write timed out");
            }
        }
    });
}
