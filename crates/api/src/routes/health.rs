//! Health probes: component map, liveness, readiness.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Json, Router};
use serde::Serialize;
use vitrine_core::breaker::BreakerStats;
use vitrine_core::metrics::MetricsSnapshot;

use crate::state::AppState;

/// Health of one dependency, with its breaker stats.
#[derive(Serialize)]
pub struct ComponentHealth {
    pub healthy: bool,
    pub breaker: BreakerStats,
}

#[derive(Serialize)]
pub struct ComponentMap {
    pub engine: ComponentHealth,
    pub database: ComponentHealth,
    pub cache: ComponentHealth,
}

/// Full health payload: component map plus the in-process metrics.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub components: ComponentMap,
    pub metrics: MetricsSnapshot,
}

/// GET /health -- component map; 503 when any dependency is down.
async fn health_check(State(state): State<AppState>) -> Response {
    let engine_healthy = state.engine.ping().await.is_ok();
    let database_healthy = state.catalog.ping().await.is_ok();
    let cache_healthy = state.cache.ping().await.is_ok();
    let all_healthy = engine_healthy && database_healthy && cache_healthy;

    let body = HealthResponse {
        status: if all_healthy { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        components: ComponentMap {
            engine: ComponentHealth {
                healthy: engine_healthy,
                breaker: state.breakers.engine.stats(),
            },
            database: ComponentHealth {
                healthy: database_healthy,
                breaker: state.breakers.catalog.stats(),
            },
            cache: ComponentHealth {
                healthy: cache_healthy,
                breaker: state.breakers.cache.stats(),
            },
        },
        metrics: state.metrics.snapshot(),
    };

    let status = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body)).into_response()
}

/// GET /health/live -- process liveness only, no dependency calls.
async fn live() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// GET /health/ready -- ready to serve iff engine and database answer.
/// The cache is deliberately excluded: the gateway serves without it.
async fn ready(State(state): State<AppState>) -> Response {
    let engine_ok = state.engine.ping().await.is_ok();
    let database_ok = state.catalog.ping().await.is_ok();

    if engine_ok && database_ok {
        (StatusCode::OK, Json(serde_json::json!({ "status": "ready" }))).into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "not ready",
                "engine": engine_ok,
                "database": database_ok,
            })),
        )
            .into_response()
    }
}

/// Mount health routes (root-level, NOT under the API prefix; the rate
/// limiter exempts them by this path).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(live))
        .route("/health/ready", get(ready))
}
