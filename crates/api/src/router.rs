//! Shared application router builder.
//!
//! Both the production binary (`main.rs`) and the integration tests build
//! the router here, so tests exercise the exact same middleware stack.

use axum::extract::OriginalUri;
use axum::http::{Method, StatusCode};
use axum::middleware as axum_middleware;
use axum::response::Response;
use axum::{Extension, Router};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::config::ServerConfig;
use crate::error::envelope;
use crate::middleware::correlation::{correlation_layer, CorrelationId};
use crate::middleware::throttle::throttle_layer;
use crate::routes;
use crate::state::AppState;

/// Build the full application [`Router`] with all middleware layers.
///
/// Request path through the stack (outermost first):
///
/// 1. CORS
/// 2. Correlation ID (read or generate, echo on response)
/// 3. Global request timeout
/// 4. Structured request/response tracing
/// 5. Rate limiting (health paths exempt)
/// 6. Panic recovery (catch panics, return 500)
pub fn build_app_router(state: AppState, config: &ServerConfig) -> Router {
    let cors = build_cors_layer(config);

    Router::new()
        // Health checks at root level (not under the API prefix).
        .merge(routes::health::router())
        // Versioned API routes.
        .nest(&config.api_base(), routes::api_routes())
        // Unknown routes get the standard error envelope.
        .fallback(not_found)
        // -- Middleware stack (the last layer added is the outermost) --
        .layer(CatchPanicLayer::new())
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            throttle_layer,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(TimeoutLayer::new(config.timeout_request))
        .layer(axum_middleware::from_fn(correlation_layer))
        .layer(cors)
        .with_state(state)
}

async fn not_found(
    OriginalUri(uri): OriginalUri,
    correlation: Option<Extension<CorrelationId>>,
) -> Response {
    envelope(
        StatusCode::NOT_FOUND,
        "Route not found".to_string(),
        correlation.as_ref().map(|Extension(c)| c.0.as_str()),
        uri.path(),
    )
}

/// Build the CORS middleware layer. A lone `*` origin (the default for a
/// public read API) allows any origin without credentials; an explicit
/// origin list is parsed strictly and panics at startup on a bad value.
pub fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.cors_origins.iter().any(|o| o == "*") {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET])
            .allow_headers(Any);
    }

    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .map(|o| {
            o.parse()
                .unwrap_or_else(|e| panic!("Invalid CORS origin '{o}': {e}"))
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET])
        .allow_headers(Any)
}
