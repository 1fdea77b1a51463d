//! Distributed rate-limit middleware.
//!
//! Counts each request against the client IP's fixed window in the shared
//! store. Health probes are exempt, and a broken store fails open: a
//! limiter outage must never take down public reads.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use vitrine_cache::throttle::{self, ThrottleConfig, ThrottleDecision};

use crate::error::envelope;
use crate::middleware::correlation::CorrelationId;
use crate::state::AppState;

pub async fn throttle_layer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if path.starts_with("/health") {
        return next.run(request).await;
    }

    let client_key = client_ip(&request);
    let config = ThrottleConfig {
        limit: state.config.throttle_limit,
        window: state.config.throttle_ttl,
    };

    match throttle::check(state.cache.as_ref(), &config, &client_key).await {
        Ok(ThrottleDecision::Allowed { .. }) => next.run(request).await,
        Ok(ThrottleDecision::Limited) => {
            tracing::warn!(client = %client_key, path = %path, "Rate limit exceeded");
            let correlation = request
                .extensions()
                .get::<CorrelationId>()
                .map(|c| c.0.clone());
            envelope(
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded, retry later".to_string(),
                correlation.as_deref(),
                &path,
            )
        }
        Err(err) => {
            // Fail open.
            tracing::warn!(error = %err, "Throttle store unavailable, allowing request");
            next.run(request).await
        }
    }
}

/// The client key for throttling: the first `X-Forwarded-For` entry when
/// present (the gateway sits behind a load balancer), else the socket
/// peer address.
fn client_ip(request: &Request) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
