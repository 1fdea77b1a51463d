//! Correlation-ID middleware.
//!
//! Reads `X-Correlation-ID` from the request (or generates a UUID when
//! absent), exposes it to handlers via request extensions, and echoes it
//! on the response header. Handlers also place it in response meta.

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;

/// Header carrying the correlation id, both directions.
pub const CORRELATION_HEADER: &str = "x-correlation-id";

/// The request's correlation id, available to handlers as
/// `Extension<CorrelationId>`.
#[derive(Debug, Clone)]
pub struct CorrelationId(pub String);

pub async fn correlation_layer(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(CORRELATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    request.extensions_mut().insert(CorrelationId(id.clone()));

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}
