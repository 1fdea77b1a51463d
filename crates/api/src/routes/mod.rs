pub mod health;
pub mod search;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;

/// Versioned API routes, mounted under the configured prefix.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/search", get(search::search))
        .route("/search/facets", get(search::facets))
}
