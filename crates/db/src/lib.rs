//! PostgreSQL access for the vitrine gateway.
//!
//! The gateway is read-only: the only hot-path query is the batched
//! variant-options lookup in [`catalog`]. Pool construction and the
//! health probe live here so the api crate never touches sqlx directly.

pub mod catalog;

pub use catalog::{CatalogSource, PgCatalog};

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Convenience alias used across the workspace.
pub type DbPool = PgPool;

/// Create the shared connection pool.
///
/// Connects lazily: the gateway starts (and serves degraded search
/// responses) even when the catalog store is down, and readiness reports
/// the live state via [`health_check`].
pub fn create_pool(
    database_url: &str,
    max_connections: u32,
    acquire_timeout: Duration,
) -> Result<DbPool, sqlx::Error> {
    Ok(PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(acquire_timeout)
        .connect_lazy(database_url)?)
}

/// Cheap liveness probe: one round-trip, no table access.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
