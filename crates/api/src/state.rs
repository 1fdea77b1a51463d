use std::sync::Arc;

use vitrine_cache::CacheStore;
use vitrine_core::breaker::{BreakerConfig, CircuitBreaker};
use vitrine_core::metrics::Metrics;
use vitrine_db::CatalogSource;
use vitrine_search::SearchBackend;

use crate::config::ServerConfig;

/// One circuit breaker per external dependency.
#[derive(Debug)]
pub struct Breakers {
    pub engine: CircuitBreaker,
    pub catalog: CircuitBreaker,
    pub cache: CircuitBreaker,
}

impl Breakers {
    pub fn new(config: &BreakerConfig) -> Self {
        Self {
            engine: CircuitBreaker::new("engine-search", config.clone()),
            catalog: CircuitBreaker::new("catalog-variants", config.clone()),
            cache: CircuitBreaker::new("cache", config.clone()),
        }
    }
}

/// Shared application state available to all Axum handlers via
/// `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`). The clients are
/// trait objects so tests can swap in in-process fakes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub engine: Arc<dyn SearchBackend>,
    pub catalog: Arc<dyn CatalogSource>,
    pub cache: Arc<dyn CacheStore>,
    pub breakers: Arc<Breakers>,
    pub metrics: Arc<Metrics>,
}
