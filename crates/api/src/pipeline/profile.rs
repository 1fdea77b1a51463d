//! Per-request phase timing for the search pipeline.

use std::time::Instant;

/// Milliseconds elapsed since `start`.
pub fn ms_since(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Phase breakdown of one search request, all in milliseconds.
#[derive(Debug, Default, Clone, Copy)]
pub struct SearchProfile {
    pub cache_check: u64,
    pub opensearch: u64,
    pub postgres: u64,
    pub grouping: u64,
    pub build_response: u64,
    pub cache_write: u64,
    pub total: u64,
}

impl SearchProfile {
    /// Emit the completion log line with the full breakdown.
    pub fn log(&self, route: &str, correlation_id: &str, cache_hit: bool) {
        tracing::info!(
            route,
            correlation_id,
            cache_hit,
            cache_check_ms = self.cache_check,
            opensearch_ms = self.opensearch,
            postgres_ms = self.postgres,
            grouping_ms = self.grouping,
            build_response_ms = self.build_response,
            cache_write_ms = self.cache_write,
            total_ms = self.total,
            "Search completed"
        );
    }
}
