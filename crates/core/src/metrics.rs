//! In-process metrics: cache hit/miss counters and a search latency
//! histogram with percentile estimation.
//!
//! Plain atomics, no metrics framework; the snapshot is surfaced through
//! the health endpoint and the request-completion log.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Upper bucket bounds in milliseconds. Values beyond the last bound land
/// in an overflow bucket.
const LATENCY_BOUNDS_MS: [f64; 14] = [
    1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0, 30000.0,
];

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

/// Fixed-bucket latency histogram.
#[derive(Debug)]
pub struct LatencyHistogram {
    buckets: [AtomicU64; LATENCY_BOUNDS_MS.len() + 1],
    count: AtomicU64,
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self {
            buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            count: AtomicU64::new(0),
        }
    }
}

impl LatencyHistogram {
    pub fn record(&self, millis: f64) {
        let idx = LATENCY_BOUNDS_MS
            .iter()
            .position(|bound| millis <= *bound)
            .unwrap_or(LATENCY_BOUNDS_MS.len());
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Estimate a percentile as the upper bound of the bucket containing
    /// it. `p` is in `0.0..=1.0`. Returns 0 with no observations.
    pub fn percentile(&self, p: f64) -> f64 {
        let total = self.count.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        let rank = (p * total as f64).ceil() as u64;
        let mut cumulative = 0u64;
        for (idx, bucket) in self.buckets.iter().enumerate() {
            cumulative += bucket.load(Ordering::Relaxed);
            if cumulative >= rank {
                return LATENCY_BOUNDS_MS
                    .get(idx)
                    .copied()
                    .unwrap_or(f64::INFINITY);
            }
        }
        f64::INFINITY
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Gateway metrics
// ---------------------------------------------------------------------------

/// Shared per-process metrics, cheap to update from any request.
#[derive(Debug, Default)]
pub struct Metrics {
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    pub search_latency: LatencyHistogram,
}

/// Serializable view of [`Metrics`] for health output.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub searches: u64,
    pub latency_p50_ms: f64,
    pub latency_p95_ms: f64,
    pub latency_p99_ms: f64,
}

impl Metrics {
    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_search_latency(&self, millis: f64) {
        self.search_latency.record(millis);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            searches: self.search_latency.count(),
            latency_p50_ms: self.search_latency.percentile(0.50),
            latency_p95_ms: self.search_latency.percentile(0.95),
            latency_p99_ms: self.search_latency.percentile(0.99),
        }
    }
}
