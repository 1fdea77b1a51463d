//! Distributed fixed-window rate limiting over the shared store.
//!
//! The counter lives in the store (not process memory), so the limit holds
//! across horizontally-scaled gateway instances.

use std::time::Duration;

use crate::{CacheError, CacheStore};

/// Key prefix for throttle counters.
pub const THROTTLE_KEY_PREFIX: &str = "throttle:";

/// Window configuration. Defaults: 100 requests per 60 seconds.
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    pub limit: u64,
    pub window: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            limit: 100,
            window: Duration::from_secs(60),
        }
    }
}

/// Outcome of one throttle check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    Allowed { remaining: u64 },
    Limited,
}

/// Count this request against the client's window and decide.
///
/// Store failures propagate; the caller decides the failure policy (the
/// gateway fails open: a broken limiter store must not take reads down).
pub async fn check(
    store: &dyn CacheStore,
    config: &ThrottleConfig,
    client_key: &str,
) -> Result<ThrottleDecision, CacheError> {
    let key = format!("{THROTTLE_KEY_PREFIX}{client_key}");
    let count = store.incr_expire(&key, config.window).await?;

    if count as u64 > config.limit {
        Ok(ThrottleDecision::Limited)
    } else {
        Ok(ThrottleDecision::Allowed {
            remaining: config.limit - count as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    fn config(limit: u64) -> ThrottleConfig {
        ThrottleConfig {
            limit,
            window: Duration::from_secs(60),
        }
    }

    #[tokio::test]
    async fn allows_up_to_the_limit() {
        let store = MemoryStore::new();
        let cfg = config(3);
        for expected_remaining in [2, 1, 0] {
            let decision = check(&store, &cfg, "1.2.3.4").await.unwrap();
            assert_eq!(
                decision,
                ThrottleDecision::Allowed {
                    remaining: expected_remaining
                }
            );
        }
    }

    #[tokio::test]
    async fn limits_past_the_threshold() {
        let store = MemoryStore::new();
        let cfg = config(2);
        check(&store, &cfg, "ip").await.unwrap();
        check(&store, &cfg, "ip").await.unwrap();
        assert_eq!(
            check(&store, &cfg, "ip").await.unwrap(),
            ThrottleDecision::Limited
        );
    }

    #[tokio::test]
    async fn clients_are_counted_independently() {
        let store = MemoryStore::new();
        let cfg = config(1);
        check(&store, &cfg, "a").await.unwrap();
        assert_eq!(
            check(&store, &cfg, "a").await.unwrap(),
            ThrottleDecision::Limited
        );
        assert!(matches!(
            check(&store, &cfg, "b").await.unwrap(),
            ThrottleDecision::Allowed { .. }
        ));
    }
}
