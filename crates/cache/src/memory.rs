//! In-process store used by tests and cache-less local runs.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::{CacheError, CacheStore};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// A [`CacheStore`] over a mutex-protected map. TTLs are honored lazily
/// on read.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn live_value(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.live_value(key))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<(), CacheError> {
        // Only the `prefix*` form is needed by the gateway.
        let prefix = pattern.strip_suffix('*').unwrap_or(pattern);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }

    async fn incr_expire(&self, key: &str, ttl: Duration) -> Result<i64, CacheError> {
        let current: i64 = self
            .live_value(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let next = current + 1;

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let expires_at = if current == 0 {
            Instant::now() + ttl
        } else {
            // Keep the window that was set at creation.
            entries
                .get(key)
                .map(|e| e.expires_at)
                .unwrap_or_else(|| Instant::now() + ttl)
        };
        entries.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }
}
