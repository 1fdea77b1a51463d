//! Redis-backed store using a multiplexed connection manager.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::{CacheError, CacheStore};

/// Shared Redis store. Cloning shares the underlying multiplexed
/// connection, so one instance serves the whole process.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis. `url` is a standard connection URL, e.g.
    /// `redis://:password@host:6379/`.
    pub async fn connect(url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.manager.clone();
        Ok(conn.get(key).await?)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<(), CacheError> {
        // SCAN instead of KEYS so a large keyspace never blocks the server.
        let mut scan_conn = self.manager.clone();
        let mut keys: Vec<String> = Vec::new();
        {
            let mut iter = scan_conn.scan_match::<_, String>(pattern).await?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
        }
        if !keys.is_empty() {
            let mut conn = self.manager.clone();
            conn.del::<_, ()>(keys).await?;
        }
        Ok(())
    }

    async fn incr_expire(&self, key: &str, ttl: Duration) -> Result<i64, CacheError> {
        let mut conn = self.manager.clone();
        let count: i64 = conn.incr(key, 1).await?;
        if count == 1 {
            conn.expire::<_, ()>(key, ttl.as_secs().max(1) as i64)
                .await?;
        }
        Ok(count)
    }

    async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}
