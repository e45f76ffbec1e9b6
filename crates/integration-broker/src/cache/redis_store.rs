//! Redis-backed cache.
//!
//! `take` maps to `GETDEL` (Redis 6.2+), so one-shot reads stay atomic across
//! every replica sharing the server.

use std::time::Duration;

use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use super::{EphemeralCache, ttl_secs};
use crate::error::CacheResult;

/// Redis [`EphemeralCache`].
#[derive(Clone)]
pub struct RedisCache {
    connection_manager: ConnectionManager,
}

impl RedisCache {
    /// Connect to the server at `url` (e.g. `redis://127.0.0.1:6379/0`).
    ///
    /// # Errors
    ///
    /// Returns error if the URL is invalid or the first connection fails.
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        let connection_manager = ConnectionManager::new(client).await?;
        Ok(Self { connection_manager })
    }
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache").finish()
    }
}

#[async_trait::async_trait]
impl EphemeralCache for RedisCache {
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        let mut conn = self.connection_manager.clone();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_secs(ttl))
            .query_async(&mut conn)
            .await?;
        tracing::debug!(key, ttl_secs = ttl_secs(ttl), "Stored cache entry");
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.connection_manager.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.connection_manager.clone();
        let removed: i64 = conn.del(key).await?;
        tracing::debug!(key, removed, "Deleted cache entry");
        Ok(())
    }

    async fn take(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.connection_manager.clone();
        let value: Option<Vec<u8>> = redis::cmd("GETDEL").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}
