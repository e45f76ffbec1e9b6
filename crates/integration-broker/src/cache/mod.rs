//! Ephemeral key-value store with per-key expiry.
//!
//! State, PKCE verifiers and credentials only ever live here, and only for a
//! few minutes. Two backends:
//! - [`MemoryCache`]: in-process, backed by moka
//! - [`RedisCache`]: shared across replicas, uses `SET EX` and `GETDEL`

mod memory;
mod redis_store;

pub use memory::MemoryCache;
pub use redis_store::RedisCache;

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::error::CacheResult;

/// Storage contract used by the credential broker.
///
/// Values are opaque bytes. TTLs are applied in whole seconds, with a floor of one second.
#[async_trait::async_trait]
pub trait EphemeralCache: Send + Sync {
    /// Store `value` under `key`, replacing any previous entry.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()>;

    /// Read a live entry without consuming it.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Remove an entry. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Atomically read and remove an entry.
    ///
    /// Of several concurrent callers for the same key, at most one receives the value.
    async fn take(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Backend name for logs and health output.
    fn backend(&self) -> &'static str;
}

/// Round a TTL to whole seconds, never below one.
#[must_use]
pub fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

/// Build the cache selected by the configuration.
///
/// # Errors
///
/// Returns error if the Redis URL is invalid or the server is unreachable.
pub async fn connect(config: &Config) -> anyhow::Result<Arc<dyn EphemeralCache>> {
    match config.redis_url {
        Some(ref url) => {
            let cache = RedisCache::connect(url).await?;
            tracing::info!("Using Redis cache");
            Ok(Arc::new(cache))
        }
        None => {
            tracing::warn!("REDIS_URL not set, using in-process cache (single replica only)");
            Ok(Arc::new(MemoryCache::default()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_secs_floor() {
        assert_eq!(ttl_secs(Duration::from_millis(10)), 1);
        assert_eq!(ttl_secs(Duration::from_secs(600)), 600);
        assert_eq!(ttl_secs(Duration::from_millis(2500)), 2);
    }

    #[tokio::test]
    async fn test_connect_without_redis_uses_memory() {
        let config = Config::for_testing("http://unused.localhost");
        let cache = connect(&config).await.unwrap();
        assert_eq!(cache.backend(), "memory");

        let ttl = Duration::from_secs(60);
        cache.set("k", b"v".to_vec(), ttl).await.unwrap();
        assert_eq!(cache.take("k").await.unwrap(), Some(b"v".to_vec()));
    }
}
