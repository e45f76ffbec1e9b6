//! In-process cache backed by moka with per-entry expiry.

use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache;

use super::{EphemeralCache, ttl_secs};
use crate::error::CacheResult;

#[derive(Clone)]
struct Entry {
    value: Vec<u8>,
    ttl: Duration,
    expires_at: Instant,
}

impl Entry {
    fn new(value: Vec<u8>, ttl: Duration) -> Self {
        Self {
            value,
            ttl,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_live(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Evicts each entry after its own TTL; an overwrite restarts the clock.
struct PerEntryTtl;

impl Expiry<String, Entry> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-memory [`EphemeralCache`].
///
/// Only suitable for a single server process; replicas do not share entries.
///
/// Unbounded: a write acknowledged by `set` is only ever removed by its TTL,
/// `delete` or `take`, never by size-based admission.
#[derive(Clone)]
pub struct MemoryCache {
    entries: Cache<String, Entry>,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        let entries = Cache::builder().expire_after(PerEntryTtl).build();
        Self { entries }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.entries.entry_count())
            .finish()
    }
}

#[async_trait::async_trait]
impl EphemeralCache for MemoryCache {
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        let ttl = Duration::from_secs(ttl_secs(ttl));
        self.entries
            .insert(key.to_owned(), Entry::new(value, ttl))
            .await;
        Ok(())
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        // moka evicts lazily, so the deadline is checked here as well
        Ok(self
            .entries
            .get(key)
            .await
            .filter(Entry::is_live)
            .map(|e| e.value))
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.entries.invalidate(key).await;
        Ok(())
    }

    async fn take(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        Ok(self
            .entries
            .remove(key)
            .await
            .filter(Entry::is_live)
            .map(|e| e.value))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
