//! Caching of fetched collections
//!
//! Provides a `CacheProvider` trait for byte storage with TTL support, an
//! in-memory implementation, and [`ViewCache`], the typed handle a view
//! instance owns to read, write and invalidate its collections.

mod config;
mod key;
mod memory;

pub use config::*;
pub use key::*;
pub use memory::*;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Error;

/// A cached value with metadata about when it was cached and when it expires.
#[derive(Debug, Clone)]
pub struct CachedValue {
    /// The cached data, serialized as JSON bytes.
    pub data: Vec<u8>,
    /// When this value was cached.
    pub created_at: DateTime<Utc>,
    /// When this value expires and should no longer be returned.
    pub expires_at: DateTime<Utc>,
}

impl CachedValue {
    /// Creates a new cached value with a TTL from now.
    pub fn with_ttl(data: Vec<u8>, ttl: Duration) -> Self {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::zero());
        Self {
            data,
            created_at: now,
            expires_at,
        }
    }

    /// Returns `true` if this cached value has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// Trait for cache providers.
///
/// Implementations store and retrieve cached values by string keys.
/// The provider is responsible for:
/// - Never returning expired values from `get()`
/// - Storing values with their expiration metadata
/// - Providing garbage collection for expired entries
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Retrieves a cached value by key.
    ///
    /// Returns `None` if the key doesn't exist or the value has expired.
    async fn get(&self, key: &str) -> Option<CachedValue>;

    /// Stores a value in the cache.
    async fn set(&self, key: &str, value: CachedValue);

    /// Removes a value from the cache.
    async fn remove(&self, key: &str);

    /// Clears all values from the cache.
    async fn clear(&self);

    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    async fn gc(&self) -> usize;
}

/// Typed cache of fetched collections, owned by one view instance.
///
/// Lifecycle is explicit: entries are written after a successful fetch and
/// only disappear when they expire or [`invalidate`](Self::invalidate) is
/// called.
///
/// # Example
///
/// ```ignore
/// use schooldesk_lib::cache::{CacheKey, ViewCache};
///
/// let cache = ViewCache::in_memory();
/// cache.set(&CacheKey::records("students"), &records).await?;
///
/// // After a successful bulk update
/// cache.invalidate(&CacheKey::records("students")).await;
/// ```
#[derive(Clone)]
pub struct ViewCache {
    provider: Arc<dyn CacheProvider>,
    config: CacheConfig,
}

/// A typed cache hit with its timing metadata.
#[derive(Debug, Clone)]
pub struct Cached<T> {
    pub data: T,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl ViewCache {
    /// Creates a cache over an existing provider.
    pub fn new(provider: impl CacheProvider + 'static, config: CacheConfig) -> Self {
        Self {
            provider: Arc::new(provider),
            config,
        }
    }

    /// Creates a cache backed by a fresh [`InMemoryCache`] with default TTLs.
    pub fn in_memory() -> Self {
        Self::new(InMemoryCache::new(), CacheConfig::default())
    }

    /// Returns the TTL configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Reads and decodes a cached entry.
    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Result<Option<T>, Error> {
        Ok(self.get_with_meta(key).await?.map(|c| c.data))
    }

    /// Reads and decodes a cached entry together with its timestamps.
    pub async fn get_with_meta<T: DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> Result<Option<Cached<T>>, Error> {
        let Some(cached) = self.provider.get(&key.to_string()).await else {
            return Ok(None);
        };
        let data = serde_json::from_slice(&cached.data)?;
        Ok(Some(Cached {
            data,
            created_at: cached.created_at,
            expires_at: cached.expires_at,
        }))
    }

    /// Encodes and stores an entry using the TTL for its key kind.
    ///
    /// Returns the stored timestamps. A zero TTL skips the write.
    pub async fn set<T: Serialize + Sync>(
        &self,
        key: &CacheKey,
        value: &T,
    ) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>, Error> {
        let ttl = self.config.ttl_for(key);
        if ttl.is_zero() {
            return Ok(None);
        }
        let bytes = serde_json::to_vec(value)?;
        let cached = CachedValue::with_ttl(bytes, ttl);
        let stamps = (cached.created_at, cached.expires_at);
        self.provider.set(&key.to_string(), cached).await;
        Ok(Some(stamps))
    }

    /// Drops an entry so the next read goes to the source.
    pub async fn invalidate(&self, key: &CacheKey) {
        log::debug!("invalidating cache entry {}", key);
        self.provider.remove(&key.to_string()).await;
    }

    /// Drops every entry.
    pub async fn clear(&self) {
        self.provider.clear().await;
    }

    /// Sweeps expired entries, returning how many were removed.
    pub async fn gc(&self) -> usize {
        self.provider.gc().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_invalidate() {
        let cache = ViewCache::in_memory();
        let key = CacheKey::records("students");

        cache.set(&key, &vec!["a".to_string()]).await.unwrap();
        let hit: Option<Vec<String>> = cache.get(&key).await.unwrap();
        assert_eq!(hit, Some(vec!["a".to_string()]));

        cache.invalidate(&key).await;
        let miss: Option<Vec<String>> = cache.get(&key).await.unwrap();
        assert_eq!(miss, None);
    }

    #[tokio::test]
    async fn test_zero_ttl_skips_write() {
        let cache = ViewCache::new(InMemoryCache::new(), CacheConfig::no_cache());
        let key = CacheKey::records("students");

        assert!(cache.set(&key, &1u32).await.unwrap().is_none());
        let miss: Option<u32> = cache.get(&key).await.unwrap();
        assert_eq!(miss, None);
    }

    #[test]
    fn test_expired_value() {
        let value = CachedValue::with_ttl(Vec::new(), Duration::ZERO);
        assert!(value.is_expired());
    }
}
