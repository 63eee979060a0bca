//! Cache configuration

use std::time::Duration;

use serde::Deserialize;

use super::CacheKey;

/// Configuration for cache TTL (time-to-live) settings.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use schooldesk_lib::cache::CacheConfig;
///
/// let config = CacheConfig::default()
///     .with_records_ttl(Duration::from_secs(60))
///     .with_reference_ttl(Duration::from_secs(7200));
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL for record collections.
    ///
    /// Default: 5 minutes
    #[serde(with = "seconds")]
    pub records_ttl: Duration,

    /// TTL for reference collections (branches, programs).
    ///
    /// Default: 1 hour
    #[serde(with = "seconds")]
    pub reference_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            records_ttl: Duration::from_secs(300),
            reference_ttl: Duration::from_secs(3600),
        }
    }
}

impl CacheConfig {
    /// Creates a new cache config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the records TTL.
    pub fn with_records_ttl(mut self, ttl: Duration) -> Self {
        self.records_ttl = ttl;
        self
    }

    /// Sets the reference TTL.
    pub fn with_reference_ttl(mut self, ttl: Duration) -> Self {
        self.reference_ttl = ttl;
        self
    }

    /// Creates a config with no caching (zero TTLs).
    pub fn no_cache() -> Self {
        Self {
            records_ttl: Duration::ZERO,
            reference_ttl: Duration::ZERO,
        }
    }

    /// Returns the TTL that applies to a key.
    pub fn ttl_for(&self, key: &CacheKey) -> Duration {
        match key {
            CacheKey::Records(_) => self.records_ttl,
            CacheKey::Reference(_) => self.reference_ttl,
        }
    }
}

mod seconds {
    use std::time::Duration;

    use serde::Deserialize;
    use serde::Deserializer;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}
