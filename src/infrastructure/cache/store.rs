//! Cache store with backing selected once at startup

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::domain::cache::{build_key, Cache};

use super::in_memory::{InMemoryCache, InMemoryCacheConfig};
use super::redis::{redact_url, RedisCache, RedisCacheConfig};

/// Which backing a store delegates to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBacking {
    /// External Redis instance with native expiry
    Durable,
    /// Process-local map with store-enforced expiry
    Local,
}

impl std::fmt::Display for CacheBacking {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBacking::Durable => write!(f, "durable"),
            CacheBacking::Local => write!(f, "local"),
        }
    }
}

/// Configuration for the cache store
#[derive(Clone)]
pub struct CacheConfig {
    /// Redis URL; `None` selects the local backing without probing
    pub backing_address: Option<String>,
    /// TTL applied when `set` is called without one
    pub default_ttl: Duration,
    /// Budget for the startup reachability probe
    pub connect_timeout: Duration,
    /// Prefix isolating this service's keys in the durable backing
    pub key_prefix: String,
    /// Maximum number of entries in the local backing
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backing_address: None,
            default_ttl: Duration::from_secs(3600),
            connect_timeout: Duration::from_millis(500),
            key_prefix: "organizze-gateway".to_string(),
            max_capacity: 10_000,
        }
    }
}

impl std::fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheConfig")
            .field("backing_address", &self.backing_address.as_deref().map(redact_url))
            .field("default_ttl", &self.default_ttl)
            .field("connect_timeout", &self.connect_timeout)
            .field("key_prefix", &self.key_prefix)
            .field("max_capacity", &self.max_capacity)
            .finish()
    }
}

impl CacheConfig {
    pub fn with_backing_address(mut self, address: impl Into<String>) -> Self {
        self.backing_address = Some(address.into());
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// Uniform cache over a durable or local backing
///
/// Backing failures never escape: reads degrade to a miss and writes,
/// deletes and clears report `false`. The backing is chosen once in
/// [`CacheStore::connect`] and never changes afterwards.
#[derive(Debug, Clone)]
pub struct CacheStore {
    cache: Arc<dyn Cache>,
    backing: CacheBacking,
    default_ttl: Duration,
    degraded: bool,
}

impl CacheStore {
    /// Builds the store, probing the durable backing when one is configured
    ///
    /// Falls back to the local backing, flagged as degraded, when the durable
    /// backing cannot be reached within `connect_timeout`.
    pub async fn connect(config: &CacheConfig) -> Self {
        let Some(address) = &config.backing_address else {
            info!("No cache backing address configured, using local cache");
            return Self::local(config);
        };
        let redacted = redact_url(address);

        let redis_config = RedisCacheConfig::new(address)
            .with_key_prefix(&config.key_prefix)
            .with_connection_timeout(config.connect_timeout)
            .with_operation_timeout(config.connect_timeout.max(Duration::from_secs(1)));

        let redis = match RedisCache::connect(redis_config).await {
            Ok(redis) => redis,
            Err(e) => {
                warn!(address = %redacted, error = %e, "Durable cache backing unreachable, falling back to local cache");
                return Self::local(config).into_degraded();
            }
        };

        if Self::probe(&redis).await {
            info!(address = %redacted, "Using durable cache backing");
            Self::from_backing(CacheBacking::Durable, Arc::new(redis), config.default_ttl, false)
        } else {
            warn!(address = %redacted, "Durable cache backing did not answer PING, falling back to local cache");
            Self::local(config).into_degraded()
        }
    }

    /// Builds a store over the local backing
    pub fn local(config: &CacheConfig) -> Self {
        let cache = InMemoryCache::with_config(
            InMemoryCacheConfig::default().with_max_capacity(config.max_capacity),
        );

        Self::from_backing(CacheBacking::Local, Arc::new(cache), config.default_ttl, false)
    }

    /// Builds a store over an explicit backing
    pub fn from_backing(
        backing: CacheBacking,
        cache: Arc<dyn Cache>,
        default_ttl: Duration,
        degraded: bool,
    ) -> Self {
        Self {
            cache,
            backing,
            default_ttl,
            degraded,
        }
    }

    fn into_degraded(mut self) -> Self {
        self.degraded = true;
        self
    }

    /// Reachability probe
    pub async fn probe(cache: &dyn Cache) -> bool {
        match cache.ping().await {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "Cache backing probe failed");
                false
            }
        }
    }

    /// Deterministic key from a namespace and ordered parts
    pub fn build_key<P: Display>(namespace: &str, parts: &[P]) -> String {
        build_key(namespace, parts)
    }

    pub fn backing(&self) -> CacheBacking {
        self.backing
    }

    /// True when a durable backing was configured but the local one is in use
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Gets a typed value; absent, expired, undecodable and failed reads are all `None`
    pub async fn get<V: DeserializeOwned>(&self, key: &str) -> Option<V> {
        let raw = match self.cache.get_raw(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(cache_key = %key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(cache_key = %key, error = %e, "Cached value could not be decoded, treating as miss");
                None
            }
        }
    }

    /// Sets a value with the default TTL
    pub async fn set<V: Serialize + ?Sized>(&self, key: &str, value: &V) -> bool {
        self.set_with_ttl(key, value, self.default_ttl).await
    }

    /// Sets a value with an explicit TTL, which must be positive
    pub async fn set_with_ttl<V: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &V,
        ttl: Duration,
    ) -> bool {
        if ttl.is_zero() {
            warn!(cache_key = %key, "Refusing cache write with zero TTL");
            return false;
        }

        let data = match serde_json::to_string(value) {
            Ok(data) => data,
            Err(e) => {
                warn!(cache_key = %key, error = %e, "Failed to serialize cache value");
                return false;
            }
        };

        match self.cache.set_raw(key, &data, ttl).await {
            Ok(()) => {
                debug!(cache_key = %key, ttl_secs = ttl.as_secs(), "Cache entry stored");
                true
            }
            Err(e) => {
                warn!(cache_key = %key, error = %e, "Cache write failed");
                false
            }
        }
    }

    /// Deletes a key; deleting an absent key succeeds
    pub async fn delete(&self, key: &str) -> bool {
        match self.cache.delete(key).await {
            Ok(_) => true,
            Err(e) => {
                warn!(cache_key = %key, error = %e, "Cache delete failed");
                false
            }
        }
    }

    /// Drops every entry this store controls
    pub async fn clear(&self) -> bool {
        match self.cache.clear().await {
            Ok(()) => {
                info!(backing = %self.backing, "Cache cleared");
                true
            }
            Err(e) => {
                warn!(error = %e, "Cache clear failed");
                false
            }
        }
    }

    /// Approximate entry count, `None` when the backing cannot answer
    pub async fn entry_count(&self) -> Option<usize> {
        match self.cache.size().await {
            Ok(size) => Some(size),
            Err(e) => {
                warn!(error = %e, "Cache size query failed");
                None
            }
        }
    }
}
