//! TTL- and capacity-bounded cache store.
//!
//! [`ExpiringCacheStore`] implements [`CacheStore`] on top of [`moka`]. It is
//! the place where expiry policy lives: when a TTL is configured, a value
//! silently disappears once it is older than the TTL and the next `get`
//! reports a miss. Callers never expire values themselves.
//!
//! # Usage
//!
//! ```no_run
//! # use std::time::Duration;
//! # use jwks_resolver_storage::{CacheConfig, CacheStore, ExpiringCacheStore};
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CacheConfig::builder()
//!     .max_capacity(16)
//!     .ttl(Duration::from_secs(3_600))
//!     .build()?;
//! let store = ExpiringCacheStore::new(&config);
//!
//! store.put("key", "value".to_owned()).await?;
//! let _ = store.get("key").await; // served until the TTL elapses
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::trace;

use crate::{ConfigError, error::StorageResult, store::CacheStore};

/// Default maximum number of cache entries.
pub const DEFAULT_MAX_CAPACITY: u64 = 16;

/// Minimum allowed TTL when one is configured.
pub const MIN_TTL: Duration = Duration::from_secs(1);

/// Configuration for [`ExpiringCacheStore`].
///
/// # Validation
///
/// - `max_capacity` must be >= 1
/// - `ttl`, when set, must be >= 1 second
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    max_capacity: u64,
    ttl: Option<Duration>,
}

impl CacheConfig {
    /// Starts a builder with the default capacity and no TTL.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder { max_capacity: DEFAULT_MAX_CAPACITY, ttl: None }
    }

    /// Returns the maximum number of cache entries.
    #[must_use]
    pub fn max_capacity(&self) -> u64 {
        self.max_capacity
    }

    /// Returns the configured TTL, if any.
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_capacity: DEFAULT_MAX_CAPACITY, ttl: None }
    }
}

/// Builder for [`CacheConfig`].
pub struct CacheConfigBuilder {
    max_capacity: u64,
    ttl: Option<Duration>,
}

impl CacheConfigBuilder {
    /// Sets the maximum number of entries in the cache.
    pub fn max_capacity(mut self, max_capacity: u64) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    /// Sets the TTL for cache entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Sets or clears the TTL for cache entries.
    pub fn maybe_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Builds the [`CacheConfig`], validating all fields.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BelowMinimum`] if:
    /// - `max_capacity` is 0
    /// - `ttl` is set and less than 1 second
    pub fn build(self) -> Result<CacheConfig, ConfigError> {
        if self.max_capacity == 0 {
            return Err(ConfigError::BelowMinimum {
                field: "max_capacity",
                value: self.max_capacity.to_string(),
                min: "1".to_owned(),
            });
        }
        if let Some(ttl) = self.ttl
            && ttl < MIN_TTL
        {
            return Err(ConfigError::BelowMinimum {
                field: "ttl",
                value: format!("{}ms", ttl.as_millis()),
                min: "1s".to_owned(),
            });
        }
        Ok(CacheConfig { max_capacity: self.max_capacity, ttl: self.ttl })
    }
}

/// A [`CacheStore`] with capacity-bounded eviction and optional TTL expiry.
///
/// Cloning is cheap; clones share the same underlying cache.
#[derive(Clone)]
pub struct ExpiringCacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    cache: Cache<String, V>,
    config: CacheConfig,
}

impl<V> ExpiringCacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Creates a store from a validated configuration.
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        let mut builder = Cache::builder().max_capacity(config.max_capacity);
        if let Some(ttl) = config.ttl {
            builder = builder.time_to_live(ttl);
        }
        Self { cache: builder.build(), config: config.clone() }
    }

    /// Returns the configuration this store was built with.
    #[must_use]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the current entry count.
    ///
    /// Note: This count is eventually consistent. For accurate counts in tests,
    /// call [`run_pending_tasks`](Self::run_pending_tasks) first.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Processes pending inserts, evictions and expirations.
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

#[async_trait]
impl<V> CacheStore<V> for ExpiringCacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Option<V> {
        let value = self.cache.get(key).await;
        trace!(key, hit = value.is_some(), "expiring store get");
        value
    }

    async fn put(&self, key: &str, value: V) -> StorageResult<()> {
        self.cache.insert(key.to_owned(), value).await;
        trace!(key, "expiring store put");
        Ok(())
    }
}
