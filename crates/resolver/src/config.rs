//! Resolver configuration.
//!
//! [`ResolverConfig`] describes where the issuer's JWKS lives, how long a
//! fetch may take, and how the key set is cached. It can be built in code
//! with a validating builder or deserialized (e.g. from a service's config
//! file), with durations in humantime form (`"10s"`, `"1h"`).
//!
//! ```
//! use std::time::Duration;
//! use jwks_resolver::ResolverConfig;
//!
//! let config = ResolverConfig::builder()
//!     .jwks_url("https://issuer.example/.well-known/jwks.json")
//!     .timeout(Duration::from_secs(3))
//!     .cache_ttl(Duration::from_secs(3_600))
//!     .build()?;
//!
//! assert_eq!(config.cache_key(), "jwks:signing-keys");
//! # Ok::<(), jwks_resolver::ConfigError>(())
//! ```

use std::time::Duration;

use jwks_resolver_storage::{CacheConfig, ConfigError, DEFAULT_MAX_CAPACITY};
use serde::{Deserialize, Serialize};

use crate::{fetcher::HttpJwksFetcher, key_store::DEFAULT_CACHE_KEY, validation::validate_jwks_url};

/// Default whole-request timeout for a JWKS fetch (10 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout for a JWKS fetch (5 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Smallest accepted timeout.
const MIN_TIMEOUT: Duration = Duration::from_millis(1);

/// Configuration for [`KeyResolver::from_config`](crate::KeyResolver::from_config).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolverConfig {
    /// JWKS endpoint of the issuer.
    jwks_url: String,

    /// Cache key the key set is stored under.
    #[serde(default = "default_cache_key")]
    cache_key: String,

    /// Whole-request timeout for a fetch.
    #[serde(with = "humantime_serde", default = "default_timeout")]
    timeout: Duration,

    /// Connection-setup timeout for a fetch.
    #[serde(with = "humantime_serde", default = "default_connect_timeout")]
    connect_timeout: Duration,

    /// Key-set cache settings.
    #[serde(default)]
    cache: CacheSettings,
}

/// Serializable cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheSettings {
    /// Optional lifetime of a cached key set. Unset means the set stays until
    /// the next refresh replaces it.
    #[serde(with = "humantime_serde::option", default)]
    pub ttl: Option<Duration>,

    /// Capacity bound of the cache backend.
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { ttl: None, max_capacity: DEFAULT_MAX_CAPACITY }
    }
}

fn default_cache_key() -> String {
    DEFAULT_CACHE_KEY.to_owned()
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_max_capacity() -> u64 {
    DEFAULT_MAX_CAPACITY
}

#[bon::bon]
impl ResolverConfig {
    /// Creates a new configuration, validating every field.
    ///
    /// # Arguments
    ///
    /// * `jwks_url` - Issuer JWKS endpoint (`http://` or `https://`).
    ///
    /// # Optional Fields
    ///
    /// * `cache_key` - Cache key for the key set (default: `"jwks:signing-keys"`).
    /// * `timeout` - Whole-request timeout (default: 10 seconds).
    /// * `connect_timeout` - Connection timeout (default: 5 seconds).
    /// * `cache_ttl` - Lifetime of a cached key set (default: none).
    /// * `cache_max_capacity` - Cache capacity bound (default: 16).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any field is out of range; see
    /// [`validate`](Self::validate).
    #[builder]
    pub fn new(
        #[builder(into)] jwks_url: String,
        #[builder(into, default = default_cache_key())] cache_key: String,
        #[builder(default = DEFAULT_TIMEOUT)] timeout: Duration,
        #[builder(default = DEFAULT_CONNECT_TIMEOUT)] connect_timeout: Duration,
        cache_ttl: Option<Duration>,
        #[builder(default = DEFAULT_MAX_CAPACITY)] cache_max_capacity: u64,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            jwks_url,
            cache_key,
            timeout,
            connect_timeout,
            cache: CacheSettings { ttl: cache_ttl, max_capacity: cache_max_capacity },
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks every field. Deserialized configurations are not validated
    /// until this runs; [`KeyResolver::from_config`](crate::KeyResolver::from_config)
    /// calls it.
    ///
    /// # Errors
    ///
    /// - `jwks_url` empty, unparsable, not `http(s)`, or without a host
    /// - `cache_key` empty
    /// - `timeout` or `connect_timeout` below 1ms
    /// - `cache.max_capacity` below 1, `cache.ttl` below 1s
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_jwks_url(&self.jwks_url)?;
        if self.cache_key.is_empty() {
            return Err(ConfigError::Missing { field: "cache_key" });
        }
        check_timeout("timeout", self.timeout)?;
        check_timeout("connect_timeout", self.connect_timeout)?;
        self.cache_config().map(|_| ())
    }

    /// Returns the JWKS endpoint.
    #[must_use]
    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    /// Returns the cache key.
    #[must_use]
    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    /// Returns the whole-request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the connection timeout.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the cache settings.
    #[must_use]
    pub fn cache(&self) -> &CacheSettings {
        &self.cache
    }

    /// Builds the cache backend configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BelowMinimum`] for an out-of-range capacity or
    /// TTL.
    pub fn cache_config(&self) -> Result<CacheConfig, ConfigError> {
        CacheConfig::builder()
            .max_capacity(self.cache.max_capacity)
            .maybe_ttl(self.cache.ttl)
            .build()
    }

    /// Builds the HTTP fetcher for this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration is invalid or the HTTP
    /// client cannot be built.
    pub fn build_fetcher(&self) -> Result<HttpJwksFetcher, ConfigError> {
        self.validate()?;
        HttpJwksFetcher::new(&self.jwks_url, self.timeout, self.connect_timeout)
    }
}

fn check_timeout(field: &'static str, value: Duration) -> Result<(), ConfigError> {
    if value < MIN_TIMEOUT {
        return Err(ConfigError::BelowMinimum {
            field,
            min: format!("{}ms", MIN_TIMEOUT.as_millis()),
            value: format!("{}ms", value.as_millis()),
        });
    }
    Ok(())
}
