//! The Key Resolver: `kid` → signing key, with one demand-driven refresh.
//!
//! # Algorithm
//!
//! ```text
//! resolve(kid)
//!   → KeyStore::lookup(kid) ── hit ──→ FromCache(key)
//!   → miss
//!   → JwksFetcher::fetch_raw()        (FetchError / ParseError: cache untouched)
//!   → filter_eligible(records)        (empty: NoEligibleKeys, cache untouched)
//!   → KeyStore::replace(key_set)      (wholesale)
//!   → KeyStore::lookup(kid) ── hit ──→ AfterRefresh(key)
//!   → miss ──→ KidNotFound
//! ```
//!
//! Exactly one refresh per call. There is no background polling, and
//! concurrent misses may each fetch; the last successful replace wins.

use std::sync::Arc;

use fail::fail_point;
use jwks_resolver_storage::ExpiringCacheStore;

use crate::{
    config::ResolverConfig,
    error::{KeyStoreError, ResolutionError},
    fetcher::JwksFetcher,
    filter::filter_eligible,
    key::{KeySet, SigningKey},
    key_store::KeyStore,
};

/// Outcome of a successful [`KeyResolver::resolve`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// The key was already cached; no fetch happened.
    FromCache(SigningKey),
    /// The key was found after refetching the JWKS document.
    AfterRefresh(SigningKey),
}

impl Resolution {
    /// The resolved key.
    #[must_use]
    pub fn key(&self) -> &SigningKey {
        match self {
            Self::FromCache(key) | Self::AfterRefresh(key) => key,
        }
    }

    /// Consumes the outcome, returning the resolved key.
    #[must_use]
    pub fn into_key(self) -> SigningKey {
        match self {
            Self::FromCache(key) | Self::AfterRefresh(key) => key,
        }
    }

    /// Returns `true` if resolving required a JWKS fetch.
    #[must_use]
    pub fn was_refreshed(&self) -> bool {
        matches!(self, Self::AfterRefresh(_))
    }
}

/// Resolves `kid`s against a [`KeyStore`], refreshing from a [`JwksFetcher`]
/// on a miss.
///
/// Cheap to clone; clones share the store and fetcher. Safe to call
/// concurrently.
#[derive(Clone)]
pub struct KeyResolver {
    key_store: Arc<KeyStore>,
    fetcher: Arc<dyn JwksFetcher>,
}

impl std::fmt::Debug for KeyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyResolver").field("key_store", &self.key_store).finish_non_exhaustive()
    }
}

impl KeyResolver {
    /// Creates a resolver over an existing store and fetcher.
    #[must_use]
    pub fn new(key_store: Arc<KeyStore>, fetcher: Arc<dyn JwksFetcher>) -> Self {
        Self { key_store, fetcher }
    }

    /// Builds the HTTP fetcher, a TTL/capacity-bounded cache, and the key
    /// store described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`](jwks_resolver_storage::ConfigError) if the
    /// HTTP client cannot be built.
    pub fn from_config(
        config: &ResolverConfig,
    ) -> Result<Self, jwks_resolver_storage::ConfigError> {
        let fetcher = config.build_fetcher()?;
        let cache = ExpiringCacheStore::<Arc<KeySet>>::new(&config.cache_config()?);
        let key_store = KeyStore::with_cache_key(Arc::new(cache), config.cache_key());
        Ok(Self::new(Arc::new(key_store), Arc::new(fetcher)))
    }

    /// The store this resolver reads and refreshes.
    #[must_use]
    pub fn key_store(&self) -> &Arc<KeyStore> {
        &self.key_store
    }

    /// Resolves `kid` to a signing key, refreshing the key set at most once.
    ///
    /// # Errors
    ///
    /// - [`ResolutionError::FetchError`] / [`ResolutionError::ParseError`]
    ///   from the refresh; the cache is left as it was
    /// - [`ResolutionError::NoEligibleKeys`] if the issuer published no usable
    ///   keys; the cache is left as it was
    /// - [`ResolutionError::KidNotFound`] if `kid` is absent even after the
    ///   refresh
    /// - [`ResolutionError::KeyStorageError`] if the cache rejects the write
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, kid: &str) -> Result<Resolution, ResolutionError> {
        match self.key_store.lookup(kid).await {
            Ok(key) => {
                tracing::debug!(cache = "hit", "signing key resolved from cache");
                return Ok(Resolution::FromCache(key));
            },
            Err(KeyStoreError::NotFound { .. }) => {
                tracing::debug!(cache = "miss", "refreshing key set");
            },
            Err(other) => return Err(other.into()),
        }

        self.refresh().await?;

        match self.key_store.lookup(kid).await {
            Ok(key) => Ok(Resolution::AfterRefresh(key)),
            Err(KeyStoreError::NotFound { kid }) => {
                tracing::warn!(kid = %kid, "kid not published by issuer after refresh");
                Err(ResolutionError::kid_not_found(kid))
            },
            Err(other) => Err(other.into()),
        }
    }

    /// Runs one fetch → filter → replace cycle.
    ///
    /// Called by [`resolve`](Self::resolve) on a miss; applications may also
    /// call it at startup to warm the cache. Returns the installed key set.
    ///
    /// # Errors
    ///
    /// Same contract as [`resolve`](Self::resolve) minus `KidNotFound`. On
    /// any error the previously cached set is preserved.
    #[tracing::instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Arc<KeySet>, ResolutionError> {
        fail_point!("resolver-before-fetch", |_| {
            Err(ResolutionError::fetch_error("injected failure before JWKS fetch"))
        });

        let records = self.fetcher.fetch_raw().await.inspect_err(|e| {
            tracing::warn!(error = %e, kind = %e.kind(), "JWKS fetch failed; keeping cached key set");
        })?;

        let eligible = filter_eligible(&records);
        let discarded = records.len() - eligible.len();
        if eligible.is_empty() {
            tracing::warn!(
                records = records.len(),
                "JWKS has no eligible RSA signing keys; keeping cached key set"
            );
            return Err(ResolutionError::no_eligible_keys());
        }

        let installed = self.key_store.replace(KeySet::new(eligible)).await?;
        tracing::info!(
            eligible = installed.len(),
            discarded,
            "installed refreshed signing key set"
        );
        Ok(installed)
    }
}
