//! The Key Store: holder of the current signing key set.
//!
//! [`KeyStore`] keeps exactly one [`KeySet`] under a fixed cache key in a
//! [`CacheStore`]. A set is installed whole and read whole: a concurrent
//! [`lookup`](KeyStore::lookup) sees either the set before a
//! [`replace`](KeyStore::replace) or the set after it, never a mixture.
//!
//! The store is an explicitly constructed value, shared by handle. Tests build
//! an isolated instance each.
//!
//! ```
//! use jwks_resolver::{KeySet, KeyStore, SigningKey};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = KeyStore::in_memory();
//!
//! let key = SigningKey::builder().kid("k1").n("modulus").e("AQAB").build();
//! store.replace(KeySet::new(vec![key.clone()])).await?;
//!
//! assert_eq!(store.lookup("k1").await?, key);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use jwks_resolver_storage::{CacheStore, MemoryCacheStore};

use crate::{
    error::KeyStoreError,
    key::{KeySet, SigningKey},
};

/// Cache key under which the current key set is stored.
pub const DEFAULT_CACHE_KEY: &str = "jwks:signing-keys";

/// Shared handle to the backing cache.
pub type KeySetCache = Arc<dyn CacheStore<Arc<KeySet>>>;

/// Holds the current [`KeySet`] and serves `kid` lookups.
#[derive(Clone)]
pub struct KeyStore {
    cache: KeySetCache,
    cache_key: String,
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore").field("cache_key", &self.cache_key).finish_non_exhaustive()
    }
}

impl KeyStore {
    /// Creates a key store over `cache` using [`DEFAULT_CACHE_KEY`].
    #[must_use]
    pub fn new(cache: KeySetCache) -> Self {
        Self::with_cache_key(cache, DEFAULT_CACHE_KEY)
    }

    /// Creates a key store backed by a process-local [`MemoryCacheStore`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCacheStore::<Arc<KeySet>>::new()))
    }

    /// Creates a key store over `cache` using a custom cache key, so several
    /// issuers can share one backing cache.
    #[must_use]
    pub fn with_cache_key(cache: KeySetCache, cache_key: impl Into<String>) -> Self {
        Self { cache, cache_key: cache_key.into() }
    }

    /// The cache key this store reads and writes.
    #[must_use]
    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    /// Returns the currently cached key set, if any.
    pub async fn current(&self) -> Option<Arc<KeySet>> {
        self.cache.get(&self.cache_key).await
    }

    /// Looks up the first key in the current set whose `kid` equals `kid`.
    ///
    /// # Errors
    ///
    /// Returns [`KeyStoreError::NotFound`] if no set is cached yet or the set
    /// has no key with this `kid`.
    pub async fn lookup(&self, kid: &str) -> Result<SigningKey, KeyStoreError> {
        let Some(set) = self.current().await else {
            tracing::debug!(kid, "key store empty");
            return Err(KeyStoreError::NotFound { kid: kid.to_owned() });
        };
        set.find(kid).cloned().ok_or_else(|| KeyStoreError::NotFound { kid: kid.to_owned() })
    }

    /// Installs `key_set` as the current set, discarding the previous one.
    ///
    /// Returns the installed snapshot.
    ///
    /// # Errors
    ///
    /// - [`KeyStoreError::EmptySet`] if `key_set` has no keys; the previous
    ///   set stays in place.
    /// - [`KeyStoreError::Storage`] if the cache rejects the write.
    #[tracing::instrument(skip(self, key_set), fields(cache_key = %self.cache_key, keys = key_set.len()))]
    pub async fn replace(&self, key_set: KeySet) -> Result<Arc<KeySet>, KeyStoreError> {
        if key_set.is_empty() {
            return Err(KeyStoreError::EmptySet);
        }

        let duplicates = key_set.duplicate_kids();
        if !duplicates.is_empty() {
            tracing::warn!(
                kids = ?duplicates,
                "key set contains duplicate kids; first match in publication order wins"
            );
        }

        let key_set = Arc::new(key_set);
        self.cache
            .put(&self.cache_key, Arc::clone(&key_set))
            .await
            .map_err(KeyStoreError::Storage)?;

        tracing::debug!(kids = ?key_set.kids(), "key set installed");
        Ok(key_set)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use async_trait::async_trait;
    use jwks_resolver_storage::{StorageError, StorageResult};
    use parking_lot::Mutex;

    use super::*;

    fn key(kid: &str) -> SigningKey {
        SigningKey::builder().kid(kid).n(format!("modulus-{kid}")).e("AQAB").build()
    }

    fn store() -> KeyStore {
        KeyStore::in_memory()
    }

    #[tokio::test]
    async fn test_lookup_on_empty_store() {
        let store = store();
        let err = store.lookup("k1").await.unwrap_err();
        assert!(matches!(err, KeyStoreError::NotFound { ref kid } if kid == "k1"));
        assert!(store.current().await.is_none());
    }

    #[tokio::test]
    async fn test_replace_then_lookup_round_trip() {
        let store = store();
        let k2 = key("k2");
        store.replace(KeySet::new(vec![key("k1"), k2.clone()])).await.expect("replace");

        assert_eq!(store.lookup("k2").await.expect("lookup"), k2);
        assert!(matches!(store.lookup("k3").await, Err(KeyStoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_replace_empty_set_keeps_previous() {
        let store = store();
        store.replace(KeySet::new(vec![key("k1")])).await.expect("seed");

        let err = store.replace(KeySet::new(Vec::new())).await.unwrap_err();
        assert!(matches!(err, KeyStoreError::EmptySet));

        let current = store.current().await.expect("previous set kept");
        assert_eq!(current.kids(), vec!["k1"]);
        assert!(store.lookup("k1").await.is_ok());
    }

    #[tokio::test]
    async fn test_replace_empty_set_on_empty_store() {
        let store = store();
        assert!(matches!(store.replace(KeySet::new(Vec::new())).await, Err(KeyStoreError::EmptySet)));
        assert!(store.current().await.is_none());
    }

    #[tokio::test]
    async fn test_replace_is_wholesale() {
        let store = store();
        store.replace(KeySet::new(vec![key("k1")])).await.expect("first");
        store.replace(KeySet::new(vec![key("k2")])).await.expect("second");

        assert!(store.lookup("k1").await.is_err(), "old key must be gone");
        assert!(store.lookup("k2").await.is_ok());
    }

    #[tokio::test]
    async fn test_replace_returns_installed_snapshot() {
        let store = store();
        let installed = store.replace(KeySet::new(vec![key("k1")])).await.expect("replace");
        let current = store.current().await.expect("current");
        assert!(Arc::ptr_eq(&installed, &current));
    }

    #[tokio::test]
    async fn test_duplicate_kid_first_match_wins() {
        let store = store();
        let first = SigningKey::builder().kid("dup").n("first").e("AQAB").build();
        let second = SigningKey::builder().kid("dup").n("second").e("AQAB").build();
        store.replace(KeySet::new(vec![first.clone(), second])).await.expect("replace");

        assert_eq!(store.lookup("dup").await.expect("lookup"), first);
    }

    #[tokio::test]
    async fn test_custom_cache_keys_are_isolated() {
        let cache: KeySetCache = Arc::new(MemoryCacheStore::<Arc<KeySet>>::new());
        let issuer_a = KeyStore::with_cache_key(Arc::clone(&cache), "jwks:issuer-a");
        let issuer_b = KeyStore::with_cache_key(cache, "jwks:issuer-b");

        issuer_a.replace(KeySet::new(vec![key("a1")])).await.expect("replace");

        assert!(issuer_a.lookup("a1").await.is_ok());
        assert!(issuer_b.lookup("a1").await.is_err());
        assert_eq!(issuer_b.cache_key(), "jwks:issuer-b");
    }

    /// Cache that can be switched to reject writes.
    struct FailingCache {
        inner: MemoryCacheStore<Arc<KeySet>>,
        fail_with: Mutex<Option<StorageError>>,
    }

    impl FailingCache {
        fn new() -> Self {
            Self { inner: MemoryCacheStore::new(), fail_with: Mutex::new(None) }
        }

        fn set_failure(&self, error: Option<StorageError>) {
            *self.fail_with.lock() = error;
        }
    }

    #[async_trait]
    impl CacheStore<Arc<KeySet>> for FailingCache {
        async fn get(&self, key: &str) -> Option<Arc<KeySet>> {
            self.inner.get(key).await
        }

        async fn put(&self, key: &str, value: Arc<KeySet>) -> StorageResult<()> {
            if let Some(err) = self.fail_with.lock().take() {
                return Err(err);
            }
            self.inner.put(key, value).await
        }
    }

    #[tokio::test]
    async fn test_storage_failure_keeps_previous_set() {
        let cache = Arc::new(FailingCache::new());
        let store = KeyStore::new(Arc::clone(&cache) as KeySetCache);
        store.replace(KeySet::new(vec![key("k1")])).await.expect("seed");

        cache.set_failure(Some(StorageError::connection("cache unreachable")));
        let err = store.replace(KeySet::new(vec![key("k2")])).await.unwrap_err();
        assert!(matches!(err, KeyStoreError::Storage(StorageError::Connection { .. })));

        assert!(store.lookup("k1").await.is_ok());
        assert!(store.lookup("k2").await.is_err());
    }
}
