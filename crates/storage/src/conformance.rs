//! Conformance test suite for [`CacheStore`] implementations.
//!
//! This module provides async test functions that validate whether a
//! [`CacheStore`] implementation satisfies the contract the resolver relies
//! on. Every backend, in-process or external, can run the same suite.
//!
//! # Usage
//!
//! Enable the `testutil` feature and call each conformance function with
//! a fresh store instance:
//!
//! ```ignore
//! use jwks_resolver_storage::{MemoryCacheStore, conformance};
//!
//! #[tokio::test]
//! async fn get_returns_none_for_missing_key() {
//!     conformance::get_returns_none_for_missing_key(&MemoryCacheStore::new()).await;
//! }
//! ```
//!
//! | Category | Functions | Contract aspect |
//! |----------|-----------|-----------------|
//! | Basic | 4 tests | get/put semantics |
//! | Concurrent | 2 tests | whole-value visibility under parallel access |

use std::sync::Arc;

use crate::store::CacheStore;

// ============================================================================
// Basic get/put semantics (4 tests)
// ============================================================================

/// `get` on a key that was never written returns `None`.
pub async fn get_returns_none_for_missing_key<S: CacheStore<String>>(store: &S) {
    assert_eq!(store.get("nonexistent").await, None, "missing key should return None");
}

/// `put` then `get` round-trips the value.
pub async fn put_then_get_returns_value<S: CacheStore<String>>(store: &S) {
    store.put("k1", "v1".to_owned()).await.expect("put should succeed");
    assert_eq!(store.get("k1").await.as_deref(), Some("v1"));
}

/// `put` on an existing key replaces the value wholesale.
pub async fn put_replaces_existing<S: CacheStore<String>>(store: &S) {
    store.put("k1", "original".to_owned()).await.expect("put");
    store.put("k1", "updated".to_owned()).await.expect("overwrite");
    assert_eq!(store.get("k1").await.as_deref(), Some("updated"));
}

/// Keys are distinct: writing one never affects another.
pub async fn keys_are_distinct<S: CacheStore<String>>(store: &S) {
    store.put("key", "a".to_owned()).await.expect("put key");
    store.put("key:other", "b".to_owned()).await.expect("put key:other");
    assert_eq!(store.get("key").await.as_deref(), Some("a"));
    assert_eq!(store.get("key:other").await.as_deref(), Some("b"));
}

// ============================================================================
// Concurrent access (2 tests)
// ============================================================================

/// Concurrent reads of the same key all return the same value.
pub async fn concurrent_reads_return_consistent_value<S: CacheStore<String> + 'static>(
    store: Arc<S>,
) {
    store.put("cread:k", "stable".to_owned()).await.expect("put");

    let mut handles = Vec::new();
    for _ in 0..50 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move { store.get("cread:k").await }));
    }
    for handle in handles {
        let value = handle.await.expect("task join");
        assert_eq!(value.as_deref(), Some("stable"));
    }
}

/// Readers racing a writer see either the previous value or the new one,
/// never anything else.
///
/// The writer alternates between two complete values; every observed value
/// must be one of them.
pub async fn concurrent_replace_is_atomic<S: CacheStore<String> + 'static>(store: Arc<S>) {
    const OLD: &str = "generation-old:k1,k2,k3";
    const NEW: &str = "generation-new:k4,k5";

    store.put("atomic:k", OLD.to_owned()).await.expect("seed put");

    let writer = {
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            for i in 0..200 {
                let value = if i % 2 == 0 { NEW } else { OLD };
                store.put("atomic:k", value.to_owned()).await.expect("writer put");
                tokio::task::yield_now().await;
            }
        })
    };

    let mut readers = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        readers.push(tokio::spawn(async move {
            for _ in 0..200 {
                let value = store.get("atomic:k").await.expect("value must stay present");
                assert!(value == OLD || value == NEW, "observed a torn value: {value}");
                tokio::task::yield_now().await;
            }
        }));
    }

    writer.await.expect("writer join");
    for reader in readers {
        reader.await.expect("reader join");
    }
}
