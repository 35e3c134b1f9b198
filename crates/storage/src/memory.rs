//! In-memory cache store implementation.
//!
//! This module provides [`MemoryCacheStore`], an in-process implementation of
//! [`CacheStore`] with no expiry. Values live until they are replaced or the
//! store is dropped.
//!
//! # Example
//!
//! ```
//! use jwks_resolver_storage::{CacheStore, MemoryCacheStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = MemoryCacheStore::new();
//!
//!     store.put("greeting", "hello".to_owned()).await.unwrap();
//!     let value = store.get("greeting").await;
//!
//!     assert_eq!(value.as_deref(), Some("hello"));
//! }
//! ```

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::trace;

use crate::{error::StorageResult, store::CacheStore};

/// In-memory cache store backed by a [`HashMap`] behind a
/// [`parking_lot::RwLock`].
///
/// # Cloning
///
/// `MemoryCacheStore` is cheaply cloneable via [`Arc`]. All clones share the
/// same underlying map.
///
/// # Atomicity
///
/// `put` swaps the stored value while holding the write lock and `get`
/// clones it while holding the read lock, so readers only ever see whole
/// values.
pub struct MemoryCacheStore<V> {
    data: Arc<RwLock<HashMap<String, V>>>,
}

impl<V> MemoryCacheStore<V> {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { data: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Returns the number of keys currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns `true` if nothing has been stored yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl<V> Clone for MemoryCacheStore<V> {
    fn clone(&self) -> Self {
        Self { data: Arc::clone(&self.data) }
    }
}

impl<V> Default for MemoryCacheStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> CacheStore<V> for MemoryCacheStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &str) -> Option<V> {
        let value = self.data.read().get(key).cloned();
        trace!(key, hit = value.is_some(), "memory store get");
        value
    }

    async fn put(&self, key: &str, value: V) -> StorageResult<()> {
        self.data.write().insert(key.to_owned(), value);
        trace!(key, "memory store put");
        Ok(())
    }
}
