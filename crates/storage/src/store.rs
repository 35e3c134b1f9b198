//! The cache store contract.
//!
//! [`CacheStore`] is the minimal key-value interface the signing key resolver
//! needs from a cache: read a value by key, or replace it. Anything that can
//! honor the contract (an in-process map, a TTL-bounded cache, an external
//! cache service) can back the resolver without touching resolution logic.
//!
//! # Contract
//!
//! - `get` on a key that was never written (or whose value the backend has
//!   expired) returns `None`.
//! - `put` replaces the whole value stored under the key. A concurrent `get`
//!   observes either the previous value or the new one, never a mixture.
//! - Backends own their expiry and eviction policy; callers never expire
//!   values themselves.
//!
//! The [`conformance`](crate::conformance) module (feature `testutil`)
//! exercises these rules against any implementation.

use async_trait::async_trait;

use crate::error::StorageResult;

/// Key-value cache used to hold resolver state.
///
/// `V` is usually a cheaply cloneable snapshot (for example an `Arc`), since
/// every `get` hands the caller its own clone.
#[async_trait]
pub trait CacheStore<V>: Send + Sync
where
    V: Clone + Send + Sync + 'static,
{
    /// Returns the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Option<V>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`](crate::StorageError) if the backend could
    /// not persist the value. The previous value must remain readable in
    /// that case.
    async fn put(&self, key: &str, value: V) -> StorageResult<()>;
}
