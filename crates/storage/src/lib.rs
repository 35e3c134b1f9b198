//! Cache store abstraction for the JWKS signing key resolver.
//!
//! This crate provides the [`CacheStore`] trait: the minimal `get`/`put`
//! contract the resolver's key store is written against, together with the
//! backends that ship with it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    jwks-resolver                            │
//! │         KeyResolver → KeyStore (lookup / replace)           │
//! ├─────────────────────────────────────────────────────────────┤
//! │                 jwks-resolver-storage                       │
//! │               CacheStore trait (get, put)                   │
//! ├──────────────────┬──────────────────────────────────────────┤
//! │ MemoryCacheStore │          ExpiringCacheStore              │
//! │  (no expiry)     │      (moka, TTL + capacity bound)        │
//! └──────────────────┴──────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use jwks_resolver_storage::{CacheStore, MemoryCacheStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MemoryCacheStore::new();
//!
//!     store.put("jwks:signing-keys", vec!["k1".to_owned()]).await?;
//!     let value = store.get("jwks:signing-keys").await;
//!
//!     assert_eq!(value, Some(vec!["k1".to_owned()]));
//!     Ok(())
//! }
//! ```
//!
//! # Implementing a Backend
//!
//! 1. Implement [`CacheStore`] for your type
//! 2. Map backend-specific failures to [`StorageError`]
//! 3. Run the [`conformance`] suite against it (feature `testutil`)
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `conformance` module with the shared backend contract tests.

#![deny(unsafe_code)]
#![warn(missing_docs)]

#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::panic)]
pub mod conformance;
pub mod error;
pub mod expiring;
pub mod memory;
pub mod store;

// Re-export primary types at crate root for convenience
pub use error::{BoxError, ConfigError, StorageError, StorageResult};
pub use expiring::{CacheConfig, CacheConfigBuilder, DEFAULT_MAX_CAPACITY, ExpiringCacheStore};
pub use memory::MemoryCacheStore;
pub use store::CacheStore;
