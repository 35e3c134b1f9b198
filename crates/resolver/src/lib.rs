//! # JWKS Signing Key Resolver
//!
//! Resolves the RSA public key that signed an RS256 token, given only the
//! token's `kid`, from a cached copy of the issuer's JWKS.
//!
//! This crate provides:
//! - **Key Store**: the current key set, replaced wholesale on refresh
//! - **Key Resolver**: cache lookup, demand-driven refetch, one retry
//! - **JWKS fetching**: reqwest HTTP fetcher with timeouts
//! - **Eligibility filtering**: only `kty=RSA`, `use=sig` keys with `kid`/`n`/`e`
//! - **Token API**: `kid` extraction and an RS256 [`VerifierHandle`]
//!
//! ## Resolution
//!
//! ```text
//! token → alg check → kid → KeyStore::lookup ── hit ──→ VerifierHandle
//!                               │ miss
//!                               ▼
//!                     fetch → filter → replace → lookup ── hit ──→ VerifierHandle
//!                                                  │ miss
//!                                                  ▼
//!                                             KidNotFound
//! ```
//!
//! Signature and claim verification stay with the caller: pass
//! [`VerifierHandle::decoding_key`] and [`VerifierHandle::validation`] to
//! `jsonwebtoken::decode`.
//!
//! ## Example
//!
//! ```no_run
//! use jwks_resolver::{KeyResolver, ResolverConfig, resolve_signing_key_for_token};
//!
//! # async fn example(token: &str) -> Result<(), Box<dyn std::error::Error>> {
//! let config = ResolverConfig::builder()
//!     .jwks_url("https://issuer.example/.well-known/jwks.json")
//!     .build()?;
//! let resolver = KeyResolver::from_config(&config)?;
//!
//! let handle = resolve_signing_key_for_token(token, &resolver).await?;
//! println!("token signed with {}", handle.kid());
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **`testutil`**: RSA test keys, signed tokens, a scripted fetcher, and
//!   [`assert_resolution_error!`]
//! - **`failpoints`**: compiles in the `resolver-before-fetch` fail point

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Resolver configuration.
pub mod config;
/// Resolution error types.
pub mod error;
/// JWKS retrieval.
pub mod fetcher;
/// Key eligibility filtering.
pub mod filter;
/// Token header inspection and the public resolution API.
pub mod jwt;
/// Signing key data model.
pub mod key;
/// Current key set storage.
pub mod key_store;
/// Cache-aside key resolution.
pub mod resolver;
/// Shared test utilities (feature `testutil`).
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::panic)]
pub mod testutil;
/// Token header and configuration validation.
pub mod validation;

// Re-export key types for convenience
pub use config::{CacheSettings, ResolverConfig};
pub use error::{KeyStoreError, ResolutionError, ResolutionErrorKind, Result};
pub use fetcher::{HttpJwksFetcher, JwksFetcher, parse_jwks_document};
pub use filter::{Ineligibility, check_eligibility, filter_eligible};
pub use jwks_resolver_storage::{CacheStore, ConfigError, StorageError};
pub use jwt::{VerifierHandle, decode_jwt_header, extract_kid, resolve_signing_key_for_token};
pub use key::{KeySet, RawKeyRecord, SigningKey};
pub use key_store::{DEFAULT_CACHE_KEY, KeySetCache, KeyStore};
pub use resolver::{KeyResolver, Resolution};
pub use validation::{ACCEPTED_ALGORITHMS, FORBIDDEN_ALGORITHMS, validate_algorithm, validate_kid};
