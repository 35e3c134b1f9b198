//! Resolution error types.
//!
//! This module defines the errors returned by the Key Store, the JWKS
//! fetcher, the Key Resolver, and the token-level resolution API.

use jwks_resolver_storage::{BoxError, StorageError};
use thiserror::Error;

/// Errors surfaced by signing-key resolution.
///
/// Every failure is distinguishable by kind (see [`ResolutionError::kind`]) so
/// a caller can decide whether to fail the request, retry later, or treat the
/// failure as a security event.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`; new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResolutionError {
    /// Token header or `kid` is unreadable. Caller error, never retried.
    #[error("Malformed token: {message}")]
    MalformedToken {
        /// What was wrong with the token.
        message: String,
    },

    /// JWKS transport failure: non-2xx status, network error, or timeout.
    #[error("JWKS fetch failed: {message}")]
    FetchError {
        /// Description of the transport failure.
        message: String,
        /// The underlying HTTP client error, when there is one.
        #[source]
        source: Option<BoxError>,
    },

    /// JWKS response body is not valid JSON or lacks a `keys` array.
    #[error("JWKS parse failed: {message}")]
    ParseError {
        /// Description of the parse failure.
        message: String,
    },

    /// The issuer published a key set containing no usable signing keys.
    #[error("JWKS contains no eligible RSA signing keys")]
    NoEligibleKeys,

    /// The `kid` is not in the key set, even after a refresh.
    #[error("Signing key not found: {kid}")]
    KidNotFound {
        /// Key ID that could not be resolved.
        kid: String,
    },

    /// Token header names an algorithm other than RS256.
    #[error("Unsupported algorithm: {message}")]
    UnsupportedAlgorithm {
        /// Description of the rejected algorithm.
        message: String,
    },

    /// The resolved key's modulus or exponent cannot form an RS256 verifier.
    #[error("Invalid public key {kid}: {message}")]
    InvalidPublicKey {
        /// Key ID of the unusable key.
        kid: String,
        /// Why the key could not be used.
        message: String,
    },

    /// The cache store failed to persist a key set.
    ///
    /// Wraps the original [`StorageError`] to preserve the full error source
    /// chain for debugging and structured logging.
    #[error("Key storage error: {0}")]
    KeyStorageError(
        /// The underlying storage error.
        #[source]
        StorageError,
    ),
}

/// Fieldless discriminant of [`ResolutionError`], for branching and metrics
/// labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum ResolutionErrorKind {
    /// See [`ResolutionError::MalformedToken`].
    MalformedToken,
    /// See [`ResolutionError::FetchError`].
    FetchError,
    /// See [`ResolutionError::ParseError`].
    ParseError,
    /// See [`ResolutionError::NoEligibleKeys`].
    NoEligibleKeys,
    /// See [`ResolutionError::KidNotFound`].
    KidNotFound,
    /// See [`ResolutionError::UnsupportedAlgorithm`].
    UnsupportedAlgorithm,
    /// See [`ResolutionError::InvalidPublicKey`].
    InvalidPublicKey,
    /// See [`ResolutionError::KeyStorageError`].
    KeyStorageError,
}

impl ResolutionErrorKind {
    /// Stable snake_case name, suitable for log fields.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MalformedToken => "malformed_token",
            Self::FetchError => "fetch_error",
            Self::ParseError => "parse_error",
            Self::NoEligibleKeys => "no_eligible_keys",
            Self::KidNotFound => "kid_not_found",
            Self::UnsupportedAlgorithm => "unsupported_algorithm",
            Self::InvalidPublicKey => "invalid_public_key",
            Self::KeyStorageError => "key_storage_error",
        }
    }
}

impl std::fmt::Display for ResolutionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ResolutionError {
    /// Creates a new `MalformedToken` error.
    #[must_use]
    pub fn malformed_token(message: impl Into<String>) -> Self {
        Self::MalformedToken { message: message.into() }
    }

    /// Creates a new `FetchError` without an underlying source.
    #[must_use]
    pub fn fetch_error(message: impl Into<String>) -> Self {
        Self::FetchError { message: message.into(), source: None }
    }

    /// Creates a new `FetchError` wrapping the client error that caused it.
    #[must_use]
    pub fn fetch_error_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::FetchError { message: message.into(), source: Some(std::sync::Arc::new(source)) }
    }

    /// Creates a new `ParseError`.
    #[must_use]
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::ParseError { message: message.into() }
    }

    /// Creates a new `NoEligibleKeys` error.
    #[must_use]
    pub fn no_eligible_keys() -> Self {
        Self::NoEligibleKeys
    }

    /// Creates a new `KidNotFound` error.
    #[must_use]
    pub fn kid_not_found(kid: impl Into<String>) -> Self {
        Self::KidNotFound { kid: kid.into() }
    }

    /// Creates a new `UnsupportedAlgorithm` error.
    #[must_use]
    pub fn unsupported_algorithm(message: impl Into<String>) -> Self {
        Self::UnsupportedAlgorithm { message: message.into() }
    }

    /// Creates a new `InvalidPublicKey` error.
    #[must_use]
    pub fn invalid_public_key(kid: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPublicKey { kid: kid.into(), message: message.into() }
    }

    /// Creates a new `KeyStorageError`.
    #[must_use]
    pub fn key_storage_error(err: StorageError) -> Self {
        Self::KeyStorageError(err)
    }

    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> ResolutionErrorKind {
        match self {
            Self::MalformedToken { .. } => ResolutionErrorKind::MalformedToken,
            Self::FetchError { .. } => ResolutionErrorKind::FetchError,
            Self::ParseError { .. } => ResolutionErrorKind::ParseError,
            Self::NoEligibleKeys => ResolutionErrorKind::NoEligibleKeys,
            Self::KidNotFound { .. } => ResolutionErrorKind::KidNotFound,
            Self::UnsupportedAlgorithm { .. } => ResolutionErrorKind::UnsupportedAlgorithm,
            Self::InvalidPublicKey { .. } => ResolutionErrorKind::InvalidPublicKey,
            Self::KeyStorageError(_) => ResolutionErrorKind::KeyStorageError,
        }
    }

    /// Returns `true` if resolving again later may succeed.
    ///
    /// Only transport failures and connection/timeout storage failures are
    /// transient. `KidNotFound` is deliberately not: a token naming an
    /// unknown key should fail verification.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::FetchError { .. } => true,
            Self::KeyStorageError(err) => err.is_transient(),
            _ => false,
        }
    }
}

/// Errors returned by [`KeyStore`](crate::KeyStore) operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KeyStoreError {
    /// No key set is cached, or the cached set has no key with this `kid`.
    #[error("No cached signing key with kid {kid}")]
    NotFound {
        /// Key ID that was looked up.
        kid: String,
    },

    /// Refused to cache a key set with zero keys.
    #[error("Refusing to cache an empty key set")]
    EmptySet,

    /// The cache store rejected the write.
    #[error("Cache store write failed: {0}")]
    Storage(#[source] StorageError),
}

impl From<KeyStoreError> for ResolutionError {
    fn from(err: KeyStoreError) -> Self {
        match err {
            KeyStoreError::NotFound { kid } => ResolutionError::KidNotFound { kid },
            KeyStoreError::EmptySet => ResolutionError::NoEligibleKeys,
            KeyStoreError::Storage(err) => ResolutionError::KeyStorageError(err),
        }
    }
}

impl From<StorageError> for ResolutionError {
    fn from(err: StorageError) -> Self {
        ResolutionError::KeyStorageError(err)
    }
}

/// Result type alias for resolution operations.
pub type Result<T> = std::result::Result<T, ResolutionError>;
