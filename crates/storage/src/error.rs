//! Storage error types and result alias.
//!
//! This module defines the errors a [`CacheStore`](crate::CacheStore) backend
//! can report, plus the configuration errors raised when a backend or a
//! resolver configuration is built with out-of-range values.
//!
//! # Error Types
//!
//! - [`StorageError::Connection`] - the cache service could not be reached
//! - [`StorageError::Internal`] - the backend rejected the operation
//! - [`StorageError::Timeout`] - the backend did not answer in time
//!
//! The in-process backends shipped with this crate never fail a `put`.
//!
//! # Example
//!
//! ```
//! use jwks_resolver_storage::{StorageError, StorageResult};
//!
//! fn publish(reachable: bool) -> StorageResult<()> {
//!     if !reachable {
//!         return Err(StorageError::connection("cache service refused connection"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(publish(false).is_err());
//! ```

use std::sync::Arc;

use thiserror::Error;

/// Shared, type-erased error kept as a `source`.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result of a cache store operation.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors a cache store may report from `put`.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`; downstream match expressions must
/// include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    /// The cache service could not be reached.
    #[error("Cache store unreachable: {message}")]
    Connection {
        /// What failed.
        message: String,
        /// Transport error, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// The backend refused or failed the operation.
    #[error("Cache store error: {message}")]
    Internal {
        /// What failed.
        message: String,
        /// Backend error, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// The backend did not answer in time.
    #[error("Cache store operation timed out")]
    Timeout,
}

impl StorageError {
    /// Creates a new `Connection` error with the given message.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection { message: message.into(), source: None }
    }

    /// Creates a new `Connection` error with a message and source error.
    #[must_use]
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Internal` error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into(), source: None }
    }

    /// Creates a new `Internal` error with a message and source error.
    #[must_use]
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Internal { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `Timeout` error.
    #[must_use]
    pub fn timeout() -> Self {
        Self::Timeout
    }

    /// Returns `true` for failures that may clear up on their own
    /// (connection and timeout errors).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Timeout)
    }
}

/// Errors raised when a configuration value is missing or out of range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A required field was not supplied or was empty.
    #[error("{field} is required")]
    Missing {
        /// Name of the missing field.
        field: &'static str,
    },

    /// A field was supplied but its value is unusable.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A numeric or duration field is below its allowed minimum.
    #[error("{field} must be at least {min}, got {value}")]
    BelowMinimum {
        /// Name of the offending field.
        field: &'static str,
        /// Smallest accepted value, rendered for display.
        min: String,
        /// Rejected value, rendered for display.
        value: String,
    },
}
