//! Token header inspection and the public resolution API.
//!
//! Nothing here verifies a signature or a claim. The token header is read,
//! untrusted, only to learn which key the token claims to be signed with;
//! the caller verifies the token with the returned [`VerifierHandle`].
//!
//! # Example
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
//! let claims = jsonwebtoken::decode::<serde_json::Value>(
//!     token,
//!     handle.decoding_key(),
//!     &handle.validation(),
//! )?;
//! # Ok(())
//! # }
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, Header, Validation, decode_header};
use serde::Deserialize;

use crate::{
    error::ResolutionError,
    key::SigningKey,
    resolver::{KeyResolver, Resolution},
    validation::{validate_algorithm, validate_kid},
};

/// Decode JWT header without verification.
///
/// # Errors
///
/// Returns [`ResolutionError::MalformedToken`] if the token does not have
/// three segments or its header is not a valid JOSE header.
pub fn decode_jwt_header(token: &str) -> Result<Header, ResolutionError> {
    decode_header(token)
        .map_err(|e| ResolutionError::malformed_token(format!("Failed to decode JWT header: {e}")))
}

/// The header members resolution reads, as written in the token.
///
/// `alg` stays a string so values the JOSE header type cannot represent,
/// such as `"none"`, can still be refused by name.
#[derive(Deserialize)]
struct RawHeader {
    alg: String,
    kid: Option<String>,
}

fn decode_raw_header(token: &str) -> Result<RawHeader, ResolutionError> {
    let mut segments = token.split('.');
    let (Some(header), Some(_), Some(_), None) =
        (segments.next(), segments.next(), segments.next(), segments.next())
    else {
        return Err(ResolutionError::malformed_token("JWT must have 3 parts separated by dots"));
    };

    let header_bytes = URL_SAFE_NO_PAD.decode(header).map_err(|e| {
        ResolutionError::malformed_token(format!("Failed to decode JWT header: {e}"))
    })?;
    serde_json::from_slice(&header_bytes).map_err(|e| {
        ResolutionError::malformed_token(format!("Failed to parse JWT header: {e}"))
    })
}

/// Reads the header's `alg` string as written, without mapping it onto a
/// known algorithm.
///
/// Unlike [`decode_jwt_header`], this sees values the JOSE header type cannot
/// represent, such as `"none"`, so they can be refused by name.
///
/// # Errors
///
/// Returns [`ResolutionError::MalformedToken`] if the token does not have
/// three segments, or the header is not base64url JSON with a string `alg`.
pub fn peek_algorithm(token: &str) -> Result<String, ResolutionError> {
    decode_raw_header(token).map(|header| header.alg)
}

/// Extract and validate the `kid` from a token header.
///
/// # Errors
///
/// Returns [`ResolutionError::MalformedToken`] if the header cannot be
/// decoded, has no string `kid`, or the `kid` fails
/// [`validate_kid`](crate::validation::validate_kid).
pub fn extract_kid(token: &str) -> Result<String, ResolutionError> {
    checked_kid(decode_raw_header(token)?.kid)
}

fn checked_kid(kid: Option<String>) -> Result<String, ResolutionError> {
    let kid = kid.ok_or_else(|| ResolutionError::malformed_token("JWT header missing 'kid' field"))?;
    validate_kid(&kid)?;
    Ok(kid)
}

/// An RS256 verifier bound to one resolved signing key.
///
/// Pass [`decoding_key`](Self::decoding_key) and
/// [`validation`](Self::validation) to `jsonwebtoken::decode` to verify a
/// token's signature and claims.
#[derive(Clone)]
pub struct VerifierHandle {
    key: SigningKey,
    decoding_key: DecodingKey,
    refreshed: bool,
}

impl std::fmt::Debug for VerifierHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifierHandle")
            .field("kid", &self.key.kid)
            .field("refreshed", &self.refreshed)
            .finish_non_exhaustive()
    }
}

impl VerifierHandle {
    /// Builds a verifier from a resolution outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::InvalidPublicKey`] if the key's `n` or `e`
    /// is not valid base64url.
    pub fn from_resolution(resolution: Resolution) -> Result<Self, ResolutionError> {
        let refreshed = resolution.was_refreshed();
        let key = resolution.into_key();
        let decoding_key = DecodingKey::from_rsa_components(&key.n, &key.e)
            .map_err(|e| ResolutionError::invalid_public_key(key.kid.clone(), e.to_string()))?;
        Ok(Self { key, decoding_key, refreshed })
    }

    /// Key ID of the resolved key.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.key.kid
    }

    /// The resolved signing key.
    #[must_use]
    pub fn signing_key(&self) -> &SigningKey {
        &self.key
    }

    /// The RS256 decoding key built from the key's modulus and exponent.
    #[must_use]
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// Always [`Algorithm::RS256`].
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        Algorithm::RS256
    }

    /// Default jsonwebtoken validation pinned to RS256. Callers add their own
    /// issuer and audience requirements.
    #[must_use]
    pub fn validation(&self) -> Validation {
        Validation::new(Algorithm::RS256)
    }

    /// Returns `true` if resolving the key required a JWKS fetch.
    #[must_use]
    pub fn was_refreshed(&self) -> bool {
        self.refreshed
    }
}

/// Resolves the RS256 verifier for a token's `kid`.
///
/// 1. Decodes the header once and refuses any `alg` but RS256
/// 2. Checks the `kid` is present and within bounds
/// 3. Resolves the `kid` through `resolver` (one refresh at most)
/// 4. Builds a [`VerifierHandle`] from the key's modulus and exponent
///
/// Steps 1 and 2 never touch the cache or the network.
///
/// # Errors
///
/// - [`ResolutionError::MalformedToken`] for an unreadable header or `kid`
/// - [`ResolutionError::UnsupportedAlgorithm`] for any algorithm but RS256
/// - every error of [`KeyResolver::resolve`]
/// - [`ResolutionError::InvalidPublicKey`] if the key cannot form a verifier
#[tracing::instrument(skip(token, resolver))]
pub async fn resolve_signing_key_for_token(
    token: &str,
    resolver: &KeyResolver,
) -> Result<VerifierHandle, ResolutionError> {
    let header = decode_raw_header(token)?;
    validate_algorithm(&header.alg)?;
    let kid = checked_kid(header.kid)?;

    let resolution = resolver.resolve(&kid).await.inspect_err(|e| {
        tracing::debug!(kid = %kid, kind = %e.kind(), "signing key resolution failed");
    })?;

    let handle = VerifierHandle::from_resolution(resolution)?;
    tracing::debug!(kid = %kid, refreshed = handle.was_refreshed(), "verifier resolved");
    Ok(handle)
}
