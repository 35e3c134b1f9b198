//! Token header and configuration validation.
//!
//! These checks run before any cache or network access, so a hostile token
//! can never cause a JWKS fetch.
//!
//! # Security
//!
//! - Only RS256 is accepted; this resolver only tracks RSA signing keys
//! - Symmetric algorithms and `none` are always rejected, which prevents
//!   algorithm confusion (an HS256 token "signed" with the RSA public key)
//! - `kid` values are opaque but bounded: empty or oversized values are
//!   refused before they reach logs or lookups

use jwks_resolver_storage::ConfigError;
use reqwest::Url;

use crate::error::ResolutionError;

/// Forbidden JWT algorithms that are never accepted for security reasons.
///
/// - `none`: No signature verification (trivially bypassable)
/// - `HS256`, `HS384`, `HS512`: Symmetric algorithms (shared secret vulnerability)
pub const FORBIDDEN_ALGORITHMS: &[&str] = &["none", "HS256", "HS384", "HS512"];

/// Accepted JWT algorithms.
pub const ACCEPTED_ALGORITHMS: &[&str] = &["RS256"];

/// Maximum accepted length of a `kid`, in bytes.
pub const MAX_KID_LENGTH: usize = 256;

/// Validate a JWT header algorithm against the accepted list.
///
/// # Errors
///
/// Returns [`ResolutionError::UnsupportedAlgorithm`] if the algorithm is
/// forbidden or not in [`ACCEPTED_ALGORITHMS`].
///
/// # Examples
///
/// ```
/// use jwks_resolver::validation::validate_algorithm;
///
/// assert!(validate_algorithm("RS256").is_ok());
/// assert!(validate_algorithm("HS256").is_err());
/// assert!(validate_algorithm("ES256").is_err());
/// ```
pub fn validate_algorithm(alg: &str) -> Result<(), ResolutionError> {
    if FORBIDDEN_ALGORITHMS.contains(&alg) {
        return Err(ResolutionError::unsupported_algorithm(format!(
            "Algorithm '{alg}' is not allowed for security reasons"
        )));
    }

    if !ACCEPTED_ALGORITHMS.contains(&alg) {
        return Err(ResolutionError::unsupported_algorithm(format!(
            "Algorithm '{alg}' is not in accepted list (only RS256 is supported)"
        )));
    }

    Ok(())
}

/// Validate the size of a `kid` taken from an untrusted token header.
///
/// The `kid` is otherwise opaque and matched byte for byte against the
/// published keys, so any character an issuer may publish is accepted.
///
/// # Errors
///
/// Returns [`ResolutionError::MalformedToken`] if the `kid` is empty or longer
/// than [`MAX_KID_LENGTH`] bytes.
pub fn validate_kid(kid: &str) -> Result<(), ResolutionError> {
    if kid.is_empty() {
        return Err(ResolutionError::malformed_token("kid is empty"));
    }
    if kid.len() > MAX_KID_LENGTH {
        return Err(ResolutionError::malformed_token(format!(
            "kid exceeds {MAX_KID_LENGTH} bytes ({} bytes)",
            kid.len()
        )));
    }
    Ok(())
}

/// Parse and validate a JWKS endpoint URL: non-empty, `http` or `https`,
/// with a host.
///
/// Returns the parsed URL, ready for a request.
///
/// # Errors
///
/// Returns [`ConfigError::Missing`] for an empty URL and
/// [`ConfigError::Invalid`] for a URL that does not parse or violates the
/// rules above.
pub fn validate_jwks_url(url: &str) -> Result<Url, ConfigError> {
    if url.trim().is_empty() {
        return Err(ConfigError::Missing { field: "jwks_url" });
    }
    let parsed = Url::parse(url).map_err(|e| ConfigError::Invalid {
        field: "jwks_url",
        reason: format!("'{url}' is not a valid URL: {e}"),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            field: "jwks_url",
            reason: format!("'{url}' must use the http or https scheme"),
        });
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ConfigError::Invalid {
            field: "jwks_url",
            reason: format!("'{url}' has no host"),
        });
    }
    Ok(parsed)
}
