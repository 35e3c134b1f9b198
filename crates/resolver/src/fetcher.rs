//! JWKS retrieval.
//!
//! [`JwksFetcher`] is the seam between the resolver and the issuer: it
//! returns the raw `keys` array of the issuer's current JWKS document,
//! unfiltered. [`HttpJwksFetcher`] is the reqwest implementation.
//!
//! Fetchers never retry. The single refetch-and-retry policy belongs to
//! [`KeyResolver`](crate::KeyResolver).

use std::time::Duration;

use async_trait::async_trait;
use jwks_resolver_storage::ConfigError;
use reqwest::Url;
use serde::Deserialize;

use crate::{error::ResolutionError, key::RawKeyRecord, validation::validate_jwks_url};

/// Source of raw JWKS key records.
///
/// # Errors
///
/// Implementations report transport failures (non-2xx status, network error,
/// timeout) as [`ResolutionError::FetchError`] and undecodable bodies as
/// [`ResolutionError::ParseError`].
#[async_trait]
pub trait JwksFetcher: Send + Sync {
    /// Retrieves the issuer's current key records, before eligibility
    /// filtering.
    async fn fetch_raw(&self) -> Result<Vec<RawKeyRecord>, ResolutionError>;
}

/// Wire shape of a JWKS document. Members other than `keys` are ignored.
#[derive(Deserialize)]
struct JwksDocument {
    keys: Vec<RawKeyRecord>,
}

/// Decodes a JWKS document body into its raw key records.
///
/// # Errors
///
/// Returns [`ResolutionError::ParseError`] if `body` is not JSON, is not an
/// object, or has no `keys` array.
///
/// # Example
///
/// ```
/// use jwks_resolver::parse_jwks_document;
///
/// let records = parse_jwks_document(br#"{"keys": [{"kid": "k1"}]}"#).unwrap();
/// assert_eq!(records[0].kid(), Some("k1"));
///
/// assert!(parse_jwks_document(b"<html>").is_err());
/// ```
pub fn parse_jwks_document(body: &[u8]) -> Result<Vec<RawKeyRecord>, ResolutionError> {
    serde_json::from_slice::<JwksDocument>(body)
        .map(|document| document.keys)
        .map_err(|e| ResolutionError::parse_error(format!("invalid JWKS document: {e}")))
}

/// Fetches a JWKS document over HTTP(S) with reqwest.
///
/// Redirects are not followed: the configured URL is the issuer's key
/// endpoint, and a redirect is reported as a non-2xx `FetchError`.
#[derive(Clone, Debug)]
pub struct HttpJwksFetcher {
    client: reqwest::Client,
    jwks_url: Url,
}

impl HttpJwksFetcher {
    /// Creates a fetcher with its own client, bounded by `timeout` for the
    /// whole request and `connect_timeout` for connection setup.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `jwks_url` is not an `http(s)` URL or the
    /// HTTP client cannot be built.
    pub fn new(
        jwks_url: impl AsRef<str>,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ConfigError::Invalid { field: "http_client", reason: e.to_string() })?;
        Self::with_client(client, jwks_url)
    }

    /// Creates a fetcher around an existing client, e.g. one shared with the
    /// rest of the application.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `jwks_url` does not parse as an `http(s)`
    /// URL with a host.
    pub fn with_client(
        client: reqwest::Client,
        jwks_url: impl AsRef<str>,
    ) -> Result<Self, ConfigError> {
        let jwks_url = validate_jwks_url(jwks_url.as_ref())?;
        Ok(Self { client, jwks_url })
    }

    /// The endpoint this fetcher reads, as parsed.
    #[must_use]
    pub fn jwks_url(&self) -> &Url {
        &self.jwks_url
    }
}

#[async_trait]
impl JwksFetcher for HttpJwksFetcher {
    #[tracing::instrument(skip(self), fields(url = %self.jwks_url))]
    async fn fetch_raw(&self) -> Result<Vec<RawKeyRecord>, ResolutionError> {
        let response = self
            .client
            .get(self.jwks_url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, "JWKS endpoint returned non-success status");
            return Err(ResolutionError::fetch_error(format!(
                "JWKS endpoint returned HTTP {status}"
            )));
        }

        let body = response.bytes().await.map_err(transport_error)?;
        let records = parse_jwks_document(&body).inspect_err(|e| {
            tracing::warn!(error = %e, body_len = body.len(), "JWKS response did not parse");
        })?;

        tracing::debug!(records = records.len(), "JWKS document fetched");
        Ok(records)
    }
}

fn transport_error(err: reqwest::Error) -> ResolutionError {
    let message = if err.is_timeout() {
        "JWKS request timed out"
    } else if err.is_connect() {
        "could not connect to JWKS endpoint"
    } else {
        "JWKS request failed"
    };
    tracing::warn!(error = %err, "{message}");
    ResolutionError::fetch_error_with_source(message, err)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn test_parse_document_with_extras() {
        let body = br#"{
            "keys": [
                {"kid": "k1", "kty": "RSA", "use": "sig", "n": "nn", "e": "AQAB", "extra": 1},
                {"kid": "k2", "kty": "EC"}
            ],
            "issuer_metadata": {"rotation": "weekly"}
        }"#;
        let records = parse_jwks_document(body).expect("parse");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kid(), Some("k1"));
        assert_eq!(records[1].str_field("kty"), Some("EC"));
    }

    #[test]
    fn test_parse_empty_keys_array() {
        let records = parse_jwks_document(br#"{"keys": []}"#).expect("empty array is valid");
        assert!(records.is_empty());
    }

    #[test]
    fn test_parse_keeps_non_object_records() {
        let records = parse_jwks_document(br#"{"keys": [1, "two", null]}"#).expect("parse");
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| !r.is_object()));
    }

    #[rstest]
    #[case::not_json(b"<html>502 Bad Gateway</html>".as_slice())]
    #[case::empty_body(b"".as_slice())]
    #[case::missing_keys(br#"{"jwks": []}"#.as_slice())]
    #[case::keys_not_array(br#"{"keys": {"kid": "k1"}}"#.as_slice())]
    #[case::keys_null(br#"{"keys": null}"#.as_slice())]
    #[case::top_level_array(br#"[{"kid": "k1"}]"#.as_slice())]
    #[case::truncated(br#"{"keys": [{"kid": "k1""#.as_slice())]
    fn test_parse_rejects(#[case] body: &[u8]) {
        let err = parse_jwks_document(body).unwrap_err();
        assert!(matches!(err, ResolutionError::ParseError { .. }), "got {err:?}");
    }

    #[rstest]
    #[case::no_scheme("issuer.example/jwks.json")]
    #[case::ftp("ftp://issuer.example/jwks.json")]
    #[case::empty("")]
    #[case::unclosed_ipv6("https://[::1/jwks")]
    #[case::port_out_of_range("https://host:99999999/jwks")]
    fn test_new_rejects_bad_url(#[case] url: &str) {
        let result = HttpJwksFetcher::new(url, Duration::from_secs(1), Duration::from_secs(1));
        assert!(
            matches!(
                result,
                Err(ConfigError::Invalid { field: "jwks_url", .. } | ConfigError::Missing { field: "jwks_url" })
            ),
            "got {result:?}"
        );
    }

    #[test]
    fn test_new_accepts_https_url() {
        let fetcher = HttpJwksFetcher::new(
            "https://issuer.example/.well-known/jwks.json",
            Duration::from_secs(5),
            Duration::from_secs(2),
        )
        .expect("valid");
        assert_eq!(fetcher.jwks_url().as_str(), "https://issuer.example/.well-known/jwks.json");
    }
}
