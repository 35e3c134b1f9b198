//! End-to-end resolution scenarios against a mock JWKS endpoint.
//!
//! Each test stands up a `wiremock` server playing the issuer and drives the
//! real HTTP fetcher, key store, and resolver. Request-count expectations are
//! verified when the server drops.

#![allow(clippy::expect_used, clippy::panic)]

use std::{sync::Arc, time::Duration};

use jwks_resolver::{
    HttpJwksFetcher, KeyResolver, KeySet, KeyStore, RawKeyRecord, ResolutionError,
    ResolverConfig, SigningKey, assert_resolution_error, resolve_signing_key_for_token,
    testutil::{jwk_record, jwk_record_with_modulus, jwks_document, signed_token},
};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

const JWKS_PATH: &str = "/.well-known/jwks.json";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Mock issuer serving `records`, expecting exactly `fetches` requests.
async fn issuer(records: &[RawKeyRecord], fetches: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_document(records)))
        .expect(fetches)
        .mount(&server)
        .await;
    server
}

/// Mock issuer answering every request with `response`.
async fn issuer_responding(response: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET")).and(path(JWKS_PATH)).respond_with(response).mount(&server).await;
    server
}

fn resolver_for(server: &MockServer) -> KeyResolver {
    resolver_for_url(&format!("{}{JWKS_PATH}", server.uri()), Duration::from_secs(2))
}

fn resolver_for_url(url: &str, timeout: Duration) -> KeyResolver {
    let fetcher = HttpJwksFetcher::new(url, timeout, Duration::from_secs(1)).expect("fetcher");
    KeyResolver::new(Arc::new(KeyStore::in_memory()), Arc::new(fetcher))
}

fn cached_key(kid: &str) -> SigningKey {
    SigningKey::builder().kid(kid).n(format!("n-{kid}")).e("AQAB").build()
}

// ---------------------------------------------------------------------------
// Scenario A: cold cache, successful fetch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cold_cache_resolves_after_refresh() {
    let server = issuer(&[jwk_record_with_modulus("K1", "n-K1")], 1).await;
    let resolver = resolver_for(&server);

    let resolution = resolver.resolve("K1").await.expect("resolve");

    assert!(resolution.was_refreshed());
    assert_eq!(resolution.key().kid, "K1");
    assert_eq!(resolution.key().n, "n-K1");
    let cached = resolver.key_store().current().await.expect("key set cached");
    assert_eq!(cached.len(), 1);
}

// ---------------------------------------------------------------------------
// Scenario B: warm cache hit
// ---------------------------------------------------------------------------

#[tokio::test]
async fn warm_cache_hit_never_contacts_issuer() {
    let server = issuer(&[], 0).await;
    let resolver = resolver_for(&server);
    resolver.key_store().replace(KeySet::new(vec![cached_key("K1")])).await.expect("seed");

    let resolution = resolver.resolve("K1").await.expect("resolve");

    assert!(!resolution.was_refreshed());
    assert_eq!(resolution.into_key(), cached_key("K1"));
}

// ---------------------------------------------------------------------------
// Scenario C: rotation at the issuer
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rotation_replaces_key_set_wholesale() {
    let server = issuer(&[jwk_record_with_modulus("K2", "n-K2")], 2).await;
    let resolver = resolver_for(&server);
    resolver.key_store().replace(KeySet::new(vec![cached_key("K1")])).await.expect("seed");

    let resolution = resolver.resolve("K2").await.expect("resolve K2");
    assert!(resolution.was_refreshed());
    assert_eq!(resolver.key_store().current().await.expect("cached").kids(), vec!["K2"]);

    let err = resolver.resolve("K1").await.expect_err("K1 was rotated out");
    assert!(matches!(err, ResolutionError::KidNotFound { ref kid } if kid == "K1"));
}

// ---------------------------------------------------------------------------
// Scenario D: issuer unreachable
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unreachable_issuer_is_fetch_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("addr").port()
    };
    // The listener is closed; nothing accepts on this port.
    let url = format!("http://127.0.0.1:{port}{JWKS_PATH}");
    let resolver = resolver_for_url(&url, Duration::from_secs(2));

    let err = resolver.resolve("K1").await.expect_err("fetch must fail");

    assert_resolution_error!(err, FetchError);
    assert!(err.is_transient());
    assert!(resolver.key_store().current().await.is_none());
}

#[tokio::test]
async fn server_error_status_is_fetch_error() {
    let server = issuer_responding(ResponseTemplate::new(503)).await;
    let resolver = resolver_for(&server);

    let err = resolver.resolve("K1").await.expect_err("503 must fail");

    assert_resolution_error!(err, FetchError);
    assert!(err.to_string().contains("503"), "status in message: {err}");
    assert!(resolver.key_store().current().await.is_none());
}

#[tokio::test]
async fn not_found_status_is_fetch_error() {
    let server = MockServer::start().await;
    let resolver = resolver_for(&server);

    let err = resolver.resolve("K1").await.expect_err("404 must fail");
    assert_resolution_error!(err, FetchError);
}

#[tokio::test]
async fn slow_issuer_times_out_as_fetch_error() {
    let server = issuer_responding(
        ResponseTemplate::new(200)
            .set_body_json(jwks_document(&[jwk_record_with_modulus("K1", "n")]))
            .set_delay(Duration::from_secs(3)),
    )
    .await;
    let resolver =
        resolver_for_url(&format!("{}{JWKS_PATH}", server.uri()), Duration::from_millis(200));

    let err = resolver.resolve("K1").await.expect_err("must time out");

    assert_resolution_error!(err, FetchError);
    assert!(err.to_string().contains("timed out"), "got: {err}");
}

#[tokio::test]
async fn redirects_are_not_followed() {
    let server = issuer_responding(
        ResponseTemplate::new(302).insert_header("location", "https://elsewhere.example/jwks"),
    )
    .await;
    let resolver = resolver_for(&server);

    let err = resolver.resolve("K1").await.expect_err("redirect must fail");
    assert_resolution_error!(err, FetchError);
}

#[tokio::test]
async fn failed_refresh_keeps_stale_cache_serving() {
    let server = issuer_responding(ResponseTemplate::new(500)).await;
    let resolver = resolver_for(&server);
    resolver.key_store().replace(KeySet::new(vec![cached_key("K1")])).await.expect("seed");

    let err = resolver.resolve("K9").await.expect_err("refresh fails");
    assert_resolution_error!(err, FetchError);

    let resolution = resolver.resolve("K1").await.expect("stale cache still serves K1");
    assert!(!resolution.was_refreshed());
}

// ---------------------------------------------------------------------------
// Scenario E: only ineligible keys published
// ---------------------------------------------------------------------------

#[tokio::test]
async fn only_ineligible_keys_is_no_eligible_keys() {
    let records = [
        RawKeyRecord::new(json!({"kid": "K1", "kty": "RSA", "n": "n1", "e": "AQAB"})),
        RawKeyRecord::new(json!({"kid": "K2", "kty": "RSA", "use": "enc", "n": "n2", "e": "AQAB"})),
    ];
    let server = issuer(&records, 1).await;
    let resolver = resolver_for(&server);

    let err = resolver.resolve("K1").await.expect_err("no eligible keys");

    assert_resolution_error!(err, NoEligibleKeys);
    assert!(resolver.key_store().current().await.is_none());
}

#[tokio::test]
async fn only_ineligible_keys_keeps_previous_set() {
    let records = [RawKeyRecord::new(json!({"kid": "K1", "kty": "EC", "use": "sig"}))];
    let server = issuer(&records, 1).await;
    let resolver = resolver_for(&server);
    resolver.key_store().replace(KeySet::new(vec![cached_key("K0")])).await.expect("seed");

    let err = resolver.resolve("K1").await.expect_err("no eligible keys");

    assert_resolution_error!(err, NoEligibleKeys);
    assert_eq!(resolver.key_store().current().await.expect("kept").kids(), vec!["K0"]);
}

// ---------------------------------------------------------------------------
// Malformed issuer responses
// ---------------------------------------------------------------------------

#[tokio::test]
async fn non_json_body_is_parse_error() {
    let server =
        issuer_responding(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .await;
    let resolver = resolver_for(&server);

    let err = resolver.resolve("K1").await.expect_err("parse must fail");
    assert_resolution_error!(err, ParseError);
    assert!(!err.is_transient());
}

#[tokio::test]
async fn missing_keys_member_is_parse_error() {
    let server = issuer_responding(
        ResponseTemplate::new(200).set_body_json(json!({"jwks_uri": "https://issuer.example"})),
    )
    .await;
    let resolver = resolver_for(&server);

    let err = resolver.resolve("K1").await.expect_err("parse must fail");
    assert_resolution_error!(err, ParseError);
}

#[tokio::test]
async fn mixed_document_keeps_only_eligible_keys_in_order() {
    let records = [
        jwk_record_with_modulus("K3", "n3"),
        RawKeyRecord::new(json!({"kid": "enc", "kty": "RSA", "use": "enc", "n": "n", "e": "e"})),
        RawKeyRecord::new(json!("garbage")),
        jwk_record_with_modulus("K1", "n1"),
    ];
    let server = issuer(&records, 1).await;
    let resolver = resolver_for(&server);

    let installed = resolver.refresh().await.expect("refresh");
    assert_eq!(installed.kids(), vec!["K3", "K1"]);
}

// ---------------------------------------------------------------------------
// Token-level API and composition root
// ---------------------------------------------------------------------------

#[tokio::test]
async fn token_resolves_to_working_verifier() {
    let server = issuer(&[jwk_record("rsa-1")], 1).await;
    let config = ResolverConfig::builder()
        .jwks_url(format!("{}{JWKS_PATH}", server.uri()))
        .timeout(Duration::from_secs(2))
        .cache_ttl(Duration::from_secs(300))
        .build()
        .expect("config");
    let resolver = KeyResolver::from_config(&config).expect("resolver");
    let token = signed_token("rsa-1");

    let handle = resolve_signing_key_for_token(&token, &resolver).await.expect("resolve");
    assert!(handle.was_refreshed());

    let mut validation = handle.validation();
    validation.set_issuer(&["https://issuer.example"]);
    let data = jsonwebtoken::decode::<serde_json::Value>(&token, handle.decoding_key(), &validation)
        .expect("signature verifies");
    assert_eq!(data.claims["sub"], "test-subject");

    let again = resolve_signing_key_for_token(&token, &resolver).await.expect("cached");
    assert!(!again.was_refreshed(), "second resolution is served from cache");
}

#[tokio::test]
async fn from_config_uses_configured_cache_key() {
    let server = issuer(&[jwk_record_with_modulus("K1", "n")], 1).await;
    let config = ResolverConfig::builder()
        .jwks_url(format!("{}{JWKS_PATH}", server.uri()))
        .cache_key("jwks:tenant-a")
        .build()
        .expect("config");
    let resolver = KeyResolver::from_config(&config).expect("resolver");

    resolver.resolve("K1").await.expect("resolve");
    assert_eq!(resolver.key_store().cache_key(), "jwks:tenant-a");
}

#[tokio::test]
async fn expired_key_set_is_refetched_on_next_lookup() {
    let server = issuer(&[jwk_record_with_modulus("K1", "n")], 2).await;
    let config = ResolverConfig::builder()
        .jwks_url(format!("{}{JWKS_PATH}", server.uri()))
        .cache_ttl(Duration::from_secs(1))
        .build()
        .expect("config");
    let resolver = KeyResolver::from_config(&config).expect("resolver");

    assert!(resolver.resolve("K1").await.expect("cold").was_refreshed());
    assert!(!resolver.resolve("K1").await.expect("warm").was_refreshed());

    tokio::time::sleep(Duration::from_millis(1_200)).await;

    assert!(
        resolver.resolve("K1").await.expect("expired").was_refreshed(),
        "an expired key set reads as a miss"
    );
}

// ---------------------------------------------------------------------------
// Concurrency
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_cold_misses_all_resolve() {
    let server = issuer_responding(
        ResponseTemplate::new(200)
            .set_body_json(jwks_document(&[jwk_record_with_modulus("K1", "n1")]))
            .set_delay(Duration::from_millis(50)),
    )
    .await;
    let resolver = resolver_for(&server);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let resolver = resolver.clone();
        handles.push(tokio::spawn(async move { resolver.resolve("K1").await }));
    }
    for handle in handles {
        let resolution = handle.await.expect("join").expect("resolve");
        assert_eq!(resolution.key().kid, "K1");
    }

    let requests = server.received_requests().await.expect("recording enabled");
    assert!(
        (1..=8).contains(&requests.len()),
        "each racing miss may fetch at most once, got {}",
        requests.len()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancelled_caller_does_not_abort_other_resolutions() {
    let server = issuer_responding(
        ResponseTemplate::new(200)
            .set_body_json(jwks_document(&[jwk_record_with_modulus("K1", "n1")]))
            .set_delay(Duration::from_millis(200)),
    )
    .await;
    let resolver = resolver_for(&server);

    let cancelled = {
        let resolver = resolver.clone();
        tokio::spawn(async move { resolver.resolve("K1").await })
    };
    let survivor = {
        let resolver = resolver.clone();
        tokio::spawn(async move { resolver.resolve("K1").await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    cancelled.abort();

    let resolution = survivor.await.expect("join").expect("resolve");
    assert_eq!(resolution.key().kid, "K1");
}
