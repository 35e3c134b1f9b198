//! Shared test utilities for resolver testing.
//!
//! This module provides RSA test key pairs, JWK records for them, RS256
//! tokens signed with them, raw crafted tokens (for attack testing), a
//! scripted in-memory [`JwksFetcher`], and the [`assert_resolution_error!`]
//! macro. It is feature-gated behind `testutil` to keep it out of production
//! builds.
//!
//! # Usage
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! jwks-resolver = { path = "../resolver", features = ["testutil"] }
//! ```
//!
//! Then import helpers:
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use jwks_resolver::testutil::{jwk_record, signed_token};
//! ```

use std::{
    collections::VecDeque,
    sync::{
        LazyLock,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use parking_lot::Mutex;
use rand_core::OsRng;
use rsa::{
    RsaPrivateKey,
    pkcs1::{EncodeRsaPrivateKey, LineEnding},
    traits::PublicKeyParts,
};
use serde_json::{Value, json};

use crate::{error::ResolutionError, fetcher::JwksFetcher, key::RawKeyRecord};

/// RSA key size for test keys. The verification backend refuses smaller
/// moduli.
const TEST_KEY_BITS: usize = 2048;

/// An RSA key pair in the encodings tests need.
pub struct TestKeypair {
    /// PKCS#1 PEM private key (for [`EncodingKey::from_rsa_pem`]).
    pub private_pem: String,
    /// Modulus, base64url without padding (JWK `n`).
    pub modulus_b64: String,
    /// Public exponent, base64url without padding (JWK `e`).
    pub exponent_b64: String,
}

impl TestKeypair {
    /// Generates a fresh key pair.
    ///
    /// # Panics
    ///
    /// Panics if key generation or PEM encoding fails.
    pub fn generate() -> Self {
        let private_key =
            RsaPrivateKey::new(&mut OsRng, TEST_KEY_BITS).expect("RSA key generation failed");
        let private_pem =
            private_key.to_pkcs1_pem(LineEnding::LF).expect("PEM encoding failed").as_str().to_owned();
        Self {
            private_pem,
            modulus_b64: URL_SAFE_NO_PAD.encode(private_key.n().to_bytes_be()),
            exponent_b64: URL_SAFE_NO_PAD.encode(private_key.e().to_bytes_be()),
        }
    }

    /// An eligible JWK record for this key's public half.
    pub fn jwk(&self, kid: &str) -> RawKeyRecord {
        RawKeyRecord::new(json!({
            "kid": kid,
            "kty": "RSA",
            "use": "sig",
            "alg": "RS256",
            "n": self.modulus_b64,
            "e": self.exponent_b64,
        }))
    }

    /// An RS256 token with `kid` in its header, signed with this key.
    ///
    /// Claims: `iss`, `sub` (`"test-subject"`), `iat`, and `exp` one hour
    /// out.
    ///
    /// # Panics
    ///
    /// Panics if JWT encoding fails.
    pub fn sign(&self, kid: &str) -> String {
        let now = Utc::now().timestamp();
        let claims = json!({
            "iss": "https://issuer.example",
            "sub": "test-subject",
            "iat": now,
            "exp": now + 3600,
        });

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(kid.to_owned());

        let encoding_key =
            EncodingKey::from_rsa_pem(self.private_pem.as_bytes()).expect("invalid test PEM");
        jsonwebtoken::encode(&header, &claims, &encoding_key).expect("Failed to encode test JWT")
    }
}

static PRIMARY: LazyLock<TestKeypair> = LazyLock::new(TestKeypair::generate);
static SECONDARY: LazyLock<TestKeypair> = LazyLock::new(TestKeypair::generate);

/// Process-wide test key pair, generated once.
pub fn test_keypair() -> &'static TestKeypair {
    &PRIMARY
}

/// A second process-wide key pair, for rotation and forged-signature tests.
pub fn secondary_keypair() -> &'static TestKeypair {
    &SECONDARY
}

/// Eligible JWK record for [`test_keypair`].
pub fn jwk_record(kid: &str) -> RawKeyRecord {
    test_keypair().jwk(kid)
}

/// Eligible JWK record with an arbitrary modulus string. Enough for
/// resolution tests that never build a verifier.
pub fn jwk_record_with_modulus(kid: &str, modulus: &str) -> RawKeyRecord {
    RawKeyRecord::new(json!({
        "kid": kid,
        "kty": "RSA",
        "use": "sig",
        "n": modulus,
        "e": "AQAB",
    }))
}

/// RS256 token signed with [`test_keypair`].
pub fn signed_token(kid: &str) -> String {
    test_keypair().sign(kid)
}

/// Builds a JWKS document body from records.
pub fn jwks_document(records: &[RawKeyRecord]) -> Value {
    json!({ "keys": records })
}

/// Create a raw JWT string from header and payload JSON (with a fake
/// signature).
pub fn craft_raw_jwt(header_json: &Value, payload_json: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(header_json.to_string());
    let payload = URL_SAFE_NO_PAD.encode(payload_json.to_string());
    let signature = URL_SAFE_NO_PAD.encode(b"not-a-real-signature");
    format!("{header}.{payload}.{signature}")
}

type ScriptedResponse = Result<Vec<RawKeyRecord>, ResolutionError>;

/// In-memory [`JwksFetcher`] that replays queued responses and counts calls.
///
/// Once the queue is drained every call fails with a `FetchError`.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: Mutex<VecDeque<ScriptedResponse>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedFetcher {
    /// Creates a fetcher with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fetcher that sleeps for `delay` before answering.
    pub fn with_delay(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::default() }
    }

    /// Queues a successful response.
    pub fn push_records(&self, records: Vec<RawKeyRecord>) {
        self.responses.lock().push_back(Ok(records));
    }

    /// Queues a failure.
    pub fn push_error(&self, error: ResolutionError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Number of `fetch_raw` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JwksFetcher for ScriptedFetcher {
    async fn fetch_raw(&self) -> Result<Vec<RawKeyRecord>, ResolutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ResolutionError::fetch_error("no scripted JWKS response")))
    }
}

/// Asserts that a [`ResolutionError`] has the given
/// [`ResolutionErrorKind`](crate::ResolutionErrorKind).
///
/// ```ignore
/// # use jwks_resolver::{ResolutionError, assert_resolution_error};
/// let err = ResolutionError::kid_not_found("k1");
/// assert_resolution_error!(err, KidNotFound);
/// ```
#[macro_export]
macro_rules! assert_resolution_error {
    ($err:expr, $kind:ident) => {{
        let err = &$err;
        assert_eq!(
            err.kind(),
            $crate::ResolutionErrorKind::$kind,
            "expected {} error, got: {:?}",
            stringify!($kind),
            err
        );
    }};
}
