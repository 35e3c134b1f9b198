//! Signing key data model.
//!
//! - [`RawKeyRecord`]: one untyped entry of a JWKS `keys` array, as decoded
//!   from the wire and before any eligibility check.
//! - [`SigningKey`]: an eligible RSA signing key (see
//!   [`filter_eligible`](crate::filter_eligible)).
//! - [`KeySet`]: the immutable snapshot of eligible keys from one JWKS
//!   response, replaced wholesale on every successful fetch.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// An RSA public key published by the issuer, usable for RS256 verification.
///
/// Values of this type only come out of
/// [`filter_eligible`](crate::filter_eligible) (or are built directly in
/// tests), so `kty` is always `"RSA"`, `key_use` is always `"sig"`, and `kid`,
/// `n`, `e` are non-empty.
///
/// # Example
///
/// ```
/// use jwks_resolver::SigningKey;
///
/// let key = SigningKey::builder()
///     .kid("2024-rotation-a")
///     .n("sXchDaQebHnPiGvyDOAT4saGEUetSyo9MKLOoWFsueri")
///     .e("AQAB")
///     .alg("RS256")
///     .build();
///
/// assert_eq!(key.kty, "RSA");
/// assert_eq!(key.key_use, "sig");
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
pub struct SigningKey {
    /// Key ID, matched against the token header's `kid`.
    #[builder(into)]
    pub kid: String,

    /// Key type. Always `"RSA"`.
    #[builder(into, default = "RSA".to_owned())]
    pub kty: String,

    /// Intended key usage (JWK `use`). Always `"sig"`.
    #[serde(rename = "use")]
    #[builder(into, default = "sig".to_owned())]
    pub key_use: String,

    /// Declared algorithm, expected to be `"RS256"` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub alg: Option<String>,

    /// RSA modulus, base64url-encoded without padding.
    #[builder(into)]
    pub n: String,

    /// RSA public exponent, base64url-encoded without padding.
    #[builder(into)]
    pub e: String,

    /// X.509 certificate chain (standard base64, not base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5c: Option<Vec<String>>,

    /// X.509 certificate SHA-1 thumbprint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[builder(into)]
    pub x5t: Option<String>,
}

/// One entry of a JWKS `keys` array before filtering.
///
/// Issuers publish arbitrary extras alongside the standard JWK members, and
/// some publish entries that are not objects at all. A record therefore stays
/// an untyped JSON value until [`filter_eligible`](crate::filter_eligible)
/// decides whether it is a usable signing key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawKeyRecord(Value);

impl RawKeyRecord {
    /// Wraps a decoded JSON value.
    #[must_use]
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    /// Returns the underlying JSON value.
    #[must_use]
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consumes the record, returning the JSON value.
    #[must_use]
    pub fn into_value(self) -> Value {
        self.0
    }

    /// Returns the named member if the record is an object and the member is
    /// a JSON string.
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// Returns the record's `kid`, if it has a string one.
    #[must_use]
    pub fn kid(&self) -> Option<&str> {
        self.str_field("kid")
    }

    /// Returns `true` if the record is a JSON object.
    #[must_use]
    pub fn is_object(&self) -> bool {
        self.0.is_object()
    }
}

impl From<Value> for RawKeyRecord {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<&SigningKey> for RawKeyRecord {
    fn from(key: &SigningKey) -> Self {
        let mut record = Map::new();
        record.insert("kid".to_owned(), json!(key.kid));
        record.insert("kty".to_owned(), json!(key.kty));
        record.insert("use".to_owned(), json!(key.key_use));
        if let Some(alg) = &key.alg {
            record.insert("alg".to_owned(), json!(alg));
        }
        record.insert("n".to_owned(), json!(key.n));
        record.insert("e".to_owned(), json!(key.e));
        if let Some(x5c) = &key.x5c {
            record.insert("x5c".to_owned(), json!(x5c));
        }
        if let Some(x5t) = &key.x5t {
            record.insert("x5t".to_owned(), json!(x5t));
        }
        Self(Value::Object(record))
    }
}

impl From<SigningKey> for RawKeyRecord {
    fn from(key: SigningKey) -> Self {
        Self::from(&key)
    }
}

/// Immutable snapshot of the eligible signing keys from one JWKS response.
///
/// Order is the issuer's publication order. Lookups return the first key with
/// a matching `kid`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeySet {
    keys: Vec<SigningKey>,
    fetched_at: DateTime<Utc>,
}

impl KeySet {
    /// Creates a key set stamped with the current time.
    #[must_use]
    pub fn new(keys: Vec<SigningKey>) -> Self {
        Self { keys, fetched_at: Utc::now() }
    }

    /// Creates a key set with an explicit fetch timestamp.
    #[must_use]
    pub fn with_fetched_at(keys: Vec<SigningKey>, fetched_at: DateTime<Utc>) -> Self {
        Self { keys, fetched_at }
    }

    /// Returns the first key whose `kid` equals `kid` exactly.
    #[must_use]
    pub fn find(&self, kid: &str) -> Option<&SigningKey> {
        self.keys.iter().find(|key| key.kid == kid)
    }

    /// Returns the keys in stored order.
    #[must_use]
    pub fn keys(&self) -> &[SigningKey] {
        &self.keys
    }

    /// Returns every `kid` in stored order (duplicates included).
    #[must_use]
    pub fn kids(&self) -> Vec<&str> {
        self.keys.iter().map(|key| key.kid.as_str()).collect()
    }

    /// Returns each `kid` that appears more than once, in first-seen order.
    #[must_use]
    pub fn duplicate_kids(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        let mut duplicates = Vec::new();
        for key in &self.keys {
            let kid = key.kid.as_str();
            if !seen.insert(kid) && reported.insert(kid) {
                duplicates.push(kid);
            }
        }
        duplicates
    }

    /// Number of keys in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns `true` if the set holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// When the JWKS response behind this set was received.
    #[must_use]
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

impl From<Vec<SigningKey>> for KeySet {
    fn from(keys: Vec<SigningKey>) -> Self {
        Self::new(keys)
    }
}
