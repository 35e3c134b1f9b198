//! Key eligibility filtering.
//!
//! A JWKS record is eligible for RS256 verification only if:
//! - it is a JSON object
//! - `kty == "RSA"`
//! - `use == "sig"`
//! - `kid`, `n` and `e` are present, strings, and non-empty
//!
//! `alg` is carried through but not checked: issuers commonly omit it.

use std::fmt;

use serde_json::Value;

use crate::key::{RawKeyRecord, SigningKey};

/// Why a raw record was discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Ineligibility {
    /// The record is not a JSON object.
    NotAnObject,
    /// `kty` is absent or not `"RSA"`.
    NotRsa,
    /// `use` is absent or not `"sig"`.
    NotForSigning,
    /// `kid` is absent, empty, or not a string.
    MissingKid,
    /// `n` is absent, empty, or not a string.
    MissingModulus,
    /// `e` is absent, empty, or not a string.
    MissingExponent,
}

impl fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::NotAnObject => "record is not an object",
            Self::NotRsa => "kty is not RSA",
            Self::NotForSigning => "use is not sig",
            Self::MissingKid => "kid missing or empty",
            Self::MissingModulus => "n missing or empty",
            Self::MissingExponent => "e missing or empty",
        };
        f.write_str(reason)
    }
}

/// Checks one raw record, returning the typed key if it is eligible.
///
/// # Errors
///
/// Returns the first [`Ineligibility`] found, checked in the order listed in
/// the module documentation.
pub fn check_eligibility(record: &RawKeyRecord) -> Result<SigningKey, Ineligibility> {
    if !record.is_object() {
        return Err(Ineligibility::NotAnObject);
    }
    if record.str_field("kty") != Some("RSA") {
        return Err(Ineligibility::NotRsa);
    }
    if record.str_field("use") != Some("sig") {
        return Err(Ineligibility::NotForSigning);
    }
    let kid = non_empty(record, "kid").ok_or(Ineligibility::MissingKid)?;
    let n = non_empty(record, "n").ok_or(Ineligibility::MissingModulus)?;
    let e = non_empty(record, "e").ok_or(Ineligibility::MissingExponent)?;

    Ok(SigningKey {
        kid: kid.to_owned(),
        kty: "RSA".to_owned(),
        key_use: "sig".to_owned(),
        alg: record.str_field("alg").map(str::to_owned),
        n: n.to_owned(),
        e: e.to_owned(),
        x5c: certificate_chain(record.as_value()),
        x5t: record.str_field("x5t").map(str::to_owned),
    })
}

/// Keeps the eligible records, in their original relative order.
///
/// Pure and deterministic. Filtering the output again (after converting each
/// key back to a [`RawKeyRecord`]) yields the same keys.
pub fn filter_eligible(records: &[RawKeyRecord]) -> Vec<SigningKey> {
    records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| match check_eligibility(record) {
            Ok(key) => Some(key),
            Err(reason) => {
                tracing::debug!(
                    index,
                    kid = record.kid().unwrap_or("<none>"),
                    %reason,
                    "discarding ineligible JWKS record"
                );
                None
            },
        })
        .collect()
}

fn non_empty<'a>(record: &'a RawKeyRecord, name: &str) -> Option<&'a str> {
    record.str_field(name).filter(|value| !value.is_empty())
}

/// `x5c` is kept only when it is an array made entirely of strings.
fn certificate_chain(value: &Value) -> Option<Vec<String>> {
    value
        .get("x5c")?
        .as_array()?
        .iter()
        .map(|cert| cert.as_str().map(str::to_owned))
        .collect()
}
