//! Fuzz target for JWKS document parsing and key filtering.
//!
//! Feeds arbitrary bytes as an issuer response body. Parsing must never
//! panic, and every key that survives filtering must be eligible on its own.

#![no_main]

use libfuzzer_sys::fuzz_target;

use jwks_resolver::{RawKeyRecord, check_eligibility, filter_eligible, parse_jwks_document};

fuzz_target!(|data: &[u8]| {
    let Ok(records) = parse_jwks_document(data) else {
        return;
    };

    let eligible = filter_eligible(&records);
    assert!(eligible.len() <= records.len());

    for key in &eligible {
        let record = RawKeyRecord::from(key);
        assert!(check_eligibility(&record).is_ok(), "survivor {} is not eligible", key.kid);
    }
});
