//! Fuzz target for token header inspection.
//!
//! Feeds arbitrary byte strings as tokens to the header readers and the
//! validators that run before any key lookup. Every result must be either
//! `Ok(...)` or `Err(ResolutionError)`; no input may panic.

#![no_main]

use libfuzzer_sys::fuzz_target;

use jwks_resolver::{
    decode_jwt_header, extract_kid,
    jwt::peek_algorithm,
    validate_algorithm, validate_kid,
};

fuzz_target!(|data: &[u8]| {
    // Only process valid UTF-8; tokens are always UTF-8 strings
    let Ok(token) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(alg) = peek_algorithm(token) {
        let _ = validate_algorithm(&alg);
    }

    if let Ok(header) = decode_jwt_header(token)
        && let Some(ref kid) = header.kid
    {
        let _ = validate_kid(kid);
    }

    // A kid that extracts cleanly must also pass validation on its own
    if let Ok(kid) = extract_kid(token) {
        assert!(validate_kid(&kid).is_ok(), "extracted kid failed validation: {kid:?}");
    }
});
