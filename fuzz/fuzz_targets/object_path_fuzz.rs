//! Fuzz test for object path parsing and key construction
//!
//! Arbitrary input must either be rejected as malformed or yield a path whose
//! content key splits back into exactly its segments.
//!
//! Run with: cargo +nightly fuzz run object_path_fuzz -- -max_total_time=60

#![no_main]

use depot_core::{validate_version, ErrorKind, KeyScheme, ObjectPath};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };
    let (path, version) = input.rsplit_once('@').unwrap_or((input, "v1"));

    match ObjectPath::parse(path) {
        Ok(parsed) => {
            assert_eq!(parsed.to_string(), path, "Display must round-trip");
            if validate_version(version).is_ok() {
                let key = KeyScheme::new(Some("fuzz")).content_key(&parsed, version);
                let segments: Vec<&str> = key.split('/').collect();
                assert_eq!(segments, vec!["fuzz", parsed.category(), parsed.name(), version]);
            }
        }
        Err(err) => assert_eq!(err.kind(), ErrorKind::Malformed),
    }
});
