//! Fuzz test for object-store listing pages
//!
//! Paging through an arbitrary sorted keyspace with any page size must
//! terminate, never repeat an entry, and return exactly what one unbounded
//! listing returns.
//!
//! Run with: cargo +nightly fuzz run listing_fuzz -- -max_total_time=60

#![no_main]

use std::collections::BTreeSet;

use depot_storage::{page_sorted_keys, ListRequest};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&page_size, rest)) = data.split_first() else {
        return;
    };
    let Ok(input) = std::str::from_utf8(rest) else {
        return;
    };
    let mut lines = input.lines();
    let prefix = lines.next().unwrap_or_default().to_string();
    let keys: BTreeSet<&str> = lines.collect();

    let full = page_sorted_keys(
        keys.iter().copied(),
        &ListRequest::new(prefix.clone(), usize::MAX).with_delimiter('/'),
    );
    assert!(!full.is_truncated);

    let mut seen_keys = Vec::new();
    let mut seen_prefixes = Vec::new();
    let mut marker: Option<String> = None;
    loop {
        let request = ListRequest::new(prefix.clone(), usize::from(page_size % 8) + 1)
            .with_delimiter('/')
            .with_marker(marker.clone());
        let page = page_sorted_keys(keys.iter().copied(), &request);
        seen_keys.extend(page.keys);
        seen_prefixes.extend(page.common_prefixes);
        if !page.is_truncated {
            break;
        }
        let next = page.next_marker.expect("truncated pages carry a marker");
        assert!(marker.as_ref().map_or(true, |m| next > *m), "marker must advance");
        marker = Some(next);
    }

    assert_eq!(seen_keys, full.keys);
    assert_eq!(seen_prefixes, full.common_prefixes);
});
