//! Fuzz target for manifest timestamp parsing (ISO-8601 and epoch forms).
//!
//! Run with:
//!   cargo +nightly fuzz run timestamp_parse

#![no_main]

use fieldpack::manifest::timestamp::fuzz_parse_timestamp;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 4096 {
        return;
    }

    if let Ok(input) = std::str::from_utf8(data) {
        fuzz_parse_timestamp(input);
    }
});
