//! Fuzz target for results manifest (`results.json`) decoding.
//!
//! Run with:
//!   cargo +nightly fuzz run results_manifest_parse

#![no_main]

use fieldpack::manifest::from_results_slice;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let _ = from_results_slice(data);
});
