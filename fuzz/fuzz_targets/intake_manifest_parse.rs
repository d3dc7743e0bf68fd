//! Fuzz target for intake manifest (`jobs.json`) decoding.
//!
//! Run with:
//!   cargo +nightly fuzz run intake_manifest_parse

#![no_main]

use fieldpack::manifest::from_intake_slice;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Real manifests are a few hundred KB at most.
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let _ = from_intake_slice(data);
});
