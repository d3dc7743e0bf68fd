//! Fuzz target for `windows.csv` decoding.
//!
//! Run with:
//!   cargo +nightly fuzz run windows_csv_parse

#![no_main]

use fieldpack::export::from_windows_csv_slice;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let _ = from_windows_csv_slice(data);
});
