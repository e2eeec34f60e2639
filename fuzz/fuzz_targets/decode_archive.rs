#![no_main]

use libfuzzer_sys::fuzz_target;
use muster_core::archive::decode_document;

// Plain or gzip bytes must decode or error, never panic.
fuzz_target!(|data: &[u8]| {
    let _ = decode_document(data);
});
