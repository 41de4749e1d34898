#![no_main]
#![forbid(unsafe_code)]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Truncated/overflowing/trailing-byte varints must error, never panic.
    let _ = provider_registry::codec::decode_timestamp(data);
});
