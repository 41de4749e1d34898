#![no_main]
#![forbid(unsafe_code)]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Best-effort: key parsing must never panic, regardless of input shape.
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = provider_registry::key_builder::parse_key(s);
    }
});
