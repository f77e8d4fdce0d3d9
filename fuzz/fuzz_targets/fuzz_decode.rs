#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Decoding arbitrary bytes may fail but should never panic.
    if let Ok(words) = accel_backend::command::from_le_bytes(data) {
        let _ = accel_backend::decode(&words);
    }
});
