#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(json) = std::str::from_utf8(data)
        && let Ok(ops) = accel_opgen::parse_operators(json, "fuzz")
    {
        for op in &ops {
            let _ = accel_opgen::generate(op);
        }
    }
});
