#![no_main]
use libfuzzer_sys::fuzz_target;
use loopy_core::engine::Engine;

fuzz_target!(|data: &[u8]| {
    // Must not panic -- returning Err is fine.
    if let Ok(mut engine) = Engine::restore(data) {
        engine.step(1.0);
    }
});
