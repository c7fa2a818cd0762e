#![no_main]
use libfuzzer_sys::fuzz_target;
use loopy_core::persist::Diagram;
use loopy_core::sim::GlobalConfig;

fuzz_target!(|data: &[u8]| {
    // Malformed records must fall back or error, never panic.
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(diagram) = Diagram::from_json(json) {
        let mut engine = diagram.build(GlobalConfig::default());
        engine.start();
        for _ in 0..10 {
            engine.step(1.0);
        }
        let _ = Diagram::capture(&engine).to_json();
    }
});
