#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not.
    if let Ok(cfg) = millgen_config::load_toml(data) {
        if cfg.validate().is_ok() {
            // a validated start string must never panic the conversion either
            let _ = millgen_core::AssemblyParams::try_from(&cfg);
        }
    }
});
