#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not. A config that
    // validates must also build a session.
    if let Ok(cfg) = toml::from_str::<reptrack_config::Config>(data)
        && cfg.validate().is_ok()
    {
        let built = reptrack_core::Session::builder()
            .session_id("fuzz")
            .phase((&cfg.phase).into())
            .counter((&cfg.counter).into())
            .diagnostics((&cfg.diagnostics).into())
            .gate((&cfg.gate).into())
            .build();
        assert!(built.is_ok(), "validated config rejected by builder: {built:?}");
    }
});
