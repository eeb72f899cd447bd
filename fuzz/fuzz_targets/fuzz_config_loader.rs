#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Parse and validation errors are fine; panics are not. A config that
    // validates must also convert into core options without error.
    let Ok(cfg) = toml::from_str::<bimeter_config::Config>(data) else {
        return;
    };
    if cfg.validate().is_ok() {
        let built = bimeter_core::Reassembler::builder()
            .with_config(&cfg)
            .and_then(|b| b.build());
        assert!(built.is_ok(), "validated config rejected: {built:?}");
    }
});
