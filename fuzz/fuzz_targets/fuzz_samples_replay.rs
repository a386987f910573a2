#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary recordings must never panic the parser or the session.
    let Ok(frames) = reptrack_config::parse_samples_csv(data) else {
        return;
    };
    let Ok(mut session) = reptrack_core::Session::builder().session_id("fuzz").build() else {
        return;
    };
    for f in &frames {
        let status = session.process(f);
        assert!(status.valid_reps <= status.total_reps);
    }
    let report = session.finish();
    assert!((0.0..=100.0).contains(&report.summary.success_rate));
});
