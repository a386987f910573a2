use std::cell::RefCell;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, Instant};

use reptrack_core::mocks::{FailingSource, VecSource};
use reptrack_core::{
    AngleSample, Clock, Frame, ReptrackError, RunParams, Session, run,
};

/// Records requested sleeps instead of sleeping.
struct FakeClock {
    epoch: Instant,
    slept: RefCell<Vec<Duration>>,
}

impl FakeClock {
    fn new() -> Self {
        Self {
            epoch: Instant::now(),
            slept: RefCell::new(Vec::new()),
        }
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.epoch + self.slept.borrow().iter().sum::<Duration>()
    }

    fn sleep(&self, d: Duration) {
        self.slept.borrow_mut().push(d);
    }
}

fn session() -> Session {
    Session::builder().session_id("run").build().unwrap()
}

fn frames(ts: &[f64]) -> Vec<Frame> {
    ts.iter()
        .map(|&t| Frame::from(AngleSample::new(170.0, 0.9, 33, t)))
        .collect()
}

#[test]
fn paced_replay_sleeps_sample_gaps() {
    let clock = FakeClock::new();
    let mut s = session();
    let mut src = VecSource::new(frames(&[1.0, 1.25, 2.0, 2.0]));
    let params = RunParams {
        pace: true,
        max_frames: None,
    };
    let stats = run(&mut src, &mut s, &clock, params, None).unwrap();
    assert_eq!(stats.frames, 4);
    let slept = clock.slept.borrow();
    assert_eq!(
        *slept,
        vec![
            Duration::ZERO,
            Duration::from_millis(250),
            Duration::from_millis(750),
            Duration::ZERO
        ]
    );
}

#[test]
fn unpaced_replay_never_sleeps() {
    let clock = FakeClock::new();
    let mut s = session();
    let mut src = VecSource::new(frames(&[0.0, 5.0, 10.0]));
    run(&mut src, &mut s, &clock, RunParams::default(), None).unwrap();
    assert!(clock.slept.borrow().is_empty());
}

#[test]
fn max_frames_caps_the_run() {
    let mut s = session();
    let mut src = VecSource::new(frames(&[0.0, 0.1, 0.2, 0.3, 0.4]));
    let params = RunParams {
        pace: false,
        max_frames: Some(3),
    };
    let stats = run(&mut src, &mut s, &FakeClock::new(), params, None).unwrap();
    assert_eq!(stats.frames, 3);
    assert_eq!(src.remaining(), 2);
    assert!(!stats.interrupted);
}

#[test]
fn shutdown_flag_interrupts() {
    let flag = AtomicBool::new(true);
    let mut s = session();
    let mut src = VecSource::new(frames(&[0.0, 0.1]));
    let stats = run(
        &mut src,
        &mut s,
        &FakeClock::new(),
        RunParams::default(),
        Some(&flag),
    )
    .unwrap();
    assert!(stats.interrupted);
    assert_eq!(stats.frames, 0);
    assert_eq!(s.frames(), 0);
}

#[test]
fn invalid_frames_are_counted() {
    let mut fs = frames(&[0.0, 0.1, 0.2]);
    fs[1].sample.confidence = 1.5;
    let mut s = session();
    let stats = run(
        &mut VecSource::new(fs),
        &mut s,
        &FakeClock::new(),
        RunParams::default(),
        None,
    )
    .unwrap();
    assert_eq!(stats.frames, 3);
    assert_eq!(stats.invalid_frames, 1);
}

#[test]
fn source_errors_bubble_up() {
    let mut s = session();
    let mut src = FailingSource::after(frames(&[0.0]));
    let err = run(&mut src, &mut s, &FakeClock::new(), RunParams::default(), None).unwrap_err();
    assert!(err.to_string().contains("reading frame 2"), "{err}");
    assert!(matches!(
        err.downcast_ref::<ReptrackError>(),
        Some(ReptrackError::Source(_))
    ));
    assert_eq!(s.frames(), 1);
}
