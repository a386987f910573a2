use proptest::prelude::*;
use reptrack_core::counter::{REP_PATTERN, consistency_score};
use reptrack_core::{AngleSample, MovementPhase, PhaseCfg, PhaseMachine, RepCounter};

proptest! {
    // Jitter inside the widened Top band never leaves Top.
    #[test]
    fn no_flapping_near_top(jitter in proptest::collection::vec(146.0f64..=180.0, 1..200)) {
        let mut m = PhaseMachine::new(PhaseCfg::default());
        assert_eq!(m.update(&AngleSample::new(170.0, 0.9, 33, 0.0)), MovementPhase::Top);
        for (i, a) in jitter.iter().enumerate() {
            let phase = m.update(&AngleSample::new(*a, 0.9, 33, (i + 1) as f64 * 0.03));
            prop_assert_eq!(phase, MovementPhase::Top);
        }
        prop_assert_eq!(m.transition_history(100).len(), 1);
    }

    // Only adjacency-table moves are ever accepted.
    #[test]
    fn transitions_respect_adjacency(angles in proptest::collection::vec(1.0f64..=180.0, 1..300)) {
        let mut m = PhaseMachine::new(PhaseCfg::default());
        let mut prev = m.current_phase();
        for (i, a) in angles.iter().enumerate() {
            let next = m.update(&AngleSample::new(*a, 0.9, 33, i as f64 * 0.03));
            prop_assert!(next == prev || prev.can_transition_to(next), "{prev} -> {next}");
            prev = next;
        }
        prop_assert!(m.transition_history(1000).len() <= 10);
    }

    // A finished cycle always counts in total; validity follows the duration window.
    #[test]
    fn duration_gate(duration in 0.05f64..20.0) {
        let mut c = RepCounter::default();
        let mut completed = false;
        for (i, p) in REP_PATTERN.iter().enumerate() {
            completed = c.update(*p, 120.0, None, duration * i as f64 / 4.0);
        }
        prop_assert_eq!(c.total_reps(), 1);
        let in_window = (2.0..=10.0).contains(&duration);
        prop_assert_eq!(completed, in_window);
        prop_assert_eq!(c.valid_reps(), u32::from(in_window));
        prop_assert_eq!(c.buffered_len(), 0);
    }

    // Spreading durations further from their mean never raises consistency.
    #[test]
    fn consistency_falls_with_variance(
        devs in proptest::collection::vec(-1.0f64..1.0, 2..12),
        k1 in 0.0f64..2.0,
        extra in 0.0f64..2.0,
    ) {
        let k2 = k1 + extra;
        let scores = vec![80.0; devs.len()];
        let d1: Vec<f64> = devs.iter().map(|d| 5.0 + k1 * d).collect();
        let d2: Vec<f64> = devs.iter().map(|d| 5.0 + k2 * d).collect();
        let c1 = consistency_score(&d1, &scores);
        let c2 = consistency_score(&d2, &scores);
        prop_assert!(c2 <= c1 + 1e-9);
        prop_assert!((0.0..=100.0).contains(&c2));
    }
}
