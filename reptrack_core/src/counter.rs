//! Repetition counter: matches the phase stream against one full cycle.
//!
//! A rep is `Top -> Descending -> Bottom -> Ascending -> Top`. Phases that do
//! not advance the pattern are buffered and otherwise ignored, so consecutive
//! frames in the same phase are harmless, though a rest at the opening Top
//! longer than `max_top_hold_s` restarts the rep clock. A finished cycle is
//! always counted in `total_reps`; only cycles passing the duration and form
//! gates become [`RepetitionRecord`]s.

use serde::{Deserialize, Serialize};

use crate::config::CounterCfg;
use crate::error::GateFailure;
use crate::phase::MovementPhase;
use crate::util::{mean, min_max, sample_stdev};

/// Phase pattern of one complete repetition.
pub const REP_PATTERN: [MovementPhase; 5] = [
    MovementPhase::Top,
    MovementPhase::Descending,
    MovementPhase::Bottom,
    MovementPhase::Ascending,
    MovementPhase::Top,
];

/// Form score assumed when a cycle carried no scores.
pub const DEFAULT_FORM_SCORE: f64 = 100.0;

/// One finalized cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepetitionRecord {
    pub rep_number: u32,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    pub phase_sequence: Vec<MovementPhase>,
    pub angle_sequence: Vec<f64>,
    pub form_scores: Vec<f64>,
    pub average_form_score: f64,
    pub is_valid: bool,
}

impl RepetitionRecord {
    /// Check the cycle against the validity gates.
    pub fn check(&self, cfg: &CounterCfg) -> Result<(), GateFailure> {
        let visited = |p| self.phase_sequence.contains(&p);
        if ![
            MovementPhase::Top,
            MovementPhase::Descending,
            MovementPhase::Bottom,
            MovementPhase::Ascending,
        ]
        .into_iter()
        .all(visited)
        {
            return Err(GateFailure::IncompleteCycle);
        }
        if !(cfg.min_rep_duration_s..=cfg.max_rep_duration_s).contains(&self.duration) {
            return Err(GateFailure::Duration(self.duration));
        }
        if !self.form_scores.is_empty() && self.average_form_score < cfg.min_form_score {
            return Err(GateFailure::FormScore(self.average_form_score));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PerformanceStats {
    pub total_reps: u32,
    pub valid_reps: u32,
    pub average_duration: f64,
    pub average_form_score: f64,
    pub consistency_score: f64,
    pub fastest_rep: f64,
    pub slowest_rep: f64,
}

/// Where the in-progress cycle stands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RepProgress {
    /// Pattern steps matched after the opening Top.
    pub stage: usize,
    pub stages: usize,
    pub percent: f64,
    /// Next phase that would advance the cycle; `None` when idle.
    pub expected_phase: Option<MovementPhase>,
    pub rep_in_progress: bool,
}

/// Consistency over a set of reps: `max(0, 100 - (stdev(d) * 10 + stdev(s) / 10))`.
///
/// Fewer than two reps are perfectly consistent.
pub fn consistency_score(durations: &[f64], form_scores: &[f64]) -> f64 {
    if durations.len() < 2 {
        return 100.0;
    }
    let d = sample_stdev(durations).unwrap_or(0.0);
    let s = sample_stdev(form_scores).unwrap_or(0.0);
    (100.0 - (d * 10.0 + s / 10.0)).max(0.0)
}

#[derive(Debug, Clone)]
pub struct RepCounter {
    cfg: CounterCfg,
    sequence_index: usize,
    current_rep_start: Option<f64>,
    phases: Vec<MovementPhase>,
    angles: Vec<f64>,
    scores: Vec<f64>,
    total_reps: u32,
    valid_reps: u32,
    history: Vec<RepetitionRecord>,
    last_rejected: Option<(RepetitionRecord, GateFailure)>,
}

impl Default for RepCounter {
    fn default() -> Self {
        Self::new(CounterCfg::default())
    }
}

impl RepCounter {
    pub fn new(cfg: CounterCfg) -> Self {
        Self {
            cfg,
            sequence_index: 0,
            current_rep_start: None,
            phases: Vec::new(),
            angles: Vec::new(),
            scores: Vec::new(),
            total_reps: 0,
            valid_reps: 0,
            history: Vec::new(),
            last_rejected: None,
        }
    }

    pub fn cfg(&self) -> &CounterCfg {
        &self.cfg
    }

    /// Feed one phase observation. Returns `true` when this call finalized a
    /// cycle that passed every gate.
    pub fn update(
        &mut self,
        phase: MovementPhase,
        angle: f64,
        form_score: Option<f64>,
        timestamp: f64,
    ) -> bool {
        if self.stalled(timestamp) {
            tracing::debug!(
                stage = self.sequence_index,
                started = self.current_rep_start,
                at = timestamp,
                "abandoning stalled cycle"
            );
            self.reset_current();
        }

        // Nothing to keep while no window is open.
        if self.sequence_index == 0 {
            self.clear_buffers();
        }
        self.buffer(phase, angle, form_score);

        if phase == REP_PATTERN[self.sequence_index] {
            self.sequence_index += 1;
            if self.sequence_index == 1 {
                self.current_rep_start = Some(timestamp);
            }
            if self.sequence_index == REP_PATTERN.len() {
                return self.finalize(timestamp);
            }
        } else if self.sequence_index == 1 && phase == REP_PATTERN[0] {
            if let Some(start) = self.current_rep_start
                && timestamp - start > self.cfg.max_top_hold_s
            {
                tracing::trace!(held_s = timestamp - start, at = timestamp, "resting at top; window moves up");
                self.clear_buffers();
                self.buffer(phase, angle, form_score);
                self.current_rep_start = Some(timestamp);
            }
        } else if self.sequence_index > 1 && phase == REP_PATTERN[0] {
            tracing::trace!(stage = self.sequence_index, at = timestamp, "false start; reopening");
            self.clear_buffers();
            self.buffer(phase, angle, form_score);
            self.sequence_index = 1;
            self.current_rep_start = Some(timestamp);
        }
        false
    }

    fn stalled(&self, now: f64) -> bool {
        match (self.cfg.stall_timeout_s, self.current_rep_start) {
            (Some(limit), Some(start)) => self.sequence_index > 0 && now - start > limit,
            _ => false,
        }
    }

    fn buffer(&mut self, phase: MovementPhase, angle: f64, form_score: Option<f64>) {
        self.phases.push(phase);
        self.angles.push(angle);
        if let Some(s) = form_score {
            self.scores.push(s);
        }
    }

    fn finalize(&mut self, end: f64) -> bool {
        let Some(start) = self.current_rep_start else {
            self.reset_current();
            return false;
        };
        let form_scores = std::mem::take(&mut self.scores);
        let mut record = RepetitionRecord {
            rep_number: self.valid_reps + 1,
            start_time: start,
            end_time: end,
            duration: end - start,
            phase_sequence: std::mem::take(&mut self.phases),
            angle_sequence: std::mem::take(&mut self.angles),
            average_form_score: mean(&form_scores).unwrap_or(DEFAULT_FORM_SCORE),
            form_scores,
            is_valid: false,
        };
        self.total_reps = self.total_reps.saturating_add(1);
        self.reset_current();

        match record.check(&self.cfg) {
            Ok(()) => {
                record.is_valid = true;
                self.valid_reps += 1;
                tracing::info!(
                    rep = record.rep_number,
                    duration = record.duration,
                    form = record.average_form_score,
                    "rep completed"
                );
                self.history.push(record);
                true
            }
            Err(failure) => {
                tracing::debug!(%failure, duration = record.duration, "cycle rejected");
                self.last_rejected = Some((record, failure));
                false
            }
        }
    }

    fn clear_buffers(&mut self) {
        self.phases.clear();
        self.angles.clear();
        self.scores.clear();
    }

    fn reset_current(&mut self) {
        self.sequence_index = 0;
        self.current_rep_start = None;
        self.clear_buffers();
    }

    /// Every finalized cycle, valid or not.
    pub fn total_reps(&self) -> u32 {
        self.total_reps
    }

    pub fn valid_reps(&self) -> u32 {
        self.valid_reps
    }

    pub fn rejected_reps(&self) -> u32 {
        self.total_reps - self.valid_reps
    }

    /// Mean form score across valid reps; 0 with no history.
    pub fn average_form_score(&self) -> f64 {
        let scores: Vec<f64> = self.history.iter().map(|r| r.average_form_score).collect();
        mean(&scores).unwrap_or(0.0)
    }

    pub fn history(&self) -> &[RepetitionRecord] {
        &self.history
    }

    pub fn last_rep(&self) -> Option<&RepetitionRecord> {
        self.history.last()
    }

    /// Most recent cycle that failed a gate, with the failing gate.
    pub fn last_rejected(&self) -> Option<&(RepetitionRecord, GateFailure)> {
        self.last_rejected.as_ref()
    }

    /// Samples buffered for the cycle in progress.
    pub fn buffered_len(&self) -> usize {
        self.phases.len()
    }

    pub fn consistency_score(&self) -> f64 {
        let (durations, scores): (Vec<f64>, Vec<f64>) = self
            .history
            .iter()
            .map(|r| (r.duration, r.average_form_score))
            .unzip();
        consistency_score(&durations, &scores)
    }

    pub fn performance_stats(&self) -> PerformanceStats {
        let durations: Vec<f64> = self.history.iter().map(|r| r.duration).collect();
        let (fastest, slowest) = min_max(durations.iter().copied()).unwrap_or((0.0, 0.0));
        PerformanceStats {
            total_reps: self.total_reps,
            valid_reps: self.valid_reps,
            average_duration: mean(&durations).unwrap_or(0.0),
            average_form_score: self.average_form_score(),
            consistency_score: self.consistency_score(),
            fastest_rep: fastest,
            slowest_rep: slowest,
        }
    }

    pub fn progress(&self) -> RepProgress {
        let stages = REP_PATTERN.len() - 1;
        let stage = self.sequence_index.saturating_sub(1);
        let rep_in_progress = self.sequence_index > 0;
        RepProgress {
            stage,
            stages,
            percent: stage as f64 / stages as f64 * 100.0,
            expected_phase: rep_in_progress.then(|| REP_PATTERN[self.sequence_index]),
            rep_in_progress,
        }
    }

    /// Forget everything, including history and totals.
    pub fn reset(&mut self) {
        self.reset_current();
        self.total_reps = 0;
        self.valid_reps = 0;
        self.history.clear();
        self.last_rejected = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use MovementPhase::*;

    fn drive(c: &mut RepCounter, steps: &[(MovementPhase, f64)]) -> Vec<bool> {
        steps
            .iter()
            .map(|&(p, t)| c.update(p, 120.0, None, t))
            .collect()
    }

    #[test]
    fn exact_cycle_is_a_valid_rep() {
        let mut c = RepCounter::default();
        let done = drive(
            &mut c,
            &[(Top, 0.0), (Descending, 0.8), (Bottom, 1.5), (Ascending, 2.2), (Top, 3.0)],
        );
        assert_eq!(done, vec![false, false, false, false, true]);
        assert_eq!(c.valid_reps(), 1);
        let rep = c.last_rep().unwrap();
        assert_eq!(rep.phase_sequence, REP_PATTERN.to_vec());
        assert!((rep.duration - 3.0).abs() < 1e-12);
        assert_eq!(rep.average_form_score, DEFAULT_FORM_SCORE);
        assert!(rep.is_valid);
        assert_eq!(c.buffered_len(), 0);
    }

    #[test]
    fn too_fast_cycle_counts_in_total_only() {
        let mut c = RepCounter::default();
        let done = drive(
            &mut c,
            &[(Top, 0.0), (Descending, 0.1), (Bottom, 0.2), (Ascending, 0.3), (Top, 0.5)],
        );
        assert!(done.iter().all(|d| !d));
        assert_eq!(c.total_reps(), 1);
        assert_eq!(c.valid_reps(), 0);
        assert_eq!(c.rejected_reps(), 1);
        assert!(c.history().is_empty());
        assert!(matches!(c.last_rejected(), Some((_, GateFailure::Duration(_)))));
        assert_eq!(c.buffered_len(), 0);
    }

    #[test]
    fn low_form_score_fails_gate() {
        let mut c = RepCounter::default();
        for (p, t) in [(Top, 0.0), (Descending, 1.0), (Bottom, 2.0), (Ascending, 3.0)] {
            c.update(p, 120.0, Some(40.0), t);
        }
        assert!(!c.update(Top, 170.0, Some(50.0), 4.0));
        assert!(matches!(c.last_rejected(), Some((_, GateFailure::FormScore(_)))));
    }

    #[test]
    fn held_opening_top_keeps_window() {
        let mut c = RepCounter::default();
        drive(&mut c, &[(Top, 0.0), (Top, 0.3), (Top, 0.6)]);
        let p = c.progress();
        assert!(p.rep_in_progress);
        assert_eq!(p.stage, 0);
        assert_eq!(p.expected_phase, Some(Descending));
        assert!(drive(&mut c, &[(Descending, 1.0), (Bottom, 1.5), (Ascending, 1.9), (Top, 2.1)])[3]);
        assert!((c.last_rep().unwrap().start_time - 0.0).abs() < 1e-12);
    }

    #[test]
    fn long_rest_at_top_moves_window_start() {
        let mut c = RepCounter::new(CounterCfg {
            max_top_hold_s: 1.0,
            ..CounterCfg::default()
        });
        drive(&mut c, &[(Top, 0.0), (Top, 0.5), (Top, 1.5), (Top, 2.0)]);
        assert_eq!(c.buffered_len(), 2);
        drive(&mut c, &[(Descending, 2.5), (Bottom, 3.0), (Ascending, 3.5), (Top, 4.0)]);
        let rep = c.last_rep().unwrap();
        assert_eq!(rep.start_time, 1.5);
        assert!((rep.duration - 2.5).abs() < 1e-12);
    }

    #[test]
    fn top_after_progress_is_a_false_start() {
        let mut c = RepCounter::default();
        drive(&mut c, &[(Top, 0.0), (Descending, 0.5), (Top, 1.0)]);
        assert_eq!(c.progress().stage, 0);
        assert_eq!(c.buffered_len(), 1);
        drive(&mut c, &[(Descending, 2.0), (Bottom, 2.5), (Ascending, 3.0), (Top, 4.0)]);
        let rep = c.last_rep().unwrap();
        assert_eq!(rep.start_time, 1.0);
        assert!((rep.duration - 3.0).abs() < 1e-12);
    }

    #[test]
    fn stall_timeout_abandons_cycle() {
        let mut c = RepCounter::new(CounterCfg {
            stall_timeout_s: Some(5.0),
            ..CounterCfg::default()
        });
        drive(&mut c, &[(Top, 0.0), (Descending, 1.0), (Bottom, 2.0)]);
        // Bottom held past the timeout: cycle dropped, nothing counted.
        c.update(Bottom, 90.0, None, 6.0);
        assert!(!c.progress().rep_in_progress);
        drive(&mut c, &[(Ascending, 7.0), (Top, 8.0)]);
        assert_eq!(c.total_reps(), 0);
    }

    #[test]
    fn no_stall_timeout_waits_forever() {
        let mut c = RepCounter::default();
        drive(&mut c, &[(Top, 0.0), (Descending, 1.0), (Bottom, 2.0), (Bottom, 500.0)]);
        assert_eq!(c.progress().stage, 2);
    }

    #[test]
    fn stats_over_history() {
        let mut c = RepCounter::default();
        let mut t = 0.0;
        for d in [2.0, 4.0] {
            for (i, p) in REP_PATTERN.iter().enumerate() {
                c.update(*p, 120.0, Some(80.0), t + d * i as f64 / 4.0);
            }
            t += d + 1.0;
        }
        let s = c.performance_stats();
        assert_eq!(s.valid_reps, 2);
        assert_eq!(s.fastest_rep, 2.0);
        assert_eq!(s.slowest_rep, 4.0);
        assert!((s.average_duration - 3.0).abs() < 1e-12);
        assert!((s.average_form_score - 80.0).abs() < 1e-12);
        // stdev([2,4]) = sqrt(2)
        assert!((s.consistency_score - (100.0 - 2f64.sqrt() * 10.0)).abs() < 1e-9);
    }

    #[test]
    fn consistency_is_perfect_below_two_reps() {
        assert_eq!(consistency_score(&[], &[]), 100.0);
        assert_eq!(consistency_score(&[3.0], &[10.0]), 100.0);
        assert_eq!(consistency_score(&[1.0, 20.0], &[0.0, 100.0]), 0.0);
    }

    #[test]
    fn average_is_zero_without_history() {
        let c = RepCounter::default();
        assert_eq!(c.average_form_score(), 0.0);
        assert_eq!(c.progress().expected_phase, None);
        assert_eq!(c.performance_stats().consistency_score, 100.0);
    }

    #[test]
    fn reset_clears_everything() {
        let mut c = RepCounter::default();
        drive(&mut c, &[(Top, 0.0), (Descending, 1.0), (Bottom, 2.0), (Ascending, 3.0), (Top, 4.0)]);
        c.update(Top, 170.0, None, 4.5);
        c.reset();
        assert_eq!(c.total_reps(), 0);
        assert!(c.history().is_empty());
        assert!(!c.progress().rep_in_progress);
    }
}
