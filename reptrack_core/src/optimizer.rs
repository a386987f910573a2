//! Offline threshold tuning from exported session documents.
//!
//! Reads back the transitions and attempts a session recorded and proposes
//! thresholds that fit how the user actually moved: band cutoffs from the
//! quartiles of the angles at which phases were entered, a rep-duration window
//! around the successful attempts, and a longer dwell when the phase stream
//! jitters. [`OptimizationReport::apply`] folds the proposals into a config.

use std::collections::BTreeMap;

use reptrack_config::Config;
use serde::Serialize;

use crate::diagnostics::{RepAttempt, StateTransition};
use crate::phase::MovementPhase;
use crate::util::{median, min_max, quartiles};

/// Allowed range for a recommended top threshold (deg).
pub const TOP_BOUNDS: (f64, f64) = (140.0, 165.0);
/// Allowed range for a recommended bottom threshold (deg).
pub const BOTTOM_BOUNDS: (f64, f64) = (75.0, 100.0);
/// Shortest and longest rep window that will ever be recommended (s).
pub const DURATION_BOUNDS: (f64, f64) = (1.0, 15.0);
/// Margin applied below the fastest and above the slowest successful attempt.
const DURATION_MARGIN: (f64, f64) = (0.8, 1.2);
/// A phase left sooner than this (s) counts as a rapid change.
pub const RAPID_CHANGE_S: f64 = 0.1;
/// Share of rapid changes (%) above which the dwell is raised.
pub const JITTER_LIMIT_PCT: f64 = 20.0;
/// Dwell recommended for a jittery stream, unless the current one is already higher.
pub const SMOOTHED_DWELL_FRAMES: u32 = 5;
/// Transition pairs listed in the frequency table.
pub const COMMON_TRANSITIONS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ThresholdAdvice {
    pub current: f64,
    pub recommended: f64,
    pub median: f64,
    /// Angles the advice is based on.
    pub samples: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DurationAdvice {
    pub current: (f64, f64),
    pub recommended: (f64, f64),
    /// Fastest and slowest successful attempt.
    pub observed: (f64, f64),
    pub median: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SmoothingAdvice {
    pub rapid_changes: usize,
    pub jitter_percent: f64,
    pub current_dwell_frames: u32,
    /// `Some` when the stream is jittery enough to warrant a longer dwell.
    pub recommended_dwell_frames: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransitionCount {
    pub from: MovementPhase,
    pub to: MovementPhase,
    pub count: usize,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationReport {
    pub transitions: usize,
    pub attempts: usize,
    pub top_threshold: Option<ThresholdAdvice>,
    pub bottom_threshold: Option<ThresholdAdvice>,
    pub rep_duration: Option<DurationAdvice>,
    pub smoothing: SmoothingAdvice,
    pub common_transitions: Vec<TransitionCount>,
}

/// Angles (exclusive of 0 and 180) at which any of `phases` was entered.
fn entry_angles(transitions: &[StateTransition], phases: &[MovementPhase]) -> Vec<f64> {
    transitions
        .iter()
        .filter(|t| phases.contains(&t.to_state))
        .map(|t| t.elbow_angle)
        .filter(|a| *a > 0.0 && *a < 180.0)
        .collect()
}

/// Top cutoff at the 25th percentile of Top/Ready entry angles, so three in
/// four observed extensions clear it.
pub fn advise_top(transitions: &[StateTransition], current: f64) -> Option<ThresholdAdvice> {
    let angles = entry_angles(transitions, &[MovementPhase::Top, MovementPhase::Ready]);
    let [q1, _, _] = quartiles(&angles)?;
    Some(ThresholdAdvice {
        current,
        recommended: q1.clamp(TOP_BOUNDS.0, TOP_BOUNDS.1),
        median: median(&angles)?,
        samples: angles.len(),
    })
}

/// Bottom cutoff at the 75th percentile of Bottom entry angles.
pub fn advise_bottom(transitions: &[StateTransition], current: f64) -> Option<ThresholdAdvice> {
    let angles = entry_angles(transitions, &[MovementPhase::Bottom]);
    let [_, _, q3] = quartiles(&angles)?;
    Some(ThresholdAdvice {
        current,
        recommended: q3.clamp(BOTTOM_BOUNDS.0, BOTTOM_BOUNDS.1),
        median: median(&angles)?,
        samples: angles.len(),
    })
}

/// Rep window spanning the successful attempts with a margin on both sides.
pub fn advise_duration(attempts: &[RepAttempt], current: (f64, f64)) -> Option<DurationAdvice> {
    let durations: Vec<f64> = attempts
        .iter()
        .filter(|a| a.was_counted)
        .filter_map(|a| a.duration)
        .filter(|d| *d > 0.0)
        .collect();
    let (fastest, slowest) = min_max(durations.iter().copied())?;
    Some(DurationAdvice {
        current,
        recommended: (
            (fastest * DURATION_MARGIN.0).max(DURATION_BOUNDS.0),
            (slowest * DURATION_MARGIN.1).min(DURATION_BOUNDS.1),
        ),
        observed: (fastest, slowest),
        median: median(&durations)?,
        samples: durations.len(),
    })
}

/// Share of transitions that left their previous phase almost immediately.
/// The first transition has no meaningful previous phase and is not judged.
pub fn advise_smoothing(transitions: &[StateTransition], current_dwell: u32) -> SmoothingAdvice {
    let rapid = transitions
        .iter()
        .skip(1)
        .filter(|t| t.duration_in_state < RAPID_CHANGE_S)
        .count();
    let jitter_percent = if transitions.is_empty() {
        0.0
    } else {
        rapid as f64 / transitions.len() as f64 * 100.0
    };
    SmoothingAdvice {
        rapid_changes: rapid,
        jitter_percent,
        current_dwell_frames: current_dwell,
        recommended_dwell_frames: (jitter_percent > JITTER_LIMIT_PCT)
            .then(|| SMOOTHED_DWELL_FRAMES.max(current_dwell.saturating_add(2))),
    }
}

/// Transition pairs by frequency, most common first (ties in phase order).
pub fn transition_frequencies(transitions: &[StateTransition]) -> Vec<TransitionCount> {
    let mut counts: BTreeMap<(MovementPhase, MovementPhase), usize> = BTreeMap::new();
    for t in transitions {
        *counts.entry((t.from_state, t.to_state)).or_default() += 1;
    }
    let total = transitions.len().max(1) as f64;
    let mut out: Vec<TransitionCount> = counts
        .into_iter()
        .map(|((from, to), count)| TransitionCount {
            from,
            to,
            count,
            percent: count as f64 / total * 100.0,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count));
    out.truncate(COMMON_TRANSITIONS);
    out
}

impl OptimizationReport {
    pub fn analyze(transitions: &[StateTransition], attempts: &[RepAttempt], base: &Config) -> Self {
        let report = Self {
            transitions: transitions.len(),
            attempts: attempts.len(),
            top_threshold: advise_top(transitions, base.phase.top_threshold),
            bottom_threshold: advise_bottom(transitions, base.phase.bottom_threshold),
            rep_duration: advise_duration(
                attempts,
                (base.counter.min_rep_duration_s, base.counter.max_rep_duration_s),
            ),
            smoothing: advise_smoothing(transitions, base.phase.min_dwell_frames),
            common_transitions: transition_frequencies(transitions),
        };
        tracing::info!(
            transitions = report.transitions,
            attempts = report.attempts,
            top = ?report.top_threshold.map(|a| a.recommended),
            bottom = ?report.bottom_threshold.map(|a| a.recommended),
            jitter_pct = report.smoothing.jitter_percent,
            "session analyzed"
        );
        report
    }

    /// `base` with every available recommendation applied. Sections without
    /// data keep their current values.
    pub fn apply(&self, base: &Config) -> Config {
        let mut cfg = base.clone();
        if let Some(a) = self.top_threshold {
            cfg.phase.top_threshold = a.recommended;
        }
        if let Some(a) = self.bottom_threshold {
            cfg.phase.bottom_threshold = a.recommended;
        }
        if let Some(d) = self.rep_duration {
            (cfg.counter.min_rep_duration_s, cfg.counter.max_rep_duration_s) = d.recommended;
        }
        if let Some(frames) = self.smoothing.recommended_dwell_frames {
            cfg.phase.min_dwell_frames = frames;
        }
        cfg
    }

    /// One line per recommendation, for display.
    pub fn reasons(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Some(a) = self.top_threshold {
            out.push(format!(
                "top_threshold: {:.1}° -> {:.1}° (captures 75% of Top entries, median {:.1}°)",
                a.current, a.recommended, a.median
            ));
        }
        if let Some(a) = self.bottom_threshold {
            out.push(format!(
                "bottom_threshold: {:.1}° -> {:.1}° (captures 75% of Bottom entries, median {:.1}°)",
                a.current, a.recommended, a.median
            ));
        }
        if let Some(d) = self.rep_duration {
            out.push(format!(
                "rep duration: {:.1}-{:.1} s -> {:.1}-{:.1} s (based on {} successful reps)",
                d.current.0, d.current.1, d.recommended.0, d.recommended.1, d.samples
            ));
        }
        if let Some(frames) = self.smoothing.recommended_dwell_frames {
            out.push(format!(
                "min_dwell_frames: {} -> {frames} ({:.1}% rapid phase changes)",
                self.smoothing.current_dwell_frames, self.smoothing.jitter_percent
            ));
        }
        out
    }
}
