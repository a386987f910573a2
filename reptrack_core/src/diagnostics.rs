//! Rep-attempt diagnostics.
//!
//! Observes the phase stream alongside the counter and explains the reps that
//! did *not* count. Every genuine phase change becomes a [`StateTransition`];
//! changes are grouped into [`RepAttempt`]s that close either as a success
//! (the counter reported a rep) or as a failure with a [`FailureReason`].
//! [`AttemptDiagnostics::session_summary`] aggregates them into tuning hints.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{CounterCfg, DiagnosticsCfg, PhaseCfg};
use crate::phase::MovementPhase;
use crate::ring::Ring;
use crate::util::{mean, min_max};

/// Most frequent failure reasons reported in a summary.
pub const TOP_FAILURES: usize = 5;

/// Phases a complete rep must show, used for quality scoring.
const EXPECTED: [MovementPhase; 4] = [
    MovementPhase::Descending,
    MovementPhase::Bottom,
    MovementPhase::Ascending,
    MovementPhase::Top,
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub timestamp: f64,
    pub from_state: MovementPhase,
    pub to_state: MovementPhase,
    pub elbow_angle: f64,
    pub confidence: f64,
    pub keypoint_count: u32,
    pub duration_in_state: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    IncompleteSequence,
    NeverReachedBottom,
    StuckAtBottom,
    NeverAscended,
    TooSlow,
    InsufficientStateVariety,
    PatternMismatch,
}

impl FailureReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IncompleteSequence => "incomplete_sequence",
            Self::NeverReachedBottom => "never_reached_bottom",
            Self::StuckAtBottom => "stuck_at_bottom",
            Self::NeverAscended => "never_ascended",
            Self::TooSlow => "too_slow",
            Self::InsufficientStateVariety => "insufficient_state_variety",
            Self::PatternMismatch => "pattern_mismatch",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explain a failed attempt from its phase sequence. First match wins.
pub fn classify_failure(
    phases: &[MovementPhase],
    duration: f64,
    too_slow_s: f64,
) -> FailureReason {
    let count = |p| phases.iter().filter(|&&x| x == p).count();
    if phases.len() < 4 {
        return FailureReason::IncompleteSequence;
    }
    if count(MovementPhase::Bottom) == 0 {
        return FailureReason::NeverReachedBottom;
    }
    if count(MovementPhase::Bottom) > 3 {
        return FailureReason::StuckAtBottom;
    }
    if count(MovementPhase::Ascending) == 0 {
        return FailureReason::NeverAscended;
    }
    if duration > too_slow_s {
        return FailureReason::TooSlow;
    }
    let mut distinct = phases.to_vec();
    distinct.sort_unstable();
    distinct.dedup();
    if distinct.len() < 3 {
        return FailureReason::InsufficientStateVariety;
    }
    FailureReason::PatternMismatch
}

/// Heuristic 0..=100 score for an attempt.
pub fn quality_score(phases: &[MovementPhase], angles: &[f64]) -> f64 {
    let mut score = 100.0;
    if phases.len() < 4 {
        score -= 50.0;
    }
    let present = EXPECTED.iter().filter(|p| phases.contains(p)).count();
    score += present as f64 / EXPECTED.len() as f64 * 30.0;
    if phases.len() > 20 {
        score -= ((phases.len() - 20) as f64 * 2.0).min(30.0);
    }
    if let Some((lo, hi)) = min_max(angles.iter().copied()) {
        let range = hi - lo;
        if range > 60.0 {
            score += 20.0;
        } else if range < 30.0 {
            score -= 20.0;
        }
    }
    f64::clamp(score, 0.0, 100.0)
}

/// One candidate repetition, from a starting phase to success or failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepAttempt {
    pub attempt_id: u32,
    pub start_time: f64,
    pub end_time: Option<f64>,
    pub duration: Option<f64>,
    pub state_sequence: Vec<MovementPhase>,
    pub angle_sequence: Vec<f64>,
    pub was_counted: bool,
    pub failure_reason: Option<FailureReason>,
    pub quality_score: f64,
}

impl RepAttempt {
    fn open(attempt_id: u32, phase: MovementPhase, angle: f64, at: f64) -> Self {
        Self {
            attempt_id,
            start_time: at,
            end_time: None,
            duration: None,
            state_sequence: vec![phase],
            angle_sequence: vec![angle],
            was_counted: false,
            failure_reason: None,
            quality_score: 0.0,
        }
    }

    fn push(&mut self, phase: MovementPhase, angle: f64) {
        self.state_sequence.push(phase);
        self.angle_sequence.push(angle);
    }

    fn close(&mut self, at: f64, counted: bool, too_slow_s: f64) {
        let duration = (at - self.start_time).max(0.0);
        self.end_time = Some(at);
        self.duration = Some(duration);
        self.was_counted = counted;
        if !counted {
            self.failure_reason = Some(classify_failure(&self.state_sequence, duration, too_slow_s));
        }
        self.quality_score = quality_score(&self.state_sequence, &self.angle_sequence);
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Still holding only its opening phase.
    fn idle(&self) -> bool {
        self.state_sequence.len() == 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleStatistics {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub range: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub start_time: f64,
    pub end_time: f64,
    pub total_transitions: usize,
    pub rep_attempts: usize,
    pub successful_reps: usize,
    pub success_rate: f64,
    pub common_failure_patterns: Vec<String>,
    pub angle_statistics: Option<AngleStatistics>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LiveStats {
    pub successful: usize,
    pub total: usize,
    pub success_rate: f64,
}

/// Current thresholds quoted back in recommendations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    pub bottom_threshold: f64,
    pub movement_threshold: f64,
    pub min_dwell_frames: u32,
    pub max_rep_duration_s: f64,
}

impl Tuning {
    pub fn from_cfgs(phase: &PhaseCfg, counter: &CounterCfg) -> Self {
        Self {
            bottom_threshold: phase.bottom_threshold,
            movement_threshold: phase.movement_threshold,
            min_dwell_frames: phase.min_dwell_frames,
            max_rep_duration_s: counter.max_rep_duration_s,
        }
    }
}

impl Default for Tuning {
    fn default() -> Self {
        Self::from_cfgs(&PhaseCfg::default(), &CounterCfg::default())
    }
}

#[derive(Debug, Clone)]
pub struct AttemptDiagnostics {
    session_id: String,
    cfg: DiagnosticsCfg,
    tuning: Tuning,
    started_at: Option<f64>,
    current: Option<MovementPhase>,
    last_change: f64,
    next_id: u32,
    transitions: Vec<StateTransition>,
    attempts: Vec<RepAttempt>,
    open: Option<RepAttempt>,
    states: Ring<MovementPhase>,
    angles: Ring<f64>,
}

impl AttemptDiagnostics {
    pub fn new(session_id: impl Into<String>, cfg: DiagnosticsCfg) -> Self {
        let states = Ring::with_capacity(cfg.state_buffer);
        let angles = Ring::with_capacity(cfg.angle_buffer);
        Self {
            session_id: session_id.into(),
            cfg,
            tuning: Tuning::default(),
            started_at: None,
            current: None,
            last_change: 0.0,
            next_id: 1,
            transitions: Vec::new(),
            attempts: Vec::new(),
            open: None,
            states,
            angles,
        }
    }

    pub fn with_tuning(mut self, tuning: Tuning) -> Self {
        self.tuning = tuning;
        self
    }

    /// Observe one frame's phase. Returns `true` when a transition was recorded.
    pub fn log_transition(
        &mut self,
        phase: MovementPhase,
        angle: f64,
        confidence: f64,
        keypoint_count: u32,
        was_counted: bool,
        timestamp: f64,
    ) -> bool {
        self.started_at.get_or_insert(timestamp);
        self.states.push(phase);
        self.angles.push(angle);

        let mut changed = false;
        match self.current {
            None => {
                self.current = Some(phase);
                self.last_change = timestamp;
                self.maybe_open(phase, angle, timestamp);
            }
            Some(prev) if prev != phase => {
                self.transitions.push(StateTransition {
                    timestamp,
                    from_state: prev,
                    to_state: phase,
                    elbow_angle: angle,
                    confidence,
                    keypoint_count,
                    duration_in_state: timestamp - self.last_change,
                });
                self.current = Some(phase);
                self.last_change = timestamp;
                changed = true;
                match self.open.as_mut() {
                    Some(attempt) => attempt.push(phase, angle),
                    None => self.maybe_open(phase, angle, timestamp),
                }
            }
            Some(_) => {
                // Idle at the opening phase: the attempt clock starts on the first move.
                if let Some(attempt) = self.open.as_mut()
                    && attempt.idle()
                {
                    attempt.start_time = timestamp;
                }
            }
        }

        if was_counted && self.open.is_some() {
            self.close(timestamp, true);
            self.maybe_open(phase, angle, timestamp);
        } else if self.should_fail(timestamp) {
            self.close(timestamp, false);
            self.maybe_open(phase, angle, timestamp);
        }
        changed
    }

    fn maybe_open(&mut self, phase: MovementPhase, angle: f64, at: f64) {
        if self.open.is_none() && matches!(phase, MovementPhase::Ready | MovementPhase::Top) {
            self.open = Some(RepAttempt::open(self.next_id, phase, angle, at));
            self.next_id += 1;
        }
    }

    fn should_fail(&self, now: f64) -> bool {
        self.open.as_ref().is_some_and(|a| {
            now - a.start_time > self.cfg.attempt_timeout_s
                || a.state_sequence.len() > self.cfg.max_attempt_phases
        })
    }

    fn close(&mut self, at: f64, counted: bool) {
        let Some(mut attempt) = self.open.take() else {
            return;
        };
        attempt.close(at, counted, self.cfg.too_slow_s);
        match attempt.failure_reason {
            Some(reason) => tracing::debug!(
                attempt = attempt.attempt_id,
                %reason,
                phases = attempt.state_sequence.len(),
                "rep attempt failed"
            ),
            None => tracing::trace!(
                attempt = attempt.attempt_id,
                quality = attempt.quality_score,
                "rep attempt counted"
            ),
        }
        self.attempts.push(attempt);
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn transitions(&self) -> &[StateTransition] {
        &self.transitions
    }

    /// Closed attempts, oldest first.
    pub fn attempts(&self) -> &[RepAttempt] {
        &self.attempts
    }

    pub fn current_attempt(&self) -> Option<&RepAttempt> {
        self.open.as_ref()
    }

    /// Phases seen over the most recent frames, oldest first.
    pub fn recent_states(&self) -> Vec<MovementPhase> {
        self.states.iter().copied().collect()
    }

    pub fn live_stats(&self) -> LiveStats {
        let successful = self.attempts.iter().filter(|a| a.was_counted).count();
        let total = self.attempts.len();
        LiveStats {
            successful,
            total,
            success_rate: rate(successful, total),
        }
    }

    /// Failure reasons by count descending, ties alphabetical.
    pub fn failure_histogram(&self) -> Vec<(FailureReason, usize)> {
        let mut counts: BTreeMap<&'static str, (FailureReason, usize)> = BTreeMap::new();
        for reason in self.attempts.iter().filter_map(|a| a.failure_reason) {
            counts.entry(reason.as_str()).or_insert((reason, 0)).1 += 1;
        }
        let mut hist: Vec<_> = counts.into_values().collect();
        // stable sort keeps the alphabetical order of the map for ties
        hist.sort_by(|a, b| b.1.cmp(&a.1));
        hist
    }

    pub fn angle_statistics(&self) -> Option<AngleStatistics> {
        let angles: Vec<f64> = self.angles.iter().copied().collect();
        let (min, max) = min_max(angles.iter().copied())?;
        Some(AngleStatistics {
            min,
            max,
            mean: mean(&angles)?,
            range: max - min,
        })
    }

    pub fn session_summary(&self, now: f64) -> SessionSummary {
        let live = self.live_stats();
        let hist = self.failure_histogram();
        let angle_statistics = self.angle_statistics();
        let recommendations = self.recommendations(&hist, angle_statistics.as_ref(), live.success_rate);
        SessionSummary {
            session_id: self.session_id.clone(),
            start_time: self.started_at.unwrap_or(now),
            end_time: now,
            total_transitions: self.transitions.len(),
            rep_attempts: live.total,
            successful_reps: live.successful,
            success_rate: live.success_rate,
            common_failure_patterns: hist
                .iter()
                .take(TOP_FAILURES)
                .map(|(reason, n)| format!("{reason}: {n}"))
                .collect(),
            angle_statistics,
            recommendations,
        }
    }

    fn recommendations(
        &self,
        hist: &[(FailureReason, usize)],
        angles: Option<&AngleStatistics>,
        success_rate: f64,
    ) -> Vec<String> {
        let t = &self.tuning;
        let mut out = Vec::new();
        if success_rate < 50.0 {
            out.push("SUCCESS_RATE_LOW: Consider relaxing thresholds".to_string());
        }
        match hist.first().map(|(reason, _)| *reason) {
            Some(FailureReason::NeverReachedBottom) => out.push(format!(
                "BOTTOM_THRESHOLD: Increase bottom_threshold (currently {}°)",
                t.bottom_threshold
            )),
            Some(FailureReason::StuckAtBottom) => out.push(format!(
                "MOVEMENT_SENSITIVITY: Decrease movement_threshold (currently {}°) for better transition detection",
                t.movement_threshold
            )),
            Some(FailureReason::NeverAscended) => out.push(format!(
                "STATE_SMOOTHING: Increase min_dwell_frames (currently {}) for more stable detection",
                t.min_dwell_frames
            )),
            Some(FailureReason::TooSlow) => out.push(format!(
                "TIMING: Increase max_rep_duration_s (currently {}s) or improve movement detection",
                t.max_rep_duration_s
            )),
            _ => {}
        }
        if angles.is_none_or(|a| a.range < 60.0) {
            out.push(
                "ANGLE_RANGE: Low range of motion detected - check pose detection quality".to_string(),
            );
        }
        if self.transitions.len() > 100 && success_rate > 80.0 {
            out.push("PERFORMANCE_GOOD: Current settings working well".to_string());
        }
        out
    }
}

fn rate(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}
