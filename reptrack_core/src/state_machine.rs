//! Phase state machine: angle samples in, debounced movement phase out.
//!
//! Candidate phases come from hysteresis-adjusted angle bands, or from the
//! short-term trend when the angle sits between the bands. A candidate only
//! becomes the current phase once the dwell requirement is met and the pair is
//! in the adjacency table; everything else is dropped silently.

use reptrack_traits::AngleSample;

use crate::config::PhaseCfg;
use crate::error::TransitionRejection;
use crate::phase::{MovementPhase, Trend};
use crate::ring::Ring;

/// Angle samples kept for trend detection.
pub const ANGLE_HISTORY: usize = 5;
/// Accepted transitions kept for diagnostics/replay.
pub const TRANSITION_LOG: usize = 10;

/// One accepted phase entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseEntry {
    pub phase: MovementPhase,
    pub at: f64,
}

#[derive(Debug, Clone)]
pub struct PhaseMachine {
    cfg: PhaseCfg,
    current: MovementPhase,
    entered_at: f64,
    frames_in_phase: u32,
    // True until the first detected sample; only that sample skips the dwell gate.
    initial: bool,
    angles: Ring<f64>,
    transitions: Ring<PhaseEntry>,
    rejected: u64,
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new(PhaseCfg::default())
    }
}

impl PhaseMachine {
    pub fn new(cfg: PhaseCfg) -> Self {
        Self {
            cfg,
            current: MovementPhase::Ready,
            entered_at: 0.0,
            frames_in_phase: 0,
            initial: true,
            angles: Ring::with_capacity(ANGLE_HISTORY),
            transitions: Ring::with_capacity(TRANSITION_LOG),
            rejected: 0,
        }
    }

    pub fn cfg(&self) -> &PhaseCfg {
        &self.cfg
    }

    /// Feed one sample and return the (possibly unchanged) current phase.
    ///
    /// A sample without detection (`angle == 0` or non-finite) is a no-op.
    pub fn update(&mut self, sample: &AngleSample) -> MovementPhase {
        if !sample.has_detection() {
            tracing::trace!(angle = sample.angle, "no detection; phase unchanged");
            return self.current;
        }

        self.angles.push(sample.angle);
        let candidate = self.candidate_phase(sample.angle);

        if candidate != self.current {
            match self.admit(candidate) {
                Ok(()) => self.enter(candidate, sample.timestamp),
                Err(reason) => {
                    self.rejected = self.rejected.saturating_add(1);
                    tracing::trace!(%reason, candidate = %candidate, "transition rejected");
                }
            }
        }

        self.initial = false;
        self.frames_in_phase = self.frames_in_phase.saturating_add(1);
        self.current
    }

    /// Classify an angle against the bands, widening the band of the phase we are in.
    fn candidate_phase(&self, angle: f64) -> MovementPhase {
        let top = if matches!(self.current, MovementPhase::Top | MovementPhase::Ready) {
            self.cfg.top_threshold - self.cfg.hysteresis
        } else {
            self.cfg.top_threshold
        };
        let bottom = if self.current == MovementPhase::Bottom {
            self.cfg.bottom_threshold + self.cfg.hysteresis
        } else {
            self.cfg.bottom_threshold
        };

        if angle >= top {
            return MovementPhase::Top;
        }
        if angle <= bottom {
            return MovementPhase::Bottom;
        }
        match self.raw_trend() {
            Some(d) if d < -self.cfg.movement_threshold => MovementPhase::Descending,
            Some(d) if d > self.cfg.movement_threshold => MovementPhase::Ascending,
            Some(_) if self.current.is_movement() => self.current,
            _ => MovementPhase::Ready,
        }
    }

    fn admit(&self, candidate: MovementPhase) -> Result<(), TransitionRejection> {
        if !self.initial && self.frames_in_phase < self.cfg.min_dwell_frames {
            return Err(TransitionRejection::DwellPending {
                frames: self.frames_in_phase,
                required: self.cfg.min_dwell_frames,
            });
        }
        if !self.current.can_transition_to(candidate) {
            return Err(TransitionRejection::NotAdjacent {
                from: self.current,
                to: candidate,
            });
        }
        Ok(())
    }

    fn enter(&mut self, phase: MovementPhase, at: f64) {
        tracing::debug!(from = %self.current, to = %phase, at, "phase transition");
        self.current = phase;
        self.entered_at = at;
        self.frames_in_phase = 0;
        self.transitions.push(PhaseEntry { phase, at });
    }

    /// Difference between the two most recent angles, if two exist.
    fn raw_trend(&self) -> Option<f64> {
        let last = self.angles.nth_back(0)?;
        let prev = self.angles.nth_back(1)?;
        Some(last - prev)
    }

    pub fn current_phase(&self) -> MovementPhase {
        self.current
    }

    /// Updates spent in the current phase, including the one that entered it.
    pub fn frames_in_phase(&self) -> u32 {
        self.frames_in_phase
    }

    pub fn phase_entered_at(&self) -> f64 {
        self.entered_at
    }

    /// Seconds spent in the current phase as of `now`.
    pub fn phase_duration(&self, now: f64) -> f64 {
        (now - self.entered_at).max(0.0)
    }

    pub fn angle_trend(&self) -> Trend {
        match self.raw_trend() {
            Some(d) if d > self.cfg.movement_threshold => Trend::Increasing,
            Some(d) if d < -self.cfg.movement_threshold => Trend::Decreasing,
            _ => Trend::Stable,
        }
    }

    pub fn is_in_movement(&self) -> bool {
        self.current.is_movement()
    }

    pub fn is_in_position(&self) -> bool {
        self.current.is_position()
    }

    /// Up to `count` most recent accepted transitions, oldest first.
    pub fn transition_history(&self, count: usize) -> Vec<PhaseEntry> {
        self.transitions.tail(count)
    }

    /// Candidate transitions dropped by the dwell or adjacency gate.
    pub fn rejected_transitions(&self) -> u64 {
        self.rejected
    }

    /// Return to `Ready` and forget all history.
    pub fn reset(&mut self, at: f64) {
        self.current = MovementPhase::Ready;
        self.entered_at = at;
        self.frames_in_phase = 0;
        self.initial = true;
        self.angles.clear();
        self.transitions.clear();
        self.rejected = 0;
    }
}
