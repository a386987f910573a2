//! Configuration types for the tracking engine.
//!
//! These are the runtime configuration structs used by the session driver.
//! They are separate from the TOML-deserialized config in `reptrack_config`.

use crate::error::BuildError;

/// Phase state machine thresholds.
#[derive(Debug, Clone)]
pub struct PhaseCfg {
    /// Angle (deg) at or above which the candidate is Top.
    pub top_threshold: f64,
    /// Angle (deg) at or below which the candidate is Bottom.
    pub bottom_threshold: f64,
    /// Widening applied to a band while already in the phase it favors.
    pub hysteresis: f64,
    /// Frame-to-frame angle change (deg) that counts as a clear trend.
    pub movement_threshold: f64,
    /// Updates the current phase must persist before it may be left.
    pub min_dwell_frames: u32,
}

impl Default for PhaseCfg {
    fn default() -> Self {
        Self {
            top_threshold: 150.0,
            bottom_threshold: 100.0,
            hysteresis: 5.0,
            movement_threshold: 3.0,
            min_dwell_frames: 1,
        }
    }
}

impl PhaseCfg {
    pub fn validate(&self) -> Result<(), BuildError> {
        if !(self.top_threshold.is_finite() && self.bottom_threshold.is_finite()) {
            return Err(BuildError::InvalidConfig("phase thresholds must be finite"));
        }
        if self.bottom_threshold >= self.top_threshold {
            return Err(BuildError::InvalidConfig(
                "bottom_threshold must be below top_threshold",
            ));
        }
        if !(self.hysteresis >= 0.0 && self.movement_threshold >= 0.0) {
            return Err(BuildError::InvalidConfig(
                "hysteresis and movement_threshold must be >= 0",
            ));
        }
        if self.min_dwell_frames == 0 {
            return Err(BuildError::InvalidConfig("min_dwell_frames must be >= 1"));
        }
        Ok(())
    }
}

/// Repetition validity gates.
#[derive(Debug, Clone)]
pub struct CounterCfg {
    pub min_rep_duration_s: f64,
    pub max_rep_duration_s: f64,
    pub min_form_score: f64,
    /// Abandon a half-finished cycle after this long. `None` waits indefinitely.
    pub stall_timeout_s: Option<f64>,
    /// While the window holds only its opening Top, a rest longer than this
    /// moves the window start up to the current frame.
    pub max_top_hold_s: f64,
}

impl Default for CounterCfg {
    fn default() -> Self {
        Self {
            min_rep_duration_s: 2.0,
            max_rep_duration_s: 10.0,
            min_form_score: 60.0,
            stall_timeout_s: None,
            max_top_hold_s: 2.0,
        }
    }
}

impl CounterCfg {
    pub fn validate(&self) -> Result<(), BuildError> {
        if !(self.min_rep_duration_s >= 0.0 && self.max_rep_duration_s > self.min_rep_duration_s)
        {
            return Err(BuildError::InvalidConfig(
                "rep duration range must satisfy 0 <= min < max",
            ));
        }
        if !(0.0..=100.0).contains(&self.min_form_score) {
            return Err(BuildError::InvalidConfig("min_form_score must be in [0, 100]"));
        }
        if let Some(t) = self.stall_timeout_s
            && !(t > 0.0)
        {
            return Err(BuildError::InvalidConfig("stall_timeout_s must be > 0"));
        }
        if !(self.max_top_hold_s.is_finite() && self.max_top_hold_s > 0.0) {
            return Err(BuildError::InvalidConfig("max_top_hold_s must be > 0"));
        }
        Ok(())
    }
}

/// Attempt diagnostics limits.
#[derive(Debug, Clone)]
pub struct DiagnosticsCfg {
    pub attempt_timeout_s: f64,
    pub max_attempt_phases: usize,
    pub too_slow_s: f64,
    pub angle_buffer: usize,
    pub state_buffer: usize,
}

impl Default for DiagnosticsCfg {
    fn default() -> Self {
        Self {
            attempt_timeout_s: 15.0,
            max_attempt_phases: 50,
            too_slow_s: 12.0,
            angle_buffer: 50,
            state_buffer: 20,
        }
    }
}

impl DiagnosticsCfg {
    pub fn validate(&self) -> Result<(), BuildError> {
        if !(self.attempt_timeout_s > 0.0 && self.too_slow_s > 0.0) {
            return Err(BuildError::InvalidConfig(
                "attempt_timeout_s and too_slow_s must be > 0",
            ));
        }
        if self.max_attempt_phases == 0 || self.angle_buffer == 0 || self.state_buffer == 0 {
            return Err(BuildError::InvalidConfig(
                "diagnostics capacities must be >= 1",
            ));
        }
        Ok(())
    }
}

/// Per-frame admission gate.
#[derive(Debug, Clone, Default)]
pub struct GateCfg {
    pub min_confidence: f64,
    pub min_visible_keypoints: u32,
}

impl GateCfg {
    pub fn validate(&self) -> Result<(), BuildError> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(BuildError::InvalidConfig("min_confidence must be in [0, 1]"));
        }
        Ok(())
    }
}
