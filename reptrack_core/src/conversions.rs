//! `From` implementations bridging `reptrack_config` types to `reptrack_core` types.

use crate::config::{CounterCfg, DiagnosticsCfg, GateCfg, PhaseCfg};

// ── PhaseCfg ─────────────────────────────────────────────────────────────────

impl From<&reptrack_config::PhaseCfg> for PhaseCfg {
    fn from(c: &reptrack_config::PhaseCfg) -> Self {
        Self {
            top_threshold: c.top_threshold,
            bottom_threshold: c.bottom_threshold,
            hysteresis: c.hysteresis,
            movement_threshold: c.movement_threshold,
            min_dwell_frames: c.min_dwell_frames,
        }
    }
}

// ── CounterCfg ───────────────────────────────────────────────────────────────

impl From<&reptrack_config::CounterCfg> for CounterCfg {
    fn from(c: &reptrack_config::CounterCfg) -> Self {
        Self {
            min_rep_duration_s: c.min_rep_duration_s,
            max_rep_duration_s: c.max_rep_duration_s,
            min_form_score: c.min_form_score,
            stall_timeout_s: c.stall_timeout_s,
            max_top_hold_s: c.max_top_hold_s,
        }
    }
}

// ── DiagnosticsCfg ───────────────────────────────────────────────────────────

impl From<&reptrack_config::DiagnosticsCfg> for DiagnosticsCfg {
    fn from(c: &reptrack_config::DiagnosticsCfg) -> Self {
        Self {
            attempt_timeout_s: c.attempt_timeout_s,
            max_attempt_phases: c.max_attempt_phases,
            too_slow_s: c.too_slow_s,
            angle_buffer: c.angle_buffer,
            state_buffer: c.state_buffer,
        }
    }
}

// ── GateCfg ──────────────────────────────────────────────────────────────────

impl From<&reptrack_config::GateCfg> for GateCfg {
    fn from(c: &reptrack_config::GateCfg) -> Self {
        Self {
            min_confidence: c.min_confidence,
            min_visible_keypoints: c.min_visible_keypoints,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_core_defaults() {
        let file = reptrack_config::Config::default();
        let phase = PhaseCfg::from(&file.phase);
        let core = PhaseCfg::default();
        assert_eq!(phase.top_threshold, core.top_threshold);
        assert_eq!(phase.min_dwell_frames, core.min_dwell_frames);
        let counter = CounterCfg::from(&file.counter);
        assert_eq!(counter.max_rep_duration_s, CounterCfg::default().max_rep_duration_s);
        let diag = DiagnosticsCfg::from(&file.diagnostics);
        assert_eq!(diag.max_attempt_phases, DiagnosticsCfg::default().max_attempt_phases);
    }
}
