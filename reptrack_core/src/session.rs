//! Session driver: owns one phase machine, counter and diagnostics engine and
//! feeds every admitted frame through them in that order.

use serde::Serialize;

use reptrack_traits::{AngleSample, Frame};

use crate::config::{CounterCfg, DiagnosticsCfg, GateCfg, PhaseCfg};
use crate::counter::{PerformanceStats, RepCounter, RepetitionRecord};
use crate::diagnostics::{AttemptDiagnostics, RepAttempt, SessionSummary, StateTransition, Tuning};
use crate::error::{BuildError, Result, SampleFault};
use crate::state_machine::PhaseMachine;
use crate::status::FrameStatus;

/// Session ids name the exported documents, so they must be plain file-name
/// fragments.
pub fn validate_session_id(id: &str) -> std::result::Result<(), BuildError> {
    if id.trim().is_empty() {
        return Err(BuildError::MissingSessionId);
    }
    if id.contains(['/', '\\', '\0']) || id == "." || id == ".." {
        return Err(BuildError::UnsafeSessionId(id.to_string()));
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct SessionBuilder {
    session_id: Option<String>,
    phase: PhaseCfg,
    counter: CounterCfg,
    diagnostics: DiagnosticsCfg,
    gate: GateCfg,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_id(mut self, id: impl Into<String>) -> Self {
        self.session_id = Some(id.into());
        self
    }

    pub fn phase(mut self, cfg: PhaseCfg) -> Self {
        self.phase = cfg;
        self
    }

    pub fn counter(mut self, cfg: CounterCfg) -> Self {
        self.counter = cfg;
        self
    }

    pub fn diagnostics(mut self, cfg: DiagnosticsCfg) -> Self {
        self.diagnostics = cfg;
        self
    }

    pub fn gate(mut self, cfg: GateCfg) -> Self {
        self.gate = cfg;
        self
    }

    pub fn build(self) -> Result<Session> {
        let id = self
            .session_id
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSessionId))?;
        validate_session_id(&id).map_err(eyre::Report::new)?;
        self.phase.validate().map_err(eyre::Report::new)?;
        self.counter.validate().map_err(eyre::Report::new)?;
        self.diagnostics.validate().map_err(eyre::Report::new)?;
        self.gate.validate().map_err(eyre::Report::new)?;

        let tuning = Tuning::from_cfgs(&self.phase, &self.counter);
        Ok(Session {
            machine: PhaseMachine::new(self.phase),
            counter: RepCounter::new(self.counter),
            diagnostics: AttemptDiagnostics::new(id, self.diagnostics).with_tuning(tuning),
            gate: self.gate,
            last_ts: None,
            frames: 0,
            invalid_frames: 0,
        })
    }
}

/// End-of-session flush: everything worth persisting.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub summary: SessionSummary,
    pub transitions: Vec<StateTransition>,
    pub attempts: Vec<RepAttempt>,
    pub repetitions: Vec<RepetitionRecord>,
    pub stats: PerformanceStats,
}

#[derive(Debug)]
pub struct Session {
    machine: PhaseMachine,
    counter: RepCounter,
    diagnostics: AttemptDiagnostics,
    gate: GateCfg,
    last_ts: Option<f64>,
    frames: u64,
    invalid_frames: u64,
}

impl Session {
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    pub fn id(&self) -> &str {
        self.diagnostics.session_id()
    }

    /// Check a sample against the admission gate.
    pub fn admit(&self, s: &AngleSample) -> std::result::Result<(), SampleFault> {
        if !s.has_detection() {
            return Err(SampleFault::NoDetection(s.angle));
        }
        if !(0.0..=1.0).contains(&s.confidence) {
            return Err(SampleFault::BadConfidence(s.confidence));
        }
        if s.confidence < self.gate.min_confidence {
            return Err(SampleFault::LowConfidence {
                got: s.confidence,
                min: self.gate.min_confidence,
            });
        }
        if s.visible_keypoints < self.gate.min_visible_keypoints {
            return Err(SampleFault::TooFewKeypoints {
                got: s.visible_keypoints,
                min: self.gate.min_visible_keypoints,
            });
        }
        if !s.timestamp.is_finite() {
            return Err(SampleFault::BadTimestamp(s.timestamp));
        }
        if let Some(last) = self.last_ts
            && s.timestamp < last
        {
            return Err(SampleFault::OutOfOrder {
                got: s.timestamp,
                last,
            });
        }
        Ok(())
    }

    /// Feed one frame through machine, counter and diagnostics.
    pub fn process(&mut self, frame: &Frame) -> FrameStatus {
        let s = frame.sample;
        self.frames += 1;

        if let Err(fault) = self.admit(&s) {
            self.invalid_frames += 1;
            tracing::debug!(%fault, t = s.timestamp, "frame treated as no detection");
            return self.status(false, false);
        }
        self.last_ts = Some(s.timestamp);

        let phase = self.machine.update(&s);
        let rep = self
            .counter
            .update(phase, s.angle, frame.form_score, s.timestamp);
        self.diagnostics.log_transition(
            phase,
            s.angle,
            s.confidence,
            s.visible_keypoints,
            rep,
            s.timestamp,
        );
        self.status(rep, true)
    }

    fn status(&self, rep_completed: bool, accepted: bool) -> FrameStatus {
        FrameStatus {
            phase: self.machine.current_phase(),
            rep_completed,
            total_reps: self.counter.total_reps(),
            valid_reps: self.counter.valid_reps(),
            accepted,
        }
    }

    pub fn machine(&self) -> &PhaseMachine {
        &self.machine
    }

    pub fn counter(&self) -> &RepCounter {
        &self.counter
    }

    pub fn diagnostics(&self) -> &AttemptDiagnostics {
        &self.diagnostics
    }

    /// Frames seen so far, including gated ones.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn invalid_frames(&self) -> u64 {
        self.invalid_frames
    }

    /// Summary as of the latest admitted sample; start/end are sample times.
    pub fn summary(&self) -> SessionSummary {
        self.diagnostics
            .session_summary(self.last_ts.unwrap_or(0.0))
    }

    pub fn finish(self) -> SessionReport {
        let summary = self.summary();
        let stats = self.counter.performance_stats();
        tracing::info!(
            session = %summary.session_id,
            frames = self.frames,
            invalid = self.invalid_frames,
            total_reps = stats.total_reps,
            valid_reps = stats.valid_reps,
            success_rate = summary.success_rate,
            "session finished"
        );
        SessionReport {
            summary,
            transitions: self.diagnostics.transitions().to_vec(),
            attempts: self.diagnostics.attempts().to_vec(),
            repetitions: self.counter.history().to_vec(),
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::MovementPhase;

    fn frame(angle: f64, t: f64) -> Frame {
        Frame::from(AngleSample::new(angle, 0.9, 33, t))
    }

    #[test]
    fn builder_requires_session_id() {
        let err = Session::builder().build().unwrap_err();
        assert_eq!(
            err.downcast_ref::<BuildError>(),
            Some(&BuildError::MissingSessionId)
        );
        assert!(Session::builder().session_id("  ").build().is_err());
    }

    #[test]
    fn builder_rejects_path_like_ids() {
        for id in ["../x", "a/b", "a\\b", ".."] {
            let err = Session::builder().session_id(id).build().unwrap_err();
            assert_eq!(
                err.downcast_ref::<BuildError>(),
                Some(&BuildError::UnsafeSessionId(id.to_string()))
            );
        }
        assert!(Session::builder().session_id("morning.1").build().is_ok());
    }

    #[test]
    fn builder_rejects_bad_thresholds() {
        let err = Session::builder()
            .session_id("s")
            .phase(PhaseCfg {
                top_threshold: 90.0,
                bottom_threshold: 100.0,
                ..PhaseCfg::default()
            })
            .build()
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::InvalidConfig(_))
        ));
    }

    #[test]
    fn gated_frames_change_nothing() {
        let mut s = Session::builder()
            .session_id("s")
            .gate(GateCfg {
                min_confidence: 0.5,
                min_visible_keypoints: 10,
            })
            .build()
            .unwrap();
        assert!(s.process(&frame(175.0, 1.0)).accepted);
        let before = s.diagnostics().transitions().len();

        for f in [
            frame(0.0, 1.1),
            frame(f64::NAN, 1.2),
            Frame::from(AngleSample::new(120.0, 0.2, 33, 1.3)),
            Frame::from(AngleSample::new(120.0, f64::NAN, 33, 1.3)),
            Frame::from(AngleSample::new(120.0, 0.9, 3, 1.4)),
            frame(120.0, 0.5),
        ] {
            let st = s.process(&f);
            assert!(!st.accepted);
            assert_eq!(st.phase, MovementPhase::Top);
        }
        assert_eq!(s.invalid_frames(), 6);
        assert_eq!(s.frames(), 7);
        assert_eq!(s.diagnostics().transitions().len(), before);
        assert_eq!(s.machine().frames_in_phase(), 1);
    }

    #[test]
    fn summary_uses_sample_times() {
        let mut s = Session::builder().session_id("s").build().unwrap();
        s.process(&frame(175.0, 10.0));
        s.process(&frame(174.0, 12.5));
        let sum = s.summary();
        assert_eq!(sum.start_time, 10.0);
        assert_eq!(sum.end_time, 12.5);
        assert_eq!(sum.session_id, "s");
    }
}
