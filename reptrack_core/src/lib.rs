#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core rep-tracking logic (pose-agnostic).
//!
//! This crate turns a stream of joint-angle samples into movement phases,
//! counted repetitions and per-attempt diagnostics. Samples arrive through
//! `reptrack_traits::AngleSource`; nothing here knows about cameras or
//! keypoint models.
//!
//! ## Architecture
//!
//! - **Phases**: `MovementPhase` and its adjacency table (`phase` module)
//! - **State machine**: hysteresis bands, trend detection and dwell (`state_machine`)
//! - **Counter**: cycle matching and validity gates (`counter`)
//! - **Diagnostics**: attempts, failure reasons and tuning hints (`diagnostics`)
//! - **Session**: sample gating and the machine → counter → diagnostics flow (`session`)
//! - **Runner**: replay loop over an `AngleSource` with optional pacing (`runner`)
//! - **Optimizer**: threshold proposals from exported session documents (`optimizer`)
//!
//! Everything is synchronous and single-threaded. Times are sample timestamps
//! in seconds, never wall clock.

pub mod config;
pub mod conversions;
pub mod counter;
pub mod diagnostics;
pub mod error;
pub mod mocks;
pub mod optimizer;
pub mod phase;
pub mod ring;
pub mod runner;
pub mod session;
pub mod state_machine;
pub mod status;
pub mod util;

pub use config::{CounterCfg, DiagnosticsCfg, GateCfg, PhaseCfg};
pub use counter::{PerformanceStats, RepCounter, RepProgress, RepetitionRecord};
pub use diagnostics::{
    AngleStatistics, AttemptDiagnostics, FailureReason, LiveStats, RepAttempt, SessionSummary,
    StateTransition,
};
pub use error::{BuildError, GateFailure, ReptrackError, SampleFault, TransitionRejection};
pub use optimizer::OptimizationReport;
pub use phase::{MovementPhase, Trend};
pub use runner::{RunParams, RunStats, run};
pub use session::{Session, SessionBuilder, SessionReport};
pub use state_machine::PhaseMachine;
pub use status::FrameStatus;

pub use reptrack_traits::{AngleSample, AngleSource, Clock, Frame, MonotonicClock};
