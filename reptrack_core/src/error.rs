use thiserror::Error;

use crate::phase::MovementPhase;

#[derive(Debug, Error, Clone)]
pub enum ReptrackError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("angle source error: {0}")]
    Source(String),
    #[error("invalid state: {0}")]
    State(String),
    #[error("io error: {0}")]
    Io(String),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BuildError {
    #[error("missing session id")]
    MissingSessionId,
    #[error("session id {0:?} is not usable as a file name")]
    UnsafeSessionId(String),
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

/// Why a frame was treated as "no detection". Never surfaced as a failure.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum SampleFault {
    #[error("no detection (angle {0})")]
    NoDetection(f64),
    #[error("confidence {0} outside [0, 1]")]
    BadConfidence(f64),
    #[error("confidence {got} below gate {min}")]
    LowConfidence { got: f64, min: f64 },
    #[error("{got} visible keypoints below gate {min}")]
    TooFewKeypoints { got: u32, min: u32 },
    #[error("timestamp {0} is not finite")]
    BadTimestamp(f64),
    #[error("timestamp {got} earlier than previous {last}")]
    OutOfOrder { got: f64, last: f64 },
}

/// Why the state machine kept its current phase. Logged at trace level only.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TransitionRejection {
    #[error("dwell pending ({frames}/{required} frames in current phase)")]
    DwellPending { frames: u32, required: u32 },
    #[error("transition {from:?} -> {to:?} not adjacent")]
    NotAdjacent {
        from: MovementPhase,
        to: MovementPhase,
    },
}

/// Which validity gate a finalized cycle failed.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum GateFailure {
    #[error("cycle did not visit every phase")]
    IncompleteCycle,
    #[error("duration {0:.2}s outside allowed range")]
    Duration(f64),
    #[error("average form score {0:.1} below minimum")]
    FormScore(f64),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
