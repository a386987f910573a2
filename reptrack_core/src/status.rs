//! Per-frame status returned by the session driver.

use serde::Serialize;

use crate::phase::MovementPhase;

/// Outcome of feeding one frame through the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameStatus {
    /// Phase after this frame (unchanged when the frame was gated out).
    pub phase: MovementPhase,
    /// A gate-passing rep finished on this frame.
    pub rep_completed: bool,
    pub total_reps: u32,
    pub valid_reps: u32,
    /// False when the frame was treated as "no detection".
    pub accepted: bool,
}
