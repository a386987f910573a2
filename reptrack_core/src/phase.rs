//! Movement phases and the anatomical adjacency table.

use serde::{Deserialize, Serialize};

/// One of the five discrete positions/directions inferred from a joint angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementPhase {
    /// Starting position, joint extended but no cycle in progress.
    Ready,
    Descending,
    Bottom,
    Ascending,
    Top,
}

/// Allowed `(from, to)` pairs. Anything else is anatomically implausible in one step.
const ADJACENT: [(MovementPhase, MovementPhase); 10] = {
    use MovementPhase::*;
    [
        (Ready, Descending),
        (Ready, Top),
        (Top, Descending),
        (Top, Ready),
        (Descending, Bottom),
        (Descending, Ascending),
        (Bottom, Ascending),
        (Bottom, Descending),
        (Ascending, Top),
        (Ascending, Descending),
    ]
};

impl MovementPhase {
    pub const ALL: [MovementPhase; 5] = [
        MovementPhase::Ready,
        MovementPhase::Descending,
        MovementPhase::Bottom,
        MovementPhase::Ascending,
        MovementPhase::Top,
    ];

    /// Whether `self -> to` is present in the adjacency table.
    #[inline]
    pub fn can_transition_to(self, to: MovementPhase) -> bool {
        ADJACENT.iter().any(|&(f, t)| f == self && t == to)
    }

    /// Phases reachable from `self` in one accepted transition.
    pub fn successors(self) -> impl Iterator<Item = MovementPhase> {
        ADJACENT
            .iter()
            .filter(move |(f, _)| *f == self)
            .map(|&(_, t)| t)
    }

    /// Joint is moving (Descending / Ascending).
    #[inline]
    pub fn is_movement(self) -> bool {
        matches!(self, MovementPhase::Descending | MovementPhase::Ascending)
    }

    /// Joint is holding a position (Top / Bottom / Ready).
    #[inline]
    pub fn is_position(self) -> bool {
        !self.is_movement()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MovementPhase::Ready => "READY",
            MovementPhase::Descending => "DESCENDING",
            MovementPhase::Bottom => "BOTTOM",
            MovementPhase::Ascending => "ASCENDING",
            MovementPhase::Top => "TOP",
        }
    }
}

impl std::fmt::Display for MovementPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Short-term direction of the angle signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}
