//! Controller status and transition types.

use std::fmt;

use crate::profile::{PerformanceProfile, ProfileRank};

/// A rank change made by the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileTransition {
    pub from: ProfileRank,
    pub to: ProfileRank,

    /// Performance score that triggered the change.
    pub score: f64,
}

impl ProfileTransition {
    pub fn is_promotion(&self) -> bool {
        self.to > self.from
    }
}

impl fmt::Display for ProfileTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} (score {:.2})", self.from, self.to, self.score)
    }
}

/// Result of one controller tick.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Profile emitted after this tick (unchanged when no samples were available).
    pub profile: PerformanceProfile,

    /// Rank change, if any.
    pub transition: Option<ProfileTransition>,

    /// Score computed this tick, `None` when the window was empty.
    pub score: Option<f64>,
}

/// Snapshot of the controller's state for the host.
#[derive(Debug, Clone)]
pub struct ControllerStatus {
    /// Current rank.
    pub rank: ProfileRank,

    /// Emitted profile (after interaction adjustment).
    pub profile: PerformanceProfile,

    /// Last computed performance score.
    pub last_score: Option<f64>,

    /// Samples currently in the rolling window.
    pub sample_count: usize,

    /// Interaction intensity at the last tick.
    pub interaction_level: f64,

    /// Rank changes since construction.
    pub transitions: u64,
}
