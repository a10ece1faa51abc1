//! Performance profiles.
//!
//! A [`PerformanceProfile`] bundles the timing and concurrency parameters
//! that trade UI responsiveness against battery and CPU. Profiles are ordered
//! by [`ProfileRank`]; the [`ProfileCatalog`] holds the five presets.
//!
//! # Rank Ladder
//!
//! ```text
//! ultra-high > high > balanced > power-saver > ultra-power-saver
//!    8ms       16ms     24ms         33ms            50ms      (throttle interval)
//! ```

mod catalog;
mod hints;

pub use catalog::ProfileCatalog;
pub use hints::RenderHints;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordinal rank of a profile.
///
/// Variants are declared lowest first so the derived `Ord` matches the
/// ladder: `UltraHigh > High > Balanced > PowerSaver > UltraPowerSaver`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProfileRank {
    UltraPowerSaver,
    PowerSaver,
    Balanced,
    High,
    UltraHigh,
}

impl ProfileRank {
    /// All ranks, highest first.
    pub const ALL: [ProfileRank; 5] = [
        ProfileRank::UltraHigh,
        ProfileRank::High,
        ProfileRank::Balanced,
        ProfileRank::PowerSaver,
        ProfileRank::UltraPowerSaver,
    ];

    /// Step up one rank. No-op at the top.
    pub fn upgrade(&self) -> Self {
        match self {
            ProfileRank::UltraPowerSaver => ProfileRank::PowerSaver,
            ProfileRank::PowerSaver => ProfileRank::Balanced,
            ProfileRank::Balanced => ProfileRank::High,
            ProfileRank::High => ProfileRank::UltraHigh,
            ProfileRank::UltraHigh => ProfileRank::UltraHigh,
        }
    }

    /// Step down one rank. No-op at the bottom.
    pub fn downgrade(&self) -> Self {
        match self {
            ProfileRank::UltraHigh => ProfileRank::High,
            ProfileRank::High => ProfileRank::Balanced,
            ProfileRank::Balanced => ProfileRank::PowerSaver,
            ProfileRank::PowerSaver => ProfileRank::UltraPowerSaver,
            ProfileRank::UltraPowerSaver => ProfileRank::UltraPowerSaver,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileRank::UltraHigh => "ultra-high",
            ProfileRank::High => "high",
            ProfileRank::Balanced => "balanced",
            ProfileRank::PowerSaver => "power-saver",
            ProfileRank::UltraPowerSaver => "ultra-power-saver",
        }
    }
}

impl fmt::Display for ProfileRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named bundle of tunable parameters and feature flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceProfile {
    /// Display name (preset name, or a derived name for tuned profiles).
    pub name: String,

    /// Rank this profile was derived from.
    pub rank: ProfileRank,

    /// Frame rate the UI should sustain.
    pub target_fps: f64,

    /// Minimum interval between throttled updates (ms).
    pub throttle_interval_ms: f64,

    /// Quiet period before debounced actions fire (ms).
    pub debounce_delay_ms: f64,

    /// Pointer travel before a touch becomes a drag (px).
    pub touch_distance_threshold_px: f64,

    /// Press duration before a touch becomes a hold (ms).
    pub touch_hold_delay_ms: f64,

    /// Upper bound on simultaneously running animations.
    pub max_concurrent_animations: u32,

    /// Per-frame allowance for animation work (ms).
    pub animation_budget_ms: f64,

    /// Per-frame allowance for input event handling (ms).
    pub event_budget_ms: f64,

    /// Input latency considered fully degraded for this profile (ms).
    pub max_latency_ms: f64,

    pub hardware_acceleration: bool,
    pub monitoring_enabled: bool,
    pub throttling_enabled: bool,
    pub debouncing_enabled: bool,
}

impl PerformanceProfile {
    /// Return a copy renamed for a derived (tuned or adjusted) profile.
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

impl fmt::Display for PerformanceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (throttle {:.0}ms, debounce {:.0}ms, {} animations)",
            self.name,
            self.throttle_interval_ms,
            self.debounce_delay_ms,
            self.max_concurrent_animations
        )
    }
}
