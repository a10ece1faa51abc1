//! The five profile presets and capability-based selection.

use super::{PerformanceProfile, ProfileRank};

/// Capability floors for cold-start selection, highest rank first.
const SELECTION_THRESHOLDS: [(f64, ProfileRank); 4] = [
    (0.8, ProfileRank::UltraHigh),
    (0.6, ProfileRank::High),
    (0.4, ProfileRank::Balanced),
    (0.2, ProfileRank::PowerSaver),
];

/// Ordered list of profile presets, highest rank first.
///
/// Within the catalog the throttle interval strictly increases as rank
/// decreases.
#[derive(Debug, Clone)]
pub struct ProfileCatalog {
    profiles: [PerformanceProfile; 5],
}

impl ProfileCatalog {
    /// The standard preset ladder.
    #[rustfmt::skip]
    pub fn standard() -> Self {
        Self {
            profiles: [
                preset(ProfileRank::UltraHigh, 120.0, 8.0, 50.0, 5.0, 100.0, 10, 12.0, 6.0, 16.0, true, true, false),
                preset(ProfileRank::High, 60.0, 16.0, 100.0, 8.0, 150.0, 6, 10.0, 5.0, 33.0, true, true, true),
                preset(ProfileRank::Balanced, 60.0, 24.0, 150.0, 10.0, 200.0, 4, 8.0, 4.0, 50.0, true, true, true),
                preset(ProfileRank::PowerSaver, 30.0, 33.0, 200.0, 12.0, 300.0, 2, 6.0, 3.0, 75.0, false, true, true),
                preset(ProfileRank::UltraPowerSaver, 30.0, 50.0, 300.0, 15.0, 500.0, 1, 4.0, 2.0, 100.0, false, false, true),
            ],
        }
    }

    /// Map a capability score to the cold-start rank.
    pub fn rank_for_capability(capability: f64) -> ProfileRank {
        SELECTION_THRESHOLDS
            .iter()
            .find(|(floor, _)| capability >= *floor)
            .map(|(_, rank)| *rank)
            .unwrap_or(ProfileRank::UltraPowerSaver)
    }

    /// Cold-start profile for a capability score.
    pub fn select(&self, capability: f64) -> &PerformanceProfile {
        self.profile(Self::rank_for_capability(capability))
    }

    /// The preset for a rank.
    pub fn profile(&self, rank: ProfileRank) -> &PerformanceProfile {
        let index = ProfileRank::ALL
            .iter()
            .position(|r| *r == rank)
            .unwrap_or(ProfileRank::ALL.len() - 1);
        &self.profiles[index]
    }

    /// Iterate presets, highest rank first.
    pub fn iter(&self) -> impl Iterator<Item = &PerformanceProfile> {
        self.profiles.iter()
    }
}

impl Default for ProfileCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[allow(clippy::too_many_arguments)]
fn preset(
    rank: ProfileRank,
    target_fps: f64,
    throttle_interval_ms: f64,
    debounce_delay_ms: f64,
    touch_distance_threshold_px: f64,
    touch_hold_delay_ms: f64,
    max_concurrent_animations: u32,
    animation_budget_ms: f64,
    event_budget_ms: f64,
    max_latency_ms: f64,
    hardware_acceleration: bool,
    monitoring_enabled: bool,
    throttling_enabled: bool,
) -> PerformanceProfile {
    PerformanceProfile {
        name: rank.as_str().to_string(),
        rank,
        target_fps,
        throttle_interval_ms,
        debounce_delay_ms,
        touch_distance_threshold_px,
        touch_hold_delay_ms,
        max_concurrent_animations,
        animation_budget_ms,
        event_budget_ms,
        max_latency_ms,
        hardware_acceleration,
        monitoring_enabled,
        throttling_enabled,
        debouncing_enabled: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_is_monotonic_in_capability() {
        let catalog = ProfileCatalog::standard();
        let ranks: Vec<ProfileRank> = [0.9, 0.7, 0.5, 0.3, 0.1]
            .iter()
            .map(|c| catalog.select(*c).rank)
            .collect();
        assert_eq!(
            ranks,
            vec![
                ProfileRank::UltraHigh,
                ProfileRank::High,
                ProfileRank::Balanced,
                ProfileRank::PowerSaver,
                ProfileRank::UltraPowerSaver,
            ]
        );
    }

    #[test]
    fn test_selection_threshold_edges() {
        assert_eq!(ProfileCatalog::rank_for_capability(0.8), ProfileRank::UltraHigh);
        assert_eq!(ProfileCatalog::rank_for_capability(0.79), ProfileRank::High);
        assert_eq!(ProfileCatalog::rank_for_capability(0.2), ProfileRank::PowerSaver);
        assert_eq!(
            ProfileCatalog::rank_for_capability(0.0),
            ProfileRank::UltraPowerSaver
        );
    }

    #[test]
    fn test_throttle_interval_increases_as_rank_decreases() {
        let catalog = ProfileCatalog::standard();
        let profiles: Vec<&PerformanceProfile> = catalog.iter().collect();
        for pair in profiles.windows(2) {
            assert!(pair[0].rank > pair[1].rank);
            assert!(
                pair[0].throttle_interval_ms < pair[1].throttle_interval_ms,
                "{} should throttle less than {}",
                pair[0].name,
                pair[1].name
            );
        }
    }

    #[test]
    fn test_profile_lookup_by_rank() {
        let catalog = ProfileCatalog::standard();
        for rank in ProfileRank::ALL {
            assert_eq!(catalog.profile(rank).rank, rank);
            assert_eq!(catalog.profile(rank).name, rank.as_str());
        }
    }

    #[test]
    fn test_weakest_preset() {
        let catalog = ProfileCatalog::standard();
        let profile = catalog.select(0.15);
        assert_eq!(profile.rank, ProfileRank::UltraPowerSaver);
        assert_eq!(profile.throttle_interval_ms, 50.0);
        assert_eq!(profile.max_concurrent_animations, 1);
    }
}
