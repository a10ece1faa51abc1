//! Render hints derived from the active profile.
//!
//! The core never touches rendering. It hands the UI a small set of
//! style-like key/value pairs and the UI decides how to apply them.

use serde::{Deserialize, Serialize};

use super::{PerformanceProfile, ProfileRank};

/// Scale factor applied on the two lowest ranks without hardware acceleration.
const REDUCED_SCALE_FACTOR: f64 = 0.75;

/// Style hints for the rendering collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RenderHints {
    pub use_hardware_acceleration: bool,
    pub scale_factor: f64,
    pub reduce_motion: bool,
    pub max_concurrent_animations: u32,
    pub transition_duration_ms: f64,
}

impl RenderHints {
    /// Derive hints from a profile's feature flags.
    pub fn from_profile(profile: &PerformanceProfile) -> Self {
        let low_rank = profile.rank <= ProfileRank::PowerSaver;
        let scale_factor = if !profile.hardware_acceleration && low_rank {
            REDUCED_SCALE_FACTOR
        } else {
            1.0
        };

        Self {
            use_hardware_acceleration: profile.hardware_acceleration,
            scale_factor,
            reduce_motion: profile.max_concurrent_animations <= 1,
            max_concurrent_animations: profile.max_concurrent_animations,
            transition_duration_ms: profile.throttle_interval_ms * 10.0,
        }
    }

    /// Flatten into `(key, value)` pairs.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            (
                "use-hardware-acceleration",
                self.use_hardware_acceleration.to_string(),
            ),
            ("scale-factor", format!("{}", self.scale_factor)),
            ("reduce-motion", self.reduce_motion.to_string()),
            (
                "max-concurrent-animations",
                self.max_concurrent_animations.to_string(),
            ),
            (
                "transition-duration-ms",
                format!("{:.0}", self.transition_duration_ms),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::ProfileCatalog;

    #[test]
    fn test_high_rank_hints() {
        let catalog = ProfileCatalog::standard();
        let hints = RenderHints::from_profile(catalog.profile(ProfileRank::UltraHigh));
        assert!(hints.use_hardware_acceleration);
        assert_eq!(hints.scale_factor, 1.0);
        assert!(!hints.reduce_motion);
        assert_eq!(hints.transition_duration_ms, 80.0);
    }

    #[test]
    fn test_lowest_rank_hints() {
        let catalog = ProfileCatalog::standard();
        let hints = RenderHints::from_profile(catalog.profile(ProfileRank::UltraPowerSaver));
        assert!(!hints.use_hardware_acceleration);
        assert_eq!(hints.scale_factor, 0.75);
        assert!(hints.reduce_motion);
    }

    #[test]
    fn test_pairs() {
        let catalog = ProfileCatalog::standard();
        let pairs = RenderHints::from_profile(catalog.profile(ProfileRank::Balanced)).to_pairs();
        assert!(pairs.contains(&("use-hardware-acceleration", "true".to_string())));
        assert!(pairs.contains(&("scale-factor", "1".to_string())));
        assert!(pairs.contains(&("transition-duration-ms", "240".to_string())));
    }

    #[test]
    fn test_serialized_keys_are_kebab_case() {
        let catalog = ProfileCatalog::standard();
        let hints = RenderHints::from_profile(catalog.profile(ProfileRank::High));
        let json = serde_json::to_value(&hints).unwrap();
        assert!(json.get("use-hardware-acceleration").is_some());
        assert!(json.get("scale-factor").is_some());
    }
}
