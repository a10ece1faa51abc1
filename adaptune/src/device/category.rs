//! Coarse device categories.
//!
//! Categories pick the recommended parameter ranges the validator sweeps.
//! A device lands in the highest category whose memory, core and capability
//! floors it meets.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::DeviceInfo;

/// Five predefined device categories, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceCategory {
    UltraHighEnd,
    HighEnd,
    MidRange,
    LowEnd,
    Legacy,
}

impl DeviceCategory {
    /// All categories, highest first.
    pub const ALL: [DeviceCategory; 5] = [
        DeviceCategory::UltraHighEnd,
        DeviceCategory::HighEnd,
        DeviceCategory::MidRange,
        DeviceCategory::LowEnd,
        DeviceCategory::Legacy,
    ];

    /// Classify a device by memory, cores and capability.
    pub fn classify(device: &DeviceInfo) -> Self {
        Self::from_features(
            device.memory_or_default(),
            device.cores_or_default(),
            device.capability,
        )
    }

    /// Classify raw feature values (used for cluster centroids).
    pub fn from_features(memory_gb: f64, cores: f64, capability: f64) -> Self {
        Self::ALL
            .into_iter()
            .find(|category| {
                let (memory_floor, cores_floor, capability_floor) = category.floors();
                memory_gb >= memory_floor && cores >= cores_floor && capability >= capability_floor
            })
            .unwrap_or(DeviceCategory::Legacy)
    }

    /// Minimum (memory GB, cores, capability) for this category.
    fn floors(&self) -> (f64, f64, f64) {
        match self {
            DeviceCategory::UltraHighEnd => (8.0, 8.0, 0.85),
            DeviceCategory::HighEnd => (6.0, 6.0, 0.7),
            DeviceCategory::MidRange => (4.0, 4.0, 0.5),
            DeviceCategory::LowEnd => (2.0, 2.0, 0.3),
            DeviceCategory::Legacy => (0.0, 0.0, 0.0),
        }
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            DeviceCategory::UltraHighEnd => "Ultra High-End",
            DeviceCategory::HighEnd => "High-End",
            DeviceCategory::MidRange => "Mid-Range",
            DeviceCategory::LowEnd => "Low-End",
            DeviceCategory::Legacy => "Legacy",
        }
    }
}

impl fmt::Display for DeviceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceHints, NetworkClass};

    #[test]
    fn test_classify_flagship() {
        let device = DeviceHints::new("ios")
            .with_memory_gb(8.0)
            .with_cores(8)
            .with_network(NetworkClass::Fast)
            .with_battery(1.0)
            .into_device_info();
        assert_eq!(device.category(), DeviceCategory::UltraHighEnd);
    }

    #[test]
    fn test_capability_floor_demotes() {
        // Plenty of hardware but a low capability score.
        let device = DeviceHints::new("android")
            .with_memory_gb(8.0)
            .with_cores(8)
            .into_device_info()
            .with_capability(0.6);
        assert_eq!(device.category(), DeviceCategory::MidRange);
    }

    #[test]
    fn test_from_features_thresholds() {
        assert_eq!(
            DeviceCategory::from_features(6.0, 6.0, 0.7),
            DeviceCategory::HighEnd
        );
        assert_eq!(
            DeviceCategory::from_features(2.0, 2.0, 0.3),
            DeviceCategory::LowEnd
        );
        assert_eq!(
            DeviceCategory::from_features(1.0, 8.0, 0.9),
            DeviceCategory::Legacy
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", DeviceCategory::MidRange), "Mid-Range");
    }
}
