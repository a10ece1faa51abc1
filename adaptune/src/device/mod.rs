//! Device description and capability assessment.
//!
//! A [`DeviceInfo`] is an immutable snapshot of the host device taken once per
//! session. It is built from best-effort [`DeviceHints`]; any hint the platform
//! cannot provide simply stays `None` and the documented defaults apply.
//!
//! # Module Structure
//!
//! - [`capability`] - Pure capability scoring (`assess`)
//! - [`category`] - Coarse device categories used by the validator

mod capability;
mod category;

pub use capability::{
    assess, DEFAULT_BATTERY_LEVEL, DEFAULT_CORES, DEFAULT_MEMORY_GB, FULL_SCORE_CORES,
    FULL_SCORE_MEMORY_GB,
};
pub use category::DeviceCategory;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Network connection class reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NetworkClass {
    /// Broadband or 4G-class connection.
    Fast,
    /// 3G-class connection. Also used when the class is unknown.
    #[default]
    Medium,
    /// 2G-class connection.
    Slow,
    /// Barely usable connection.
    VerySlow,
}

impl NetworkClass {
    /// Capability weight for this class (0.0 - 1.0).
    pub fn weight(&self) -> f64 {
        match self {
            NetworkClass::Fast => 1.0,
            NetworkClass::Medium => 0.7,
            NetworkClass::Slow => 0.4,
            NetworkClass::VerySlow => 0.2,
        }
    }

    /// Short name used in logs and config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkClass::Fast => "fast",
            NetworkClass::Medium => "medium",
            NetworkClass::Slow => "slow",
            NetworkClass::VerySlow => "very-slow",
        }
    }
}

impl fmt::Display for NetworkClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NetworkClass {
    type Err = std::convert::Infallible;

    /// Accepts both class names and browser-style effective types
    /// (`4g`, `3g`, `2g`, `slow-2g`). Unknown values map to `Medium`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "fast" | "4g" | "5g" | "wifi" | "ethernet" => Self::Fast,
            "slow" | "2g" => Self::Slow,
            "very-slow" | "very_slow" | "slow-2g" => Self::VerySlow,
            _ => Self::Medium,
        })
    }
}

/// Raw, best-effort platform hints.
///
/// Asynchronous sources (such as a battery API) must be resolved by the host
/// before the hints are converted into a [`DeviceInfo`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceHints {
    pub platform: String,
    pub memory_gb: Option<f64>,
    pub logical_cores: Option<u32>,
    pub network: Option<NetworkClass>,
    pub battery_level: Option<f64>,
    pub screen_width: u32,
    pub screen_height: u32,
    pub pixel_ratio: f64,
    pub touch_support: bool,
}

impl DeviceHints {
    /// Start a set of hints for the given platform.
    pub fn new(platform: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            screen_width: 1280,
            screen_height: 720,
            pixel_ratio: 1.0,
            ..Default::default()
        }
    }

    pub fn with_memory_gb(mut self, memory_gb: f64) -> Self {
        self.memory_gb = Some(memory_gb);
        self
    }

    pub fn with_cores(mut self, cores: u32) -> Self {
        self.logical_cores = Some(cores);
        self
    }

    pub fn with_network(mut self, network: NetworkClass) -> Self {
        self.network = Some(network);
        self
    }

    pub fn with_battery(mut self, level: f64) -> Self {
        self.battery_level = Some(level);
        self
    }

    pub fn with_screen(mut self, width: u32, height: u32, pixel_ratio: f64) -> Self {
        self.screen_width = width;
        self.screen_height = height;
        self.pixel_ratio = pixel_ratio;
        self
    }

    pub fn with_touch(mut self, touch_support: bool) -> Self {
        self.touch_support = touch_support;
        self
    }

    /// Freeze the hints into a device snapshot, computing its capability.
    pub fn into_device_info(self) -> DeviceInfo {
        let capability = assess(&self);
        DeviceInfo {
            platform: self.platform,
            memory_gb: self.memory_gb,
            logical_cores: self.logical_cores,
            network: self.network.unwrap_or_default(),
            battery_level: self.battery_level,
            screen_width: self.screen_width,
            screen_height: self.screen_height,
            pixel_ratio: self.pixel_ratio,
            touch_support: self.touch_support,
            capability,
        }
    }
}

/// Immutable snapshot of a device, taken once per session or test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub platform: String,
    pub memory_gb: Option<f64>,
    pub logical_cores: Option<u32>,
    pub network: NetworkClass,
    pub battery_level: Option<f64>,
    pub screen_width: u32,
    pub screen_height: u32,
    pub pixel_ratio: f64,
    pub touch_support: bool,

    /// Derived capability score (0.0 - 1.0).
    pub capability: f64,
}

impl DeviceInfo {
    /// Override the derived capability.
    ///
    /// Useful when the host has its own benchmark-backed score.
    pub fn with_capability(mut self, capability: f64) -> Self {
        self.capability = capability.clamp(0.0, 1.0);
        self
    }

    /// Memory in GB, falling back to the assessment default.
    pub fn memory_or_default(&self) -> f64 {
        self.memory_gb.unwrap_or(DEFAULT_MEMORY_GB)
    }

    /// Logical cores, falling back to the assessment default.
    pub fn cores_or_default(&self) -> f64 {
        self.logical_cores.map(f64::from).unwrap_or(DEFAULT_CORES)
    }

    /// Feature vector used for similarity and clustering.
    pub fn features(&self) -> DeviceFeatures {
        DeviceFeatures {
            memory_gb: self.memory_or_default(),
            cores: self.cores_or_default(),
            capability: self.capability,
            pixel_ratio: self.pixel_ratio,
            touch: if self.touch_support { 1.0 } else { 0.0 },
        }
    }

    /// Coarse category for validator range selection.
    pub fn category(&self) -> DeviceCategory {
        DeviceCategory::classify(self)
    }
}

/// Numeric device features: `[memory, cores, capability, pixel_ratio, touch]`.
///
/// Cluster centroids are stored in this form, as the component-wise mean of
/// their members' features.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DeviceFeatures {
    pub memory_gb: f64,
    pub cores: f64,
    pub capability: f64,
    pub pixel_ratio: f64,
    pub touch: f64,
}

impl DeviceFeatures {
    /// Number of features in the vector.
    pub const LEN: usize = 5;

    pub fn to_array(&self) -> [f64; Self::LEN] {
        [
            self.memory_gb,
            self.cores,
            self.capability,
            self.pixel_ratio,
            self.touch,
        ]
    }

    pub fn from_array(values: [f64; Self::LEN]) -> Self {
        Self {
            memory_gb: values[0],
            cores: values[1],
            capability: values[2],
            pixel_ratio: values[3],
            touch: values[4],
        }
    }

    /// Component-wise mean. Returns `None` for an empty iterator.
    pub fn mean<'a>(items: impl IntoIterator<Item = &'a DeviceFeatures>) -> Option<Self> {
        let mut sum = [0.0; Self::LEN];
        let mut count = 0usize;
        for item in items {
            for (acc, v) in sum.iter_mut().zip(item.to_array()) {
                *acc += v;
            }
            count += 1;
        }
        if count == 0 {
            return None;
        }
        Some(Self::from_array(sum.map(|s| s / count as f64)))
    }

    pub fn euclidean_distance(&self, other: &DeviceFeatures) -> f64 {
        self.to_array()
            .iter()
            .zip(other.to_array())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }

    /// Similarity in `(-inf, 1]`: `1 - distance / sqrt(feature_count)`.
    pub fn similarity(&self, other: &DeviceFeatures) -> f64 {
        1.0 - self.euclidean_distance(other) / (Self::LEN as f64).sqrt()
    }

    /// Whether the centroid describes touch-first devices.
    pub fn is_touch(&self) -> bool {
        self.touch >= 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phone() -> DeviceInfo {
        DeviceHints::new("android")
            .with_memory_gb(4.0)
            .with_cores(8)
            .with_network(NetworkClass::Fast)
            .with_battery(0.9)
            .with_screen(1080, 2400, 2.75)
            .with_touch(true)
            .into_device_info()
    }

    #[test]
    fn test_network_class_from_str() {
        assert_eq!("4g".parse::<NetworkClass>().unwrap(), NetworkClass::Fast);
        assert_eq!("3g".parse::<NetworkClass>().unwrap(), NetworkClass::Medium);
        assert_eq!("2g".parse::<NetworkClass>().unwrap(), NetworkClass::Slow);
        assert_eq!(
            "slow-2g".parse::<NetworkClass>().unwrap(),
            NetworkClass::VerySlow
        );
        assert_eq!("???".parse::<NetworkClass>().unwrap(), NetworkClass::Medium);
    }

    #[test]
    fn test_network_class_display() {
        assert_eq!(format!("{}", NetworkClass::VerySlow), "very-slow");
        assert_eq!(format!("{}", NetworkClass::Fast), "fast");
    }

    #[test]
    fn test_into_device_info_computes_capability() {
        let device = phone();
        assert!(device.capability > 0.0 && device.capability <= 1.0);
        assert_eq!(device.capability, assess(&DeviceHints {
            platform: "android".to_string(),
            memory_gb: Some(4.0),
            logical_cores: Some(8),
            network: Some(NetworkClass::Fast),
            battery_level: Some(0.9),
            screen_width: 1080,
            screen_height: 2400,
            pixel_ratio: 2.75,
            touch_support: true,
        }));
    }

    #[test]
    fn test_missing_hints_use_defaults() {
        let device = DeviceHints::new("unknown").into_device_info();
        assert_eq!(device.memory_or_default(), DEFAULT_MEMORY_GB);
        assert_eq!(device.cores_or_default(), DEFAULT_CORES);
        assert_eq!(device.network, NetworkClass::Medium);
    }

    #[test]
    fn test_with_capability_clamps() {
        let device = phone().with_capability(1.7);
        assert_eq!(device.capability, 1.0);
    }

    #[test]
    fn test_features_vector() {
        let features = phone().features();
        assert_eq!(features.memory_gb, 4.0);
        assert_eq!(features.cores, 8.0);
        assert_eq!(features.touch, 1.0);
        assert!(features.is_touch());
    }

    #[test]
    fn test_identical_features_have_similarity_one() {
        let a = phone().features();
        assert!((a.similarity(&a) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_similarity_decreases_with_distance() {
        let a = phone().features();
        let mut b = a;
        b.pixel_ratio += 0.5;
        let mut c = a;
        c.pixel_ratio += 1.0;
        assert!(a.similarity(&b) > a.similarity(&c));
    }

    #[test]
    fn test_features_mean() {
        let a = DeviceFeatures::from_array([2.0, 2.0, 0.2, 1.0, 0.0]);
        let b = DeviceFeatures::from_array([4.0, 6.0, 0.4, 3.0, 1.0]);
        let mean = DeviceFeatures::mean([&a, &b]).unwrap();
        let expected = [3.0, 4.0, 0.3, 2.0, 0.5];
        for (got, want) in mean.to_array().iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "expected {want}, got {got}");
        }
        assert!(DeviceFeatures::mean(std::iter::empty()).is_none());
    }

    #[test]
    fn test_device_info_serde_roundtrip() {
        let device = phone();
        let json = serde_json::to_string(&device).unwrap();
        assert!(json.contains("\"network\":\"fast\""));
        let back: DeviceInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, device);
    }
}
