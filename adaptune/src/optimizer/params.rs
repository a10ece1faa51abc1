//! The tunable parameter space.
//!
//! | Parameter | Min | Max | Step |
//! |---|---|---|---|
//! | throttle interval (ms) | 8 | 50 | 2 |
//! | debounce delay (ms) | 25 | 300 | 25 |
//! | touch threshold (px) | 5 | 15 | 1 |
//! | touch delay (ms) | 50 | 500 | 50 |
//! | max concurrent animations | 1 | 10 | 1 |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::profile::PerformanceProfile;

/// Bounds and grid of a parameter (`min..=max` in steps of `step`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl ParameterRange {
    pub const fn new(min: f64, max: f64, step: f64) -> Self {
        Self { min, max, step }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return self.min;
        }
        value.clamp(self.min, self.max)
    }

    /// Nearest grid point (`min + k * step`) within bounds.
    pub fn snap(&self, value: f64) -> f64 {
        let clamped = self.clamp(value);
        if self.step <= 0.0 {
            return clamped;
        }
        let steps = ((clamped - self.min) / self.step).round();
        self.clamp(self.min + steps * self.step)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Grid points from `min` to `max` inclusive.
    pub fn values(&self) -> Vec<f64> {
        if self.step <= 0.0 || self.max <= self.min {
            return vec![self.min];
        }
        let count = ((self.max - self.min) / self.step + 1e-9).floor() as usize + 1;
        (0..count)
            .map(|k| self.min + k as f64 * self.step)
            .collect()
    }
}

/// A profile field the optimizer and validator may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TunableParameter {
    ThrottleInterval,
    DebounceDelay,
    TouchThreshold,
    TouchDelay,
    MaxAnimations,
}

impl TunableParameter {
    pub const ALL: [TunableParameter; 5] = [
        TunableParameter::ThrottleInterval,
        TunableParameter::DebounceDelay,
        TunableParameter::TouchThreshold,
        TunableParameter::TouchDelay,
        TunableParameter::MaxAnimations,
    ];

    pub fn bounds(&self) -> ParameterRange {
        match self {
            TunableParameter::ThrottleInterval => ParameterRange::new(8.0, 50.0, 2.0),
            TunableParameter::DebounceDelay => ParameterRange::new(25.0, 300.0, 25.0),
            TunableParameter::TouchThreshold => ParameterRange::new(5.0, 15.0, 1.0),
            TunableParameter::TouchDelay => ParameterRange::new(50.0, 500.0, 50.0),
            TunableParameter::MaxAnimations => ParameterRange::new(1.0, 10.0, 1.0),
        }
    }

    /// Position in [`ALL`](Self::ALL) and in a [`ParameterVector`].
    pub fn index(&self) -> usize {
        match self {
            TunableParameter::ThrottleInterval => 0,
            TunableParameter::DebounceDelay => 1,
            TunableParameter::TouchThreshold => 2,
            TunableParameter::TouchDelay => 3,
            TunableParameter::MaxAnimations => 4,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TunableParameter::ThrottleInterval => "throttle_interval_ms",
            TunableParameter::DebounceDelay => "debounce_delay_ms",
            TunableParameter::TouchThreshold => "touch_distance_threshold_px",
            TunableParameter::TouchDelay => "touch_hold_delay_ms",
            TunableParameter::MaxAnimations => "max_concurrent_animations",
        }
    }

    /// Human label used in recommendations.
    pub fn label(&self) -> &'static str {
        match self {
            TunableParameter::ThrottleInterval => "throttle interval",
            TunableParameter::DebounceDelay => "debounce delay",
            TunableParameter::TouchThreshold => "touch threshold",
            TunableParameter::TouchDelay => "touch delay",
            TunableParameter::MaxAnimations => "max concurrent animations",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            TunableParameter::ThrottleInterval
            | TunableParameter::DebounceDelay
            | TunableParameter::TouchDelay => "ms",
            TunableParameter::TouchThreshold => "px",
            TunableParameter::MaxAnimations => "",
        }
    }

    /// Parse a parameter from its field name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn get(&self, profile: &PerformanceProfile) -> f64 {
        match self {
            TunableParameter::ThrottleInterval => profile.throttle_interval_ms,
            TunableParameter::DebounceDelay => profile.debounce_delay_ms,
            TunableParameter::TouchThreshold => profile.touch_distance_threshold_px,
            TunableParameter::TouchDelay => profile.touch_hold_delay_ms,
            TunableParameter::MaxAnimations => f64::from(profile.max_concurrent_animations),
        }
    }

    /// Write `value` into `profile`. Animation counts are rounded.
    pub fn set(&self, profile: &mut PerformanceProfile, value: f64) {
        match self {
            TunableParameter::ThrottleInterval => profile.throttle_interval_ms = value,
            TunableParameter::DebounceDelay => profile.debounce_delay_ms = value,
            TunableParameter::TouchThreshold => profile.touch_distance_threshold_px = value,
            TunableParameter::TouchDelay => profile.touch_hold_delay_ms = value,
            TunableParameter::MaxAnimations => {
                profile.max_concurrent_animations = value.round().max(1.0) as u32
            }
        }
    }
}

impl fmt::Display for TunableParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One value per [`TunableParameter`], in [`TunableParameter::ALL`] order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ParameterVector(pub [f64; 5]);

impl ParameterVector {
    pub fn from_profile(profile: &PerformanceProfile) -> Self {
        Self(TunableParameter::ALL.map(|p| p.get(profile)))
    }

    pub fn get(&self, param: TunableParameter) -> f64 {
        self.0[param.index()]
    }

    pub fn set(&mut self, param: TunableParameter, value: f64) {
        self.0[param.index()] = value;
    }

    /// Apply `f` to each parameter and its value.
    pub fn map(&self, mut f: impl FnMut(TunableParameter, f64) -> f64) -> Self {
        let mut out = *self;
        for param in TunableParameter::ALL {
            out.set(param, f(param, self.get(param)));
        }
        out
    }

    pub fn clamped(&self) -> Self {
        self.map(|p, v| p.bounds().clamp(v))
    }

    pub fn snapped(&self) -> Self {
        self.map(|p, v| p.bounds().snap(v))
    }

    /// Copy of `base` with these values written in.
    pub fn apply_to(&self, base: &PerformanceProfile) -> PerformanceProfile {
        let mut profile = base.clone();
        for param in TunableParameter::ALL {
            param.set(&mut profile, self.get(param));
        }
        profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{ProfileCatalog, ProfileRank};

    #[test]
    fn test_snap_to_grid() {
        let bounds = TunableParameter::DebounceDelay.bounds();
        assert_eq!(bounds.snap(37.0), 25.0);
        assert_eq!(bounds.snap(38.0), 50.0);
        assert_eq!(bounds.snap(1000.0), 300.0);
        assert_eq!(bounds.snap(-5.0), 25.0);
    }

    #[test]
    fn test_snap_throttle_grid() {
        let bounds = TunableParameter::ThrottleInterval.bounds();
        assert_eq!(bounds.snap(24.9), 24.0);
        assert_eq!(bounds.snap(25.1), 26.0);
    }

    #[test]
    fn test_range_values() {
        let range = ParameterRange::new(16.0, 36.0, 4.0);
        assert_eq!(range.values(), vec![16.0, 20.0, 24.0, 28.0, 32.0, 36.0]);
        assert_eq!(ParameterRange::new(5.0, 5.0, 1.0).values(), vec![5.0]);
        // Max off the grid is not emitted.
        assert_eq!(ParameterRange::new(32.0, 50.0, 8.0).values(), vec![32.0, 40.0, 48.0]);
    }

    #[test]
    fn test_clamp_nan_falls_back_to_min() {
        assert_eq!(TunableParameter::TouchDelay.bounds().clamp(f64::NAN), 50.0);
    }

    #[test]
    fn test_vector_roundtrip_through_profile() {
        let base = ProfileCatalog::standard()
            .profile(ProfileRank::Balanced)
            .clone();
        let vector = ParameterVector::from_profile(&base);
        assert_eq!(vector.get(TunableParameter::ThrottleInterval), 24.0);
        assert_eq!(vector.get(TunableParameter::MaxAnimations), 4.0);
        assert_eq!(vector.apply_to(&base), base);
    }

    #[test]
    fn test_animation_count_is_rounded() {
        let mut profile = ProfileCatalog::standard()
            .profile(ProfileRank::Balanced)
            .clone();
        TunableParameter::MaxAnimations.set(&mut profile, 2.6);
        assert_eq!(profile.max_concurrent_animations, 3);
        TunableParameter::MaxAnimations.set(&mut profile, -4.0);
        assert_eq!(profile.max_concurrent_animations, 1);
    }

    #[test]
    fn test_names_roundtrip() {
        for param in TunableParameter::ALL {
            assert_eq!(TunableParameter::from_name(param.name()), Some(param));
            assert_eq!(TunableParameter::ALL[param.index()], param);
        }
    }
}
