//! Configuration for the adaptive controller.
//!
//! # Example Configuration (INI)
//!
//! ```ini
//! [controller]
//! promote_threshold = 0.9
//! demote_threshold = 0.7
//! sample_window_secs = 10
//!
//! [throttle]
//! threshold = 0.8
//! min_interval_ms = 8
//! max_interval_ms = 50
//! ```

use std::time::Duration;

use crate::budget::DEFAULT_FRAME_LENGTH;
use crate::error::{TuningError, TuningResult};
use crate::limiter::{DebounceConfig, ThrottleConfig};
use crate::telemetry::{DEFAULT_MAX_SAMPLES, DEFAULT_WINDOW, INTERACTION_WINDOW};

/// Absolute bounds for the interaction-adjusted throttle interval (ms).
pub const THROTTLE_BOUNDS_MS: (f64, f64) = (8.0, 50.0);

/// Absolute bounds for the interaction-adjusted debounce delay (ms).
pub const DEBOUNCE_BOUNDS_MS: (f64, f64) = (25.0, 300.0);

/// Absolute bounds for the interaction-adjusted touch-hold delay (ms).
pub const TOUCH_DELAY_BOUNDS_MS: (f64, f64) = (50.0, 500.0);

/// Configuration for [`AdaptiveController`](super::AdaptiveController).
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Score at or above which the controller promotes one rank.
    pub promote_threshold: f64,

    /// Score at or below which the controller demotes one rank.
    pub demote_threshold: f64,

    /// Interaction intensity above which timings are tightened.
    pub busy_interaction: f64,

    /// Interaction intensity below which timings are relaxed.
    pub idle_interaction: f64,

    /// Multiplier applied to timings during busy interaction.
    pub busy_factor: f64,

    /// Multiplier applied to timings while idle.
    pub idle_factor: f64,

    /// How far back the rolling sample window reaches.
    pub sample_window: Duration,

    /// Hard cap on retained samples.
    pub max_samples: usize,

    /// How far back interaction events count.
    pub interaction_window: Duration,

    /// Budget reset period.
    pub frame_length: Duration,

    /// Dynamic throttler settings. The base interval follows the profile.
    pub throttle: ThrottleConfig,

    /// Dynamic debouncer settings. The base delay follows the profile.
    pub debounce: DebounceConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            promote_threshold: 0.9,
            demote_threshold: 0.7,
            busy_interaction: 0.8,
            idle_interaction: 0.3,
            busy_factor: 0.8,
            idle_factor: 1.2,
            sample_window: DEFAULT_WINDOW,
            max_samples: DEFAULT_MAX_SAMPLES,
            interaction_window: INTERACTION_WINDOW,
            frame_length: DEFAULT_FRAME_LENGTH,
            throttle: ThrottleConfig::default(),
            debounce: DebounceConfig::default(),
        }
    }
}

impl ControllerConfig {
    pub fn with_thresholds(mut self, promote: f64, demote: f64) -> Self {
        self.promote_threshold = promote;
        self.demote_threshold = demote;
        self
    }

    pub fn with_sample_window(mut self, window: Duration) -> Self {
        self.sample_window = window;
        self
    }

    /// Reject settings that would break the hysteresis band or the limiters.
    pub fn validate(&self) -> TuningResult<()> {
        if !(self.demote_threshold.is_finite() && self.promote_threshold.is_finite()) {
            return Err(TuningError::invalid_config(
                "controller thresholds must be finite",
            ));
        }
        if self.demote_threshold >= self.promote_threshold {
            return Err(TuningError::invalid_config(format!(
                "demote_threshold ({}) must be below promote_threshold ({})",
                self.demote_threshold, self.promote_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.idle_interaction)
            || !(0.0..=1.0).contains(&self.busy_interaction)
            || self.idle_interaction >= self.busy_interaction
        {
            return Err(TuningError::invalid_config(
                "interaction thresholds must satisfy 0 <= idle < busy <= 1",
            ));
        }
        if self.busy_factor <= 0.0 || self.idle_factor <= 0.0 {
            return Err(TuningError::invalid_config(
                "interaction factors must be positive",
            ));
        }
        if self.sample_window.is_zero() || self.max_samples == 0 {
            return Err(TuningError::invalid_config(
                "sample window must be non-empty",
            ));
        }
        if self.frame_length.is_zero() {
            return Err(TuningError::invalid_config("frame_length must be positive"));
        }
        if self.throttle.min_interval_ms > self.throttle.max_interval_ms {
            return Err(TuningError::invalid_config(
                "throttle min_interval_ms exceeds max_interval_ms",
            ));
        }
        if self.debounce.min_delay_ms > self.debounce.max_delay_ms {
            return Err(TuningError::invalid_config(
                "debounce min_delay_ms exceeds max_delay_ms",
            ));
        }
        Ok(())
    }
}
