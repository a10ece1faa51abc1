//! Seeded performance model standing in for a real interaction pass.
//!
//! The model trades responsiveness against load:
//!
//! ```text
//! capacity  = 30 + 90 * capability                  (fps with no load)
//! load      = 1 + 0.07 * (animations - 1) + 6 / throttle_ms
//! fps       = min(capacity / load, 120)
//! latency   = throttle/2 + 0.1 * debounce + 0.02 * touch_delay
//!           + 0.5 * frame_time + 0.1 * touch_threshold
//! ```
//!
//! Each metric is then perturbed by uniform noise of `±noise`. Longer
//! throttle intervals raise fps but also latency, so the best settings lie
//! inside the tunable bounds rather than at an edge.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Benchmark, BenchmarkError, BenchmarkMetrics};
use crate::device::DeviceInfo;
use crate::profile::PerformanceProfile;

/// Default relative noise applied to each metric.
pub const DEFAULT_NOISE: f64 = 0.02;

const BASE_FPS: f64 = 30.0;
const CAPABILITY_FPS: f64 = 90.0;
const MAX_FPS: f64 = 120.0;
const ANIMATION_LOAD: f64 = 0.07;
const EVENT_LOAD: f64 = 6.0;

/// Deterministic synthetic benchmark.
#[derive(Debug)]
pub struct SyntheticBenchmark {
    rng: StdRng,
    noise: f64,
    runs: u64,
    fail_after: Option<u64>,
}

impl SyntheticBenchmark {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            noise: DEFAULT_NOISE,
            runs: 0,
            fail_after: None,
        }
    }

    /// Set the relative noise amplitude (0 disables noise).
    pub fn with_noise(mut self, noise: f64) -> Self {
        self.noise = noise.abs();
        self
    }

    /// Fail every pass after `passes` successful ones.
    pub fn failing_after(mut self, passes: u64) -> Self {
        self.fail_after = Some(passes);
        self
    }

    /// Passes attempted so far.
    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// Noise-free metrics for a device and profile.
    pub fn model(device: &DeviceInfo, profile: &PerformanceProfile) -> BenchmarkMetrics {
        let capacity = BASE_FPS + CAPABILITY_FPS * device.capability.clamp(0.0, 1.0);
        let animations = f64::from(profile.max_concurrent_animations.max(1));
        let throttle = profile.throttle_interval_ms.max(1.0);

        let load = 1.0 + ANIMATION_LOAD * (animations - 1.0) + EVENT_LOAD / throttle;
        let fps = (capacity / load).min(MAX_FPS);
        let frame_time_ms = 1000.0 / fps;

        let input_latency_ms = throttle / 2.0
            + 0.1 * profile.debounce_delay_ms.max(0.0)
            + 0.02 * profile.touch_hold_delay_ms.max(0.0)
            + 0.5 * frame_time_ms
            + 0.1 * profile.touch_distance_threshold_px.max(0.0);

        BenchmarkMetrics::new(fps, input_latency_ms, frame_time_ms)
    }

    fn jitter(&mut self, value: f64) -> f64 {
        if self.noise == 0.0 {
            return value;
        }
        let factor = 1.0 + self.rng.random_range(-self.noise..=self.noise);
        (value * factor).max(0.0)
    }
}

impl Benchmark for SyntheticBenchmark {
    fn run(
        &mut self,
        device: &DeviceInfo,
        profile: &PerformanceProfile,
    ) -> Result<BenchmarkMetrics, BenchmarkError> {
        self.runs += 1;
        if let Some(limit) = self.fail_after {
            if self.runs > limit {
                return Err(BenchmarkError::PassFailed(format!(
                    "synthetic pass {} aborted",
                    self.runs
                )));
            }
        }

        let clean = Self::model(device, profile);
        Ok(BenchmarkMetrics::new(
            self.jitter(clean.fps),
            self.jitter(clean.input_latency_ms),
            self.jitter(clean.frame_time_ms),
        ))
    }
}
