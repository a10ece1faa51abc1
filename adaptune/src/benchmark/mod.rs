//! Benchmark passes used by the optimizer and validator.
//!
//! A [`Benchmark`] runs one simulated interaction pass with a candidate
//! profile and reports the measured metrics. The host provides the real
//! implementation; [`SyntheticBenchmark`] is a seeded model for tests and
//! offline tuning.
//!
//! # Scoring
//!
//! ```text
//! score = 0.5 * min(fps / 60, 1)
//!       + 0.3 * max(0, 1 - latency / 50)
//!       + 0.2 * max(0, 1 - frame_time / 33)
//! ```

mod synthetic;

pub use synthetic::{SyntheticBenchmark, DEFAULT_NOISE};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::device::DeviceInfo;
use crate::profile::PerformanceProfile;

/// Reference frame rate for a full fps score.
pub const REFERENCE_FPS: f64 = 60.0;

/// Latency (ms) at which the latency score reaches zero.
pub const REFERENCE_LATENCY_MS: f64 = 50.0;

/// Frame time (ms) at which the frame-time score reaches zero.
pub const REFERENCE_FRAME_TIME_MS: f64 = 33.0;

const FPS_WEIGHT: f64 = 0.5;
const LATENCY_WEIGHT: f64 = 0.3;
const FRAME_TIME_WEIGHT: f64 = 0.2;

/// Errors from a benchmark pass.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BenchmarkError {
    /// The host could not complete the interaction pass.
    #[error("Benchmark pass failed: {0}")]
    PassFailed(String),

    /// The pass completed but reported unusable numbers.
    #[error("Benchmark reported invalid metrics: {0}")]
    InvalidMetrics(String),
}

/// Metrics measured by one benchmark pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkMetrics {
    pub fps: f64,
    pub input_latency_ms: f64,
    pub frame_time_ms: f64,
}

impl BenchmarkMetrics {
    pub fn new(fps: f64, input_latency_ms: f64, frame_time_ms: f64) -> Self {
        Self {
            fps,
            input_latency_ms,
            frame_time_ms,
        }
    }

    /// Reject non-finite or negative values.
    pub fn validate(&self) -> Result<(), BenchmarkError> {
        let fields = [
            ("fps", self.fps),
            ("input_latency_ms", self.input_latency_ms),
            ("frame_time_ms", self.frame_time_ms),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(BenchmarkError::InvalidMetrics(format!(
                    "{} = {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Composite score in `[0, 1]`.
    pub fn score(&self) -> f64 {
        score(self)
    }
}

/// Composite score in `[0, 1]` for a set of metrics.
pub fn score(metrics: &BenchmarkMetrics) -> f64 {
    let fps = (metrics.fps / REFERENCE_FPS).clamp(0.0, 1.0);
    let latency = (1.0 - metrics.input_latency_ms / REFERENCE_LATENCY_MS).max(0.0);
    let frame_time = (1.0 - metrics.frame_time_ms / REFERENCE_FRAME_TIME_MS).max(0.0);
    FPS_WEIGHT * fps + LATENCY_WEIGHT * latency + FRAME_TIME_WEIGHT * frame_time
}

/// One simulated interaction pass with a candidate profile.
///
/// Implementations may be slow (a real pass drives the UI for a while), so
/// callers only invoke this from optimizer and validator runs, never from
/// the controller tick.
pub trait Benchmark {
    fn run(
        &mut self,
        device: &DeviceInfo,
        profile: &PerformanceProfile,
    ) -> Result<BenchmarkMetrics, BenchmarkError>;
}

impl<F> Benchmark for F
where
    F: FnMut(&DeviceInfo, &PerformanceProfile) -> Result<BenchmarkMetrics, BenchmarkError>,
{
    fn run(
        &mut self,
        device: &DeviceInfo,
        profile: &PerformanceProfile,
    ) -> Result<BenchmarkMetrics, BenchmarkError> {
        self(device, profile)
    }
}

/// Run a pass and reject invalid metrics.
pub(crate) fn run_checked<B: Benchmark + ?Sized>(
    bench: &mut B,
    device: &DeviceInfo,
    profile: &PerformanceProfile,
) -> Result<BenchmarkMetrics, BenchmarkError> {
    let metrics = bench.run(device, profile)?;
    metrics.validate()?;
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceHints;
    use crate::profile::ProfileCatalog;

    #[test]
    fn test_perfect_metrics_score_one() {
        let metrics = BenchmarkMetrics::new(60.0, 0.0, 0.0);
        assert!((metrics.score() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fps_is_capped() {
        let a = BenchmarkMetrics::new(60.0, 20.0, 10.0);
        let b = BenchmarkMetrics::new(144.0, 20.0, 10.0);
        assert_eq!(a.score(), b.score());
    }

    #[test]
    fn test_terrible_metrics_score_zero() {
        let metrics = BenchmarkMetrics::new(0.0, 80.0, 50.0);
        assert_eq!(metrics.score(), 0.0);
    }

    #[test]
    fn test_mixed_score() {
        // 0.5 * 0.5 + 0.3 * 0.5 + 0.2 * 0.0
        let metrics = BenchmarkMetrics::new(30.0, 25.0, 33.0);
        assert!((metrics.score() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_metrics_rejected() {
        assert!(BenchmarkMetrics::new(f64::NAN, 1.0, 1.0).validate().is_err());
        assert!(BenchmarkMetrics::new(60.0, -1.0, 1.0).validate().is_err());
        assert!(BenchmarkMetrics::new(60.0, 1.0, 1.0).validate().is_ok());
    }

    #[test]
    fn test_closure_benchmark() {
        let device = DeviceHints::new("test").into_device_info();
        let profile = ProfileCatalog::standard().select(0.5).clone();
        let mut calls = 0;
        let mut bench = |_: &DeviceInfo, _: &PerformanceProfile| {
            calls += 1;
            Ok::<_, BenchmarkError>(BenchmarkMetrics::new(f64::INFINITY, 1.0, 1.0))
        };

        let result = run_checked(&mut bench, &device, &profile);
        assert!(matches!(result, Err(BenchmarkError::InvalidMetrics(_))));
        assert_eq!(calls, 1);
    }
}
