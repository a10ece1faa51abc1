//! Optimization results and analytic improvement estimates.
//!
//! Improvements are estimated from the profile deltas, not re-measured:
//!
//! ```text
//! fps        = 0.6 * animation_reduction + 0.4 * throttle_increase
//! latency    = 0.5 * debounce_reduction  + 0.5 * touch_delay_reduction
//! frame_time = 0.5 * animation_reduction + 0.5 * throttle_increase
//! overall    = 0.5 * fps + 0.3 * latency + 0.2 * frame_time
//! ```
//!
//! Each term is a signed ratio relative to the original value.

use serde::{Deserialize, Serialize};

use super::params::TunableParameter;
use crate::profile::PerformanceProfile;

/// Per-metric improvement ratios (positive is better).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImprovementEstimate {
    pub fps: f64,
    pub latency: f64,
    pub frame_time: f64,
    pub overall: f64,

    /// Always `true` for analytic estimates.
    pub estimated: bool,
}

impl ImprovementEstimate {
    /// Estimate the effect of moving from `original` to `optimized`.
    pub fn from_profiles(original: &PerformanceProfile, optimized: &PerformanceProfile) -> Self {
        let animation_reduction = relative_decrease(
            f64::from(original.max_concurrent_animations),
            f64::from(optimized.max_concurrent_animations),
        );
        let throttle_increase = -relative_decrease(
            original.throttle_interval_ms,
            optimized.throttle_interval_ms,
        );
        let debounce_reduction =
            relative_decrease(original.debounce_delay_ms, optimized.debounce_delay_ms);
        let touch_reduction =
            relative_decrease(original.touch_hold_delay_ms, optimized.touch_hold_delay_ms);

        let fps = 0.6 * animation_reduction + 0.4 * throttle_increase;
        let latency = 0.5 * debounce_reduction + 0.5 * touch_reduction;
        let frame_time = 0.5 * animation_reduction + 0.5 * throttle_increase;
        let overall = 0.5 * fps + 0.3 * latency + 0.2 * frame_time;

        Self {
            fps,
            latency,
            frame_time,
            overall,
            estimated: true,
        }
    }
}

fn relative_decrease(original: f64, updated: f64) -> f64 {
    if original.abs() < f64::EPSILON {
        return 0.0;
    }
    (original - updated) / original
}

/// Outcome of one optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub original: PerformanceProfile,
    pub optimized: PerformanceProfile,
    pub improvement: ImprovementEstimate,
    pub recommendations: Vec<String>,

    /// 0.0 - 1.0
    pub confidence: f64,

    /// Benchmark iterations run after the baseline.
    pub iterations: u32,
    pub converged: bool,
    pub baseline_score: f64,
    pub best_score: f64,

    /// `false` when a benchmark pass failed.
    pub success: bool,
    pub error: Option<String>,

    /// Unix milliseconds.
    pub timestamp_ms: i64,
}

impl OptimizationResult {
    /// Result for a run whose benchmark failed. The profile is left as is.
    pub fn failed(original: PerformanceProfile, error: impl Into<String>, iterations: u32) -> Self {
        Self {
            optimized: original.clone(),
            original,
            improvement: ImprovementEstimate {
                estimated: true,
                ..Default::default()
            },
            recommendations: Vec::new(),
            confidence: 0.0,
            iterations,
            converged: false,
            baseline_score: 0.0,
            best_score: 0.0,
            success: false,
            error: Some(error.into()),
            timestamp_ms: crate::clock::unix_millis(),
        }
    }
}

/// Confidence for a finished run.
///
/// `0.5 + min(iterations/10, 0.3) + 0.2 (converged) + 0.2 (overall > 0.1)`,
/// capped at 1.0.
pub fn confidence(iterations: u32, converged: bool, overall_improvement: f64) -> f64 {
    let mut confidence = 0.5 + (f64::from(iterations) / 10.0).min(0.3);
    if converged {
        confidence += 0.2;
    }
    if overall_improvement > 0.1 {
        confidence += 0.2;
    }
    confidence.min(1.0)
}

/// Human-readable changes between two profiles.
pub fn recommendations(original: &PerformanceProfile, optimized: &PerformanceProfile) -> Vec<String> {
    let mut lines: Vec<String> = TunableParameter::ALL
        .iter()
        .filter_map(|param| {
            let from = param.get(original);
            let to = param.get(optimized);
            if (from - to).abs() < f64::EPSILON {
                return None;
            }
            let verb = if to > from { "Increase" } else { "Decrease" };
            Some(format!(
                "{} {} from {}{} to {}{}",
                verb,
                param.label(),
                from,
                param.unit(),
                to,
                param.unit()
            ))
        })
        .collect();

    if lines.is_empty() {
        lines.push(format!(
            "Current {} settings are already near optimal",
            original.rank
        ));
    }
    lines
}
