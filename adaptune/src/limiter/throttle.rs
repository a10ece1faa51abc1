//! Performance-aware throttler.
//!
//! # Interval Adaptation
//!
//! ```text
//! avg(metric) < threshold          → interval × 1.1  (capped at max)
//! avg(metric) > threshold × 1.2    → interval × 0.9  (floored at min)
//! otherwise                        → unchanged
//! ```
//!
//! The average is taken over the last [`METRIC_WINDOW`] metric values.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Number of metric values averaged.
pub const METRIC_WINDOW: usize = 10;

const GROW_FACTOR: f64 = 1.1;
const SHRINK_FACTOR: f64 = 0.9;
const RECOVERY_MARGIN: f64 = 1.2;

/// Throttler configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ThrottleConfig {
    /// Starting interval (ms).
    pub base_interval_ms: f64,
    /// Lowest interval the throttler may reach (ms).
    pub min_interval_ms: f64,
    /// Highest interval the throttler may reach (ms).
    pub max_interval_ms: f64,
    /// Performance level below which the throttler backs off.
    pub threshold: f64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            base_interval_ms: 16.0,
            min_interval_ms: 8.0,
            max_interval_ms: 50.0,
            threshold: 0.8,
        }
    }
}

/// Throttler whose interval follows a rolling performance signal.
#[derive(Debug)]
pub struct DynamicThrottler {
    config: ThrottleConfig,
    metrics: VecDeque<f64>,
    effective_interval_ms: f64,
    last_fired: Option<Instant>,
}

impl DynamicThrottler {
    pub fn new(config: ThrottleConfig) -> Self {
        let (min, max) = ordered_bounds(config.min_interval_ms, config.max_interval_ms);
        let config = ThrottleConfig {
            min_interval_ms: min,
            max_interval_ms: max,
            ..config
        };
        let effective_interval_ms = config.base_interval_ms.clamp(min, max);
        Self {
            config,
            metrics: VecDeque::with_capacity(METRIC_WINDOW),
            effective_interval_ms,
            last_fired: None,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ThrottleConfig::default())
    }

    /// Feed one performance metric (expected in `[0, 1]`) and adapt.
    ///
    /// Non-finite metrics are ignored.
    pub fn record_metric(&mut self, metric: f64) {
        if !metric.is_finite() {
            return;
        }

        self.metrics.push_back(metric);
        while self.metrics.len() > METRIC_WINDOW {
            self.metrics.pop_front();
        }

        let average = self.metrics.iter().sum::<f64>() / self.metrics.len() as f64;
        let previous = self.effective_interval_ms;

        if average < self.config.threshold {
            self.effective_interval_ms =
                (self.effective_interval_ms * GROW_FACTOR).min(self.config.max_interval_ms);
        } else if average > self.config.threshold * RECOVERY_MARGIN {
            self.effective_interval_ms =
                (self.effective_interval_ms * SHRINK_FACTOR).max(self.config.min_interval_ms);
        }

        if self.effective_interval_ms != previous {
            tracing::trace!(
                average = format!("{:.2}", average),
                from_ms = format!("{:.1}", previous),
                to_ms = format!("{:.1}", self.effective_interval_ms),
                "Throttle interval adapted"
            );
        }
    }

    /// Whether enough time has passed since the last firing.
    pub fn is_ready(&self, now: Instant) -> bool {
        match self.last_fired {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.effective_interval(),
        }
    }

    /// Record `metric`, then run `f` if the interval has elapsed.
    ///
    /// Returns `Some(result)` when `f` ran.
    pub fn call<F, R>(&mut self, now: Instant, metric: f64, f: F) -> Option<R>
    where
        F: FnOnce() -> R,
    {
        self.record_metric(metric);
        self.fire_if_ready(now, f)
    }

    /// Run `f` if the interval has elapsed, without recording a metric.
    pub fn fire_if_ready<F, R>(&mut self, now: Instant, f: F) -> Option<R>
    where
        F: FnOnce() -> R,
    {
        if !self.is_ready(now) {
            return None;
        }
        self.last_fired = Some(now);
        Some(f())
    }

    /// Change the base interval (e.g. after a profile change).
    ///
    /// The effective interval restarts from the new base, within bounds.
    pub fn set_base_interval(&mut self, base_interval_ms: f64) {
        self.config.base_interval_ms = base_interval_ms;
        self.effective_interval_ms =
            base_interval_ms.clamp(self.config.min_interval_ms, self.config.max_interval_ms);
    }

    /// Change the base interval while keeping the adaptation made so far.
    ///
    /// The effective interval is scaled by `new / old` base and clamped.
    pub fn rescale_base_interval(&mut self, base_interval_ms: f64) {
        let previous = self.config.base_interval_ms;
        self.config.base_interval_ms = base_interval_ms;
        if previous <= 0.0 || !previous.is_finite() || !base_interval_ms.is_finite() {
            self.set_base_interval(base_interval_ms);
            return;
        }
        self.effective_interval_ms = (self.effective_interval_ms * base_interval_ms / previous)
            .clamp(self.config.min_interval_ms, self.config.max_interval_ms);
    }

    pub fn effective_interval_ms(&self) -> f64 {
        self.effective_interval_ms
    }

    pub fn effective_interval(&self) -> Duration {
        Duration::from_secs_f64(self.effective_interval_ms.max(0.0) / 1000.0)
    }

    pub fn config(&self) -> &ThrottleConfig {
        &self.config
    }
}

impl Default for DynamicThrottler {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn ordered_bounds(a: f64, b: f64) -> (f64, f64) {
    let a = a.max(0.0);
    let b = b.max(0.0);
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_at_base_interval() {
        let throttler = DynamicThrottler::with_defaults();
        assert_eq!(throttler.effective_interval_ms(), 16.0);
    }

    #[test]
    fn test_base_outside_bounds_is_clamped() {
        let throttler = DynamicThrottler::new(ThrottleConfig {
            base_interval_ms: 200.0,
            ..Default::default()
        });
        assert_eq!(throttler.effective_interval_ms(), 50.0);
    }

    #[test]
    fn test_degrading_performance_grows_interval() {
        let mut throttler = DynamicThrottler::with_defaults();
        throttler.record_metric(0.5);
        assert!((throttler.effective_interval_ms() - 17.6).abs() < 1e-9);
    }

    #[test]
    fn test_strong_performance_shrinks_interval() {
        let mut throttler = DynamicThrottler::with_defaults();
        throttler.record_metric(1.0);
        assert!((throttler.effective_interval_ms() - 14.4).abs() < 1e-9);
    }

    #[test]
    fn test_dead_band_keeps_interval() {
        let mut throttler = DynamicThrottler::with_defaults();
        throttler.record_metric(0.9);
        assert_eq!(throttler.effective_interval_ms(), 16.0);
    }

    #[test]
    fn test_interval_caps_at_max() {
        let mut throttler = DynamicThrottler::with_defaults();
        for _ in 0..100 {
            throttler.record_metric(0.0);
        }
        assert_eq!(throttler.effective_interval_ms(), 50.0);
    }

    #[test]
    fn test_fires_only_after_interval() {
        let start = Instant::now();
        let mut throttler = DynamicThrottler::with_defaults();
        let mut fired = 0;

        assert!(throttler.call(start, 0.9, || fired += 1).is_some());
        assert!(throttler
            .call(start + Duration::from_millis(5), 0.9, || fired += 1)
            .is_none());
        assert!(throttler
            .call(start + Duration::from_millis(16), 0.9, || fired += 1)
            .is_some());
        assert_eq!(fired, 2);
    }

    #[test]
    fn test_set_base_interval_restarts_adaptation() {
        let mut throttler = DynamicThrottler::with_defaults();
        throttler.record_metric(0.1);
        throttler.set_base_interval(33.0);
        assert_eq!(throttler.effective_interval_ms(), 33.0);
    }

    #[test]
    fn test_rescale_keeps_adaptation() {
        let mut throttler = DynamicThrottler::new(ThrottleConfig {
            base_interval_ms: 20.0,
            ..Default::default()
        });
        throttler.record_metric(0.5);
        throttler.record_metric(0.5);
        assert!((throttler.effective_interval_ms() - 24.2).abs() < 1e-9);

        throttler.rescale_base_interval(10.0);
        assert!((throttler.effective_interval_ms() - 12.1).abs() < 1e-9);
        assert_eq!(throttler.config().base_interval_ms, 10.0);

        // Scaling past the cap clamps.
        throttler.rescale_base_interval(60.0);
        assert_eq!(throttler.effective_interval_ms(), 50.0);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_interval_stays_within_bounds(
                metrics in proptest::collection::vec(-10.0..10.0_f64, 0..300),
                base in 0.0..200.0_f64,
            ) {
                let mut throttler = DynamicThrottler::new(ThrottleConfig {
                    base_interval_ms: base,
                    ..Default::default()
                });
                for metric in metrics {
                    throttler.record_metric(metric);
                    let interval = throttler.effective_interval_ms();
                    prop_assert!(
                        (8.0..=50.0).contains(&interval),
                        "interval {} escaped [8, 50]", interval
                    );
                }
            }
        }
    }
}
