//! Iterative parameter search against a benchmark.
//!
//! A run benchmarks the catalog-selected profile once for a baseline, then
//! iterates:
//!
//! ```text
//! with p = exploration_rate:  candidate_i ~ U(min_i, max_i)
//! otherwise:                  candidate_i = cur_i + lr * (best_i - cur_i) / cur_i
//!
//! score(candidate) > best + min_improvement  →  best = candidate
//! current = 0.9 * current + 0.1 * candidate
//! after warm-up: (best - baseline) / baseline < threshold  →  stop
//! ```
//!
//! Candidates are clamped to their bounds during the search and snapped to
//! the parameter grid when the optimized profile is emitted.
//!
//! [`OptimizationRun`] performs one benchmark pass per [`step`](OptimizationRun::step)
//! so hosts can spread a run over frames. [`ParameterOptimizer::optimize`]
//! and [`ParameterOptimizer::optimize_async`] drive a run to completion and
//! check a [`CancellationToken`] between passes. A cancelled run discards its
//! progress.

mod config;
mod params;
mod result;

pub use config::{OptimizationConfig, MAX_ITERATIONS_LIMIT};
pub use params::{ParameterRange, ParameterVector, TunableParameter};
pub use result::{confidence, recommendations, ImprovementEstimate, OptimizationResult};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio_util::sync::CancellationToken;

use crate::benchmark::{run_checked, Benchmark};
use crate::busy::{BusyFlag, BusyPermit};
use crate::device::DeviceInfo;
use crate::error::{TuningError, TuningResult};
use crate::profile::{PerformanceProfile, ProfileCatalog};

const MOMENTUM: f64 = 0.9;
const OPERATION: &str = "optimization";

/// Runs optimization passes, one at a time.
#[derive(Debug)]
pub struct ParameterOptimizer {
    config: OptimizationConfig,
    catalog: ProfileCatalog,
    busy: BusyFlag,
}

impl ParameterOptimizer {
    /// Create an optimizer, rejecting an invalid configuration.
    pub fn new(config: OptimizationConfig) -> TuningResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            catalog: ProfileCatalog::standard(),
            busy: BusyFlag::new(OPERATION),
        })
    }

    pub fn with_catalog(mut self, catalog: ProfileCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn config(&self) -> &OptimizationConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.busy.is_busy()
    }

    /// Begin a run from the catalog profile selected for `device`.
    ///
    /// Fails fast with [`TuningError::ConcurrentOperation`] while another
    /// run holds this optimizer.
    pub fn start<'a, B>(
        &'a self,
        device: &'a DeviceInfo,
        bench: &'a mut B,
    ) -> TuningResult<OptimizationRun<'a, B>>
    where
        B: Benchmark + ?Sized,
    {
        let original = self.catalog.select(device.capability).clone();
        self.start_from(device, original, bench)
    }

    /// Begin a run from an explicit starting profile.
    pub fn start_from<'a, B>(
        &'a self,
        device: &'a DeviceInfo,
        original: PerformanceProfile,
        bench: &'a mut B,
    ) -> TuningResult<OptimizationRun<'a, B>>
    where
        B: Benchmark + ?Sized,
    {
        let permit = self.busy.try_acquire()?;
        tracing::debug!(
            profile = %original.rank,
            max_iterations = self.config.max_iterations,
            "Optimization run starting"
        );
        Ok(OptimizationRun::new(
            permit,
            &self.config,
            device,
            original,
            bench,
        ))
    }

    /// Run a full optimization synchronously.
    ///
    /// Returns [`TuningError::Cancelled`] if `cancel` fires between passes.
    /// A failing benchmark yields `Ok` with `success == false`.
    pub fn optimize<B>(
        &self,
        device: &DeviceInfo,
        bench: &mut B,
        cancel: &CancellationToken,
    ) -> TuningResult<OptimizationResult>
    where
        B: Benchmark + ?Sized,
    {
        let mut run = self.start(device, bench)?;
        while !run.is_done() {
            if cancel.is_cancelled() {
                tracing::info!(iterations = run.iterations(), "Optimization cancelled");
                return Err(TuningError::Cancelled {
                    operation: OPERATION,
                });
            }
            run.step();
        }
        Ok(run.finish())
    }

    /// Like [`optimize`](Self::optimize), yielding to the scheduler between passes.
    pub async fn optimize_async<B>(
        &self,
        device: &DeviceInfo,
        bench: &mut B,
        cancel: &CancellationToken,
    ) -> TuningResult<OptimizationResult>
    where
        B: Benchmark + ?Sized,
    {
        let mut run = self.start(device, bench)?;
        while !run.is_done() {
            if cancel.is_cancelled() {
                tracing::info!(iterations = run.iterations(), "Optimization cancelled");
                return Err(TuningError::Cancelled {
                    operation: OPERATION,
                });
            }
            run.step();
            tokio::task::yield_now().await;
        }
        Ok(run.finish())
    }
}

/// Progress after one [`OptimizationRun::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunProgress {
    /// More passes remain.
    Running { iteration: u32, best_score: f64 },
    /// The run finished; call `finish`.
    Done,
}

/// An in-flight optimization. Holds the optimizer's busy flag until dropped.
pub struct OptimizationRun<'a, B: Benchmark + ?Sized> {
    _permit: BusyPermit<'a>,
    config: &'a OptimizationConfig,
    device: &'a DeviceInfo,
    bench: &'a mut B,
    rng: StdRng,

    original: PerformanceProfile,
    baseline_score: Option<f64>,
    current: ParameterVector,
    best: ParameterVector,
    best_score: f64,
    iterations: u32,
    converged: bool,
    error: Option<String>,
    done: bool,
}

impl<'a, B: Benchmark + ?Sized> OptimizationRun<'a, B> {
    fn new(
        permit: BusyPermit<'a>,
        config: &'a OptimizationConfig,
        device: &'a DeviceInfo,
        original: PerformanceProfile,
        bench: &'a mut B,
    ) -> Self {
        let start = ParameterVector::from_profile(&original).clamped();
        Self {
            _permit: permit,
            config,
            device,
            bench,
            rng: StdRng::seed_from_u64(config.seed),
            original,
            baseline_score: None,
            current: start,
            best: start,
            best_score: 0.0,
            iterations: 0,
            converged: false,
            error: None,
            done: false,
        }
    }

    /// Perform one benchmark pass (the baseline on the first call).
    pub fn step(&mut self) -> RunProgress {
        if self.done {
            return RunProgress::Done;
        }

        let Some(baseline) = self.baseline_score else {
            return self.run_baseline();
        };

        let candidate = self.next_candidate();
        let profile = candidate.apply_to(&self.original);
        let metrics = match run_checked(&mut *self.bench, self.device, &profile) {
            Ok(metrics) => metrics,
            Err(e) => return self.fail(e.to_string()),
        };
        self.iterations += 1;

        let score = metrics.score();
        if score > self.best_score + self.config.min_improvement {
            tracing::debug!(
                iteration = self.iterations,
                from = format!("{:.4}", self.best_score),
                to = format!("{:.4}", score),
                "New best candidate"
            );
            self.best = candidate;
            self.best_score = score;
        }

        self.current = self
            .current
            .map(|p, cur| MOMENTUM * cur + (1.0 - MOMENTUM) * candidate.get(p))
            .clamped();

        if self.iterations >= self.config.warmup_iterations
            && relative_gain(baseline, self.best_score) < self.config.convergence_threshold
        {
            self.converged = true;
            self.done = true;
        } else if self.iterations >= self.config.max_iterations {
            self.done = true;
        }

        if self.done {
            RunProgress::Done
        } else {
            RunProgress::Running {
                iteration: self.iterations,
                best_score: self.best_score,
            }
        }
    }

    fn run_baseline(&mut self) -> RunProgress {
        let profile = self.best.apply_to(&self.original);
        match run_checked(&mut *self.bench, self.device, &profile) {
            Ok(metrics) => {
                let score = metrics.score();
                self.baseline_score = Some(score);
                self.best_score = score;
                RunProgress::Running {
                    iteration: 0,
                    best_score: score,
                }
            }
            Err(e) => self.fail(e.to_string()),
        }
    }

    fn next_candidate(&mut self) -> ParameterVector {
        let explore = self.rng.random::<f64>() < self.config.exploration_rate;
        let candidate = if explore {
            let mut candidate = ParameterVector::default();
            for param in TunableParameter::ALL {
                let bounds = param.bounds();
                candidate.set(param, self.rng.random_range(bounds.min..=bounds.max));
            }
            candidate
        } else {
            let lr = self.config.learning_rate;
            let best = self.best;
            self.current.map(|p, cur| {
                if cur.abs() < f64::EPSILON {
                    cur
                } else {
                    cur + lr * (best.get(p) - cur) / cur
                }
            })
        };
        candidate.clamped()
    }

    fn fail(&mut self, error: String) -> RunProgress {
        tracing::warn!(
            iteration = self.iterations,
            error = %error,
            "Optimization benchmark failed"
        );
        self.error = Some(error);
        self.done = true;
        RunProgress::Done
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Passes run after the baseline.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Best score so far, `None` before the baseline pass.
    pub fn best_score(&self) -> Option<f64> {
        self.baseline_score.map(|_| self.best_score)
    }

    pub fn baseline_score(&self) -> Option<f64> {
        self.baseline_score
    }

    /// Build the result. Releases the busy flag.
    pub fn finish(self) -> OptimizationResult {
        if let Some(error) = self.error {
            return OptimizationResult::failed(self.original, error, self.iterations);
        }

        let baseline_score = self.baseline_score.unwrap_or(0.0);
        let optimized = self
            .best
            .snapped()
            .apply_to(&self.original)
            .renamed(format!("{}-optimized", self.original.rank));
        let improvement = ImprovementEstimate::from_profiles(&self.original, &optimized);
        let confidence = confidence(self.iterations, self.converged, improvement.overall);
        let recommendations = recommendations(&self.original, &optimized);

        tracing::info!(
            profile = %self.original.rank,
            iterations = self.iterations,
            converged = self.converged,
            baseline = format!("{:.3}", baseline_score),
            best = format!("{:.3}", self.best_score),
            confidence = format!("{:.2}", confidence),
            "Optimization complete"
        );

        OptimizationResult {
            original: self.original,
            optimized,
            improvement,
            recommendations,
            confidence,
            iterations: self.iterations,
            converged: self.converged,
            baseline_score,
            best_score: self.best_score,
            success: true,
            error: None,
            timestamp_ms: crate::clock::unix_millis(),
        }
    }
}

fn relative_gain(baseline: f64, best: f64) -> f64 {
    if baseline <= 0.0 {
        return if best > baseline { f64::INFINITY } else { 0.0 };
    }
    (best - baseline) / baseline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::{BenchmarkError, BenchmarkMetrics, SyntheticBenchmark};
    use crate::device::DeviceHints;

    fn device(capability: f64) -> DeviceInfo {
        DeviceHints::new("test")
            .with_memory_gb(4.0)
            .with_cores(4)
            .into_device_info()
            .with_capability(capability)
    }

    fn exploring_config() -> OptimizationConfig {
        OptimizationConfig {
            max_iterations: 40,
            exploration_rate: 0.5,
            convergence_threshold: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_invalid_config_rejected_up_front() {
        let result = ParameterOptimizer::new(OptimizationConfig::default().with_max_iterations(0));
        assert!(matches!(result, Err(TuningError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_best_score_never_decreases() {
        let optimizer = ParameterOptimizer::new(exploring_config()).unwrap();
        let device = device(0.5);
        let mut bench = SyntheticBenchmark::new(3);
        let mut run = optimizer.start(&device, &mut bench).unwrap();

        let mut previous = f64::NEG_INFINITY;
        while !run.is_done() {
            run.step();
            if let Some(best) = run.best_score() {
                assert!(best >= previous, "best score dropped: {} < {}", best, previous);
                previous = best;
            }
        }
        let result = run.finish();
        assert!(result.success);
        assert!(result.best_score >= result.baseline_score);
    }

    #[test]
    fn test_optimized_profile_is_on_grid() {
        let optimizer = ParameterOptimizer::new(exploring_config()).unwrap();
        let device = device(0.5);
        let mut bench = SyntheticBenchmark::new(11);
        let result = optimizer
            .optimize(&device, &mut bench, &CancellationToken::new())
            .unwrap();

        for param in TunableParameter::ALL {
            let bounds = param.bounds();
            let value = param.get(&result.optimized);
            assert!(bounds.contains(value), "{} = {} out of bounds", param, value);
            assert_eq!(bounds.snap(value), value, "{} = {} off grid", param, value);
        }
        assert!(result.improvement.estimated);
        assert!(result.confidence >= 0.5 && result.confidence <= 1.0);
        assert!(!result.recommendations.is_empty());
    }

    #[test]
    fn test_same_seed_is_reproducible() {
        let optimizer = ParameterOptimizer::new(exploring_config()).unwrap();
        let device = device(0.6);
        let cancel = CancellationToken::new();

        let a = optimizer
            .optimize(&device, &mut SyntheticBenchmark::new(5), &cancel)
            .unwrap();
        let b = optimizer
            .optimize(&device, &mut SyntheticBenchmark::new(5), &cancel)
            .unwrap();
        assert_eq!(a.optimized, b.optimized);
        assert_eq!(a.best_score, b.best_score);
    }

    #[test]
    fn test_stops_after_warmup_without_gain() {
        let config = OptimizationConfig {
            exploration_rate: 0.0,
            ..Default::default()
        };
        let optimizer = ParameterOptimizer::new(config).unwrap();
        let device = device(0.5);
        // Flat benchmark: nothing can beat the baseline.
        let mut bench = |_: &DeviceInfo, _: &PerformanceProfile| {
            Ok::<_, BenchmarkError>(BenchmarkMetrics::new(45.0, 20.0, 22.0))
        };

        let result = optimizer
            .optimize(&device, &mut bench, &CancellationToken::new())
            .unwrap();
        assert!(result.converged);
        assert_eq!(result.iterations, 3);
        assert_eq!(result.optimized.throttle_interval_ms, result.original.throttle_interval_ms);
    }

    #[test]
    fn test_benchmark_failure_yields_unsuccessful_result() {
        let optimizer = ParameterOptimizer::new(exploring_config()).unwrap();
        let device = device(0.5);
        let mut bench = SyntheticBenchmark::new(1).failing_after(4);

        let result = optimizer
            .optimize(&device, &mut bench, &CancellationToken::new())
            .unwrap();
        assert!(!result.success);
        assert!(result.error.unwrap().contains("aborted"));
        assert_eq!(result.optimized, result.original);
        assert!(!optimizer.is_running());
    }

    #[test]
    fn test_concurrent_run_rejected() {
        let optimizer = ParameterOptimizer::new(OptimizationConfig::default()).unwrap();
        let device = device(0.5);
        let mut first = SyntheticBenchmark::new(1);
        let mut second = SyntheticBenchmark::new(2);

        let run = optimizer.start(&device, &mut first).unwrap();
        let err = optimizer
            .optimize(&device, &mut second, &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, TuningError::ConcurrentOperation { .. }));
        assert_eq!(second.runs(), 0);

        drop(run);
        assert!(!optimizer.is_running());
    }

    #[test]
    fn test_cancelled_run_is_discarded() {
        let optimizer = ParameterOptimizer::new(exploring_config()).unwrap();
        let device = device(0.5);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = optimizer
            .optimize(&device, &mut SyntheticBenchmark::new(1), &cancel)
            .unwrap_err();
        assert!(matches!(err, TuningError::Cancelled { .. }));
        assert!(!optimizer.is_running());
    }

    #[tokio::test]
    async fn test_async_matches_sync() {
        let optimizer = ParameterOptimizer::new(exploring_config()).unwrap();
        let device = device(0.4);
        let cancel = CancellationToken::new();

        let sync = optimizer
            .optimize(&device, &mut SyntheticBenchmark::new(9), &cancel)
            .unwrap();
        let async_result = optimizer
            .optimize_async(&device, &mut SyntheticBenchmark::new(9), &cancel)
            .await
            .unwrap();
        assert_eq!(sync.optimized, async_result.optimized);
        assert_eq!(sync.iterations, async_result.iterations);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(32))]

            #[test]
            fn test_best_tracker_is_monotonic(
                seed in any::<u64>(),
                bench_seed in any::<u64>(),
                capability in 0.0..1.0_f64,
                exploration in 0.0..1.0_f64,
            ) {
                let config = OptimizationConfig {
                    max_iterations: 20,
                    exploration_rate: exploration,
                    convergence_threshold: 0.0,
                    seed,
                    ..Default::default()
                };
                let optimizer = ParameterOptimizer::new(config).unwrap();
                let device = device(capability);
                let mut bench = SyntheticBenchmark::new(bench_seed).with_noise(0.1);
                let mut run = optimizer.start(&device, &mut bench).unwrap();

                let mut previous = f64::NEG_INFINITY;
                while !run.is_done() {
                    run.step();
                    if let Some(best) = run.best_score() {
                        prop_assert!(best >= previous);
                        previous = best;
                    }
                }
            }
        }
    }
}
