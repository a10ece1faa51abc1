//! Parameter range validation.
//!
//! For each tunable parameter the validator takes the recommended range of
//! the device's category, benchmarks every grid value a few times, and
//! narrows the range to the contiguous band around the best value.
//!
//! ```text
//! performance = mean(score over test_iterations passes)
//! stability   = max(0, 1 - sqrt(variance))
//! recommended = contiguous values with performance >= 0.9 * best
//! spread      = (best - worst) / best
//! confidence  = 0.5 + min(spread, 0.3) + 0.2 * mean(stability)
//! ```
//!
//! Validation is pure search-and-measure: results are returned to the
//! caller and nothing else is mutated.

mod ranges;

pub use ranges::category_range;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::benchmark::{run_checked, Benchmark};
use crate::busy::{BusyFlag, BusyPermit};
use crate::device::{DeviceCategory, DeviceInfo};
use crate::error::{TuningError, TuningResult};
use crate::optimizer::{ParameterRange, TunableParameter};
use crate::profile::{PerformanceProfile, ProfileCatalog};

/// Fraction of the best performance a value must reach to stay in range.
pub const BAND_FRACTION: f64 = 0.9;

const OPERATION: &str = "validation";

/// Settings for one validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Benchmark passes per tested value.
    pub test_iterations: u32,

    /// Parameters to validate, in order.
    pub parameters: Vec<TunableParameter>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            test_iterations: 5,
            parameters: TunableParameter::ALL.to_vec(),
        }
    }
}

impl ValidationConfig {
    pub fn with_test_iterations(mut self, test_iterations: u32) -> Self {
        self.test_iterations = test_iterations;
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<TunableParameter>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn validate(&self) -> TuningResult<()> {
        if !(1..=100).contains(&self.test_iterations) {
            return Err(TuningError::invalid_config(format!(
                "test_iterations must be in 1..=100, got {}",
                self.test_iterations
            )));
        }
        if self.parameters.is_empty() {
            return Err(TuningError::invalid_config(
                "at least one parameter must be validated",
            ));
        }
        Ok(())
    }
}

/// One tested value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationSample {
    pub value: f64,

    /// Mean benchmark score.
    pub performance: f64,

    /// `max(0, 1 - sqrt(variance))` over the repeated scores.
    pub stability: f64,
}

/// Validation outcome for one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub parameter: TunableParameter,
    pub category: DeviceCategory,
    pub current_range: ParameterRange,
    pub recommended_range: ParameterRange,

    /// 0.0 - 1.0
    pub confidence: f64,
    pub reasoning: String,
    pub samples: Vec<ValidationSample>,

    /// `false` when a benchmark pass failed.
    pub success: bool,
    pub error: Option<String>,

    /// Unix milliseconds.
    pub timestamp_ms: i64,
}

impl ValidationResult {
    /// Best tested value, if any sample was collected.
    pub fn best_sample(&self) -> Option<&ValidationSample> {
        self.samples
            .iter()
            .max_by(|a, b| a.performance.total_cmp(&b.performance))
    }
}

/// Validates parameter ranges, one run at a time.
#[derive(Debug)]
pub struct ParameterValidator {
    config: ValidationConfig,
    catalog: ProfileCatalog,
    busy: BusyFlag,
}

impl ParameterValidator {
    pub fn new(config: ValidationConfig) -> TuningResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            catalog: ProfileCatalog::standard(),
            busy: BusyFlag::new(OPERATION),
        })
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.busy.is_busy()
    }

    /// Begin a run for `device`.
    pub fn start<'a, B>(
        &'a self,
        device: &'a DeviceInfo,
        bench: &'a mut B,
    ) -> TuningResult<ValidationRun<'a, B>>
    where
        B: Benchmark + ?Sized,
    {
        let permit = self.busy.try_acquire()?;
        let category = device.category();
        let base = self.catalog.select(device.capability).clone();
        tracing::debug!(
            category = %category,
            parameters = self.config.parameters.len(),
            "Validation run starting"
        );
        Ok(ValidationRun::new(permit, &self.config, device, category, base, bench))
    }

    /// Validate every configured parameter synchronously.
    pub fn validate<B>(
        &self,
        device: &DeviceInfo,
        bench: &mut B,
        cancel: &CancellationToken,
    ) -> TuningResult<Vec<ValidationResult>>
    where
        B: Benchmark + ?Sized,
    {
        let mut run = self.start(device, bench)?;
        while !run.is_done() {
            if cancel.is_cancelled() {
                tracing::info!("Validation cancelled");
                return Err(TuningError::Cancelled {
                    operation: OPERATION,
                });
            }
            run.step();
        }
        Ok(run.finish())
    }

    /// Like [`validate`](Self::validate), yielding to the scheduler between passes.
    pub async fn validate_async<B>(
        &self,
        device: &DeviceInfo,
        bench: &mut B,
        cancel: &CancellationToken,
    ) -> TuningResult<Vec<ValidationResult>>
    where
        B: Benchmark + ?Sized,
    {
        let mut run = self.start(device, bench)?;
        while !run.is_done() {
            if cancel.is_cancelled() {
                tracing::info!("Validation cancelled");
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

/// Progress after one [`ValidationRun::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValidationProgress {
    Running {
        parameter: TunableParameter,
        completed_passes: usize,
        total_passes: usize,
    },
    Done,
}

/// Sweep state for the parameter currently being validated.
#[derive(Debug)]
struct Sweep {
    parameter: TunableParameter,
    range: ParameterRange,
    values: Vec<f64>,
    value_index: usize,
    scores: Vec<f64>,
    samples: Vec<ValidationSample>,
}

impl Sweep {
    fn new(parameter: TunableParameter, category: DeviceCategory) -> Self {
        let range = category_range(category, parameter);
        Self {
            parameter,
            range,
            values: range.values(),
            value_index: 0,
            scores: Vec::new(),
            samples: Vec::new(),
        }
    }
}

/// An in-flight validation. One benchmark pass per step.
pub struct ValidationRun<'a, B: Benchmark + ?Sized> {
    _permit: BusyPermit<'a>,
    config: &'a ValidationConfig,
    device: &'a DeviceInfo,
    category: DeviceCategory,
    base: PerformanceProfile,
    bench: &'a mut B,

    parameter_index: usize,
    sweep: Option<Sweep>,
    results: Vec<ValidationResult>,
    completed_passes: usize,
    total_passes: usize,
}

impl<'a, B: Benchmark + ?Sized> ValidationRun<'a, B> {
    fn new(
        permit: BusyPermit<'a>,
        config: &'a ValidationConfig,
        device: &'a DeviceInfo,
        category: DeviceCategory,
        base: PerformanceProfile,
        bench: &'a mut B,
    ) -> Self {
        let iterations = config.test_iterations as usize;
        let total_passes = config
            .parameters
            .iter()
            .map(|p| category_range(category, *p).values().len() * iterations)
            .sum();
        let sweep = config.parameters.first().map(|p| Sweep::new(*p, category));

        Self {
            _permit: permit,
            config,
            device,
            category,
            base,
            bench,
            parameter_index: 0,
            sweep,
            results: Vec::new(),
            completed_passes: 0,
            total_passes,
        }
    }

    pub fn is_done(&self) -> bool {
        self.sweep.is_none()
    }

    pub fn category(&self) -> DeviceCategory {
        self.category
    }

    /// Results for parameters finished so far.
    pub fn results(&self) -> &[ValidationResult] {
        &self.results
    }

    /// Run one benchmark pass.
    pub fn step(&mut self) -> ValidationProgress {
        let Some(sweep) = self.sweep.as_mut() else {
            return ValidationProgress::Done;
        };

        let parameter = sweep.parameter;
        let value = sweep.values[sweep.value_index];
        let mut profile = self.base.clone();
        parameter.set(&mut profile, value);

        match run_checked(&mut *self.bench, self.device, &profile) {
            Ok(metrics) => {
                sweep.scores.push(metrics.score());
                self.completed_passes += 1;
            }
            Err(e) => {
                tracing::warn!(
                    parameter = %parameter,
                    value = value,
                    error = %e,
                    "Validation benchmark failed"
                );
                let failed = self.failed_result(e.to_string());
                self.results.push(failed);
                self.advance_parameter();
                return self.progress();
            }
        }

        if sweep.scores.len() >= self.config.test_iterations as usize {
            let (performance, stability) = mean_and_stability(&sweep.scores);
            sweep.samples.push(ValidationSample {
                value,
                performance,
                stability,
            });
            sweep.scores.clear();
            sweep.value_index += 1;

            if sweep.value_index >= sweep.values.len() {
                if let Some(sweep) = self.sweep.take() {
                    let result = summarize(sweep, self.category);
                    tracing::debug!(
                        parameter = %result.parameter,
                        min = result.recommended_range.min,
                        max = result.recommended_range.max,
                        confidence = format!("{:.2}", result.confidence),
                        "Parameter validated"
                    );
                    self.results.push(result);
                }
                self.advance_parameter();
            }
        }

        self.progress()
    }

    fn failed_result(&self, error: String) -> ValidationResult {
        let (parameter, range, samples) = match &self.sweep {
            Some(sweep) => (sweep.parameter, sweep.range, sweep.samples.clone()),
            None => (
                TunableParameter::ThrottleInterval,
                TunableParameter::ThrottleInterval.bounds(),
                Vec::new(),
            ),
        };
        ValidationResult {
            parameter,
            category: self.category,
            current_range: range,
            recommended_range: range,
            confidence: 0.0,
            reasoning: format!("Validation of {} aborted: {}", parameter.label(), error),
            samples,
            success: false,
            error: Some(error),
            timestamp_ms: crate::clock::unix_millis(),
        }
    }

    fn advance_parameter(&mut self) {
        self.parameter_index += 1;
        self.sweep = self
            .config
            .parameters
            .get(self.parameter_index)
            .map(|p| Sweep::new(*p, self.category));
    }

    fn progress(&self) -> ValidationProgress {
        match &self.sweep {
            Some(sweep) => ValidationProgress::Running {
                parameter: sweep.parameter,
                completed_passes: self.completed_passes,
                total_passes: self.total_passes,
            },
            None => ValidationProgress::Done,
        }
    }

    /// Collect the results. Releases the busy flag.
    pub fn finish(self) -> Vec<ValidationResult> {
        tracing::info!(
            category = %self.category,
            parameters = self.results.len(),
            failed = self.results.iter().filter(|r| !r.success).count(),
            "Validation complete"
        );
        self.results
    }
}

fn mean_and_stability(scores: &[f64]) -> (f64, f64) {
    if scores.is_empty() {
        return (0.0, 0.0);
    }
    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    (mean, (1.0 - variance.sqrt()).max(0.0))
}

/// Narrow a finished sweep into a result.
fn summarize(sweep: Sweep, category: DeviceCategory) -> ValidationResult {
    let samples = sweep.samples;
    let best_index = samples
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.performance.total_cmp(&b.performance))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let best = samples.get(best_index).map(|s| s.performance).unwrap_or(0.0);
    let worst = samples
        .iter()
        .map(|s| s.performance)
        .fold(f64::INFINITY, f64::min);
    let floor = best * BAND_FRACTION;

    let mut lo = best_index;
    while lo > 0 && samples[lo - 1].performance >= floor {
        lo -= 1;
    }
    let mut hi = best_index;
    while hi + 1 < samples.len() && samples[hi + 1].performance >= floor {
        hi += 1;
    }

    let recommended_range = match (samples.get(lo), samples.get(hi)) {
        (Some(low), Some(high)) => ParameterRange::new(low.value, high.value, sweep.range.step),
        _ => sweep.range,
    };

    let spread = if best > 0.0 && worst.is_finite() {
        (best - worst) / best
    } else {
        0.0
    };
    let avg_stability = if samples.is_empty() {
        0.0
    } else {
        samples.iter().map(|s| s.stability).sum::<f64>() / samples.len() as f64
    };
    let confidence = (0.5 + spread.min(0.3) + avg_stability * 0.2).min(1.0);

    let parameter = sweep.parameter;
    let unit = parameter.unit();
    let reasoning = match samples.get(best_index) {
        Some(best_sample) => format!(
            "Tested {} values of {} on a {} device; best {}{} scored {:.3}; values within {:.0}% of best span {}{}-{}{}",
            samples.len(),
            parameter.label(),
            category,
            best_sample.value,
            unit,
            best,
            BAND_FRACTION * 100.0,
            recommended_range.min,
            unit,
            recommended_range.max,
            unit
        ),
        None => format!("No values of {} were tested", parameter.label()),
    };

    ValidationResult {
        parameter,
        category,
        current_range: sweep.range,
        recommended_range,
        confidence,
        reasoning,
        samples,
        success: true,
        error: None,
        timestamp_ms: crate::clock::unix_millis(),
    }
}
