//! Optimizer configuration.

use serde::{Deserialize, Serialize};

use crate::error::{TuningError, TuningResult};

/// Upper limit accepted for `max_iterations`.
pub const MAX_ITERATIONS_LIMIT: u32 = 10_000;

/// Settings for one optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationConfig {
    /// Iteration cap (benchmark passes after the baseline).
    pub max_iterations: u32,

    /// Stop once relative improvement over baseline is below this.
    pub convergence_threshold: f64,

    /// Gradient step size.
    pub learning_rate: f64,

    /// Probability of a random exploration step.
    pub exploration_rate: f64,

    /// Score gain required to replace the best candidate.
    pub min_improvement: f64,

    /// Iterations before the convergence check applies.
    pub warmup_iterations: u32,

    /// Seed for exploration draws.
    pub seed: u64,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            convergence_threshold: 0.01,
            learning_rate: 0.1,
            exploration_rate: 0.2,
            min_improvement: 0.001,
            warmup_iterations: 3,
            seed: 42,
        }
    }
}

impl OptimizationConfig {
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_exploration_rate(mut self, exploration_rate: f64) -> Self {
        self.exploration_rate = exploration_rate;
        self
    }

    pub fn with_warmup(mut self, warmup_iterations: u32) -> Self {
        self.warmup_iterations = warmup_iterations;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Reject values outside sane bounds before any run starts.
    pub fn validate(&self) -> TuningResult<()> {
        if self.max_iterations == 0 || self.max_iterations > MAX_ITERATIONS_LIMIT {
            return Err(TuningError::invalid_config(format!(
                "max_iterations must be in 1..={}, got {}",
                MAX_ITERATIONS_LIMIT, self.max_iterations
            )));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(TuningError::invalid_config(format!(
                "learning_rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.exploration_rate) {
            return Err(TuningError::invalid_config(format!(
                "exploration_rate must be in [0, 1], got {}",
                self.exploration_rate
            )));
        }
        if !self.convergence_threshold.is_finite() || self.convergence_threshold < 0.0 {
            return Err(TuningError::invalid_config(format!(
                "convergence_threshold must be finite and >= 0, got {}",
                self.convergence_threshold
            )));
        }
        if !self.min_improvement.is_finite() || self.min_improvement < 0.0 {
            return Err(TuningError::invalid_config(format!(
                "min_improvement must be finite and >= 0, got {}",
                self.min_improvement
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(OptimizationConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let config = OptimizationConfig::default().with_max_iterations(0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_iterations"));
    }

    #[test]
    fn test_rates_rejected() {
        let mut config = OptimizationConfig::default();
        config.learning_rate = 0.0;
        assert!(config.validate().is_err());

        let config = OptimizationConfig::default().with_exploration_rate(1.5);
        assert!(config.validate().is_err());

        let mut config = OptimizationConfig::default();
        config.min_improvement = f64::NAN;
        assert!(config.validate().is_err());
    }
}
