//! Learner configuration.

use serde::{Deserialize, Serialize};

use crate::error::{TuningError, TuningResult};

/// Tuning knobs for [`CrossDeviceLearner`](super::CrossDeviceLearner).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    /// Weight of a new batch when blending global statistics.
    pub learning_rate: f64,

    /// K-means stops once no centroid moves further than this.
    pub convergence_threshold: f64,

    /// A device joins a cluster above this similarity.
    pub join_similarity: f64,

    /// A cluster is recommended above this similarity.
    pub match_similarity: f64,

    pub max_kmeans_iterations: u32,

    /// Upper bound on `k` when re-clustering.
    pub max_clusters: usize,

    /// Seed for k-means initialization.
    pub seed: u64,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            convergence_threshold: 0.01,
            join_similarity: 0.7,
            match_similarity: 0.6,
            max_kmeans_iterations: 100,
            max_clusters: 5,
            seed: 42,
        }
    }
}

impl LearnerConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_similarity(mut self, join: f64, matching: f64) -> Self {
        self.join_similarity = join;
        self.match_similarity = matching;
        self
    }

    pub fn validate(&self) -> TuningResult<()> {
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(TuningError::invalid_config(format!(
                "learner learning_rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        if !self.convergence_threshold.is_finite() || self.convergence_threshold < 0.0 {
            return Err(TuningError::invalid_config(format!(
                "learner convergence_threshold must be finite and >= 0, got {}",
                self.convergence_threshold
            )));
        }
        for (name, value) in [
            ("join_similarity", self.join_similarity),
            ("match_similarity", self.match_similarity),
        ] {
            if !value.is_finite() || value > 1.0 {
                return Err(TuningError::invalid_config(format!(
                    "learner {} must be finite and <= 1, got {}",
                    name, value
                )));
            }
        }
        if self.max_kmeans_iterations == 0 {
            return Err(TuningError::invalid_config(
                "learner max_kmeans_iterations must be at least 1",
            ));
        }
        if self.max_clusters == 0 {
            return Err(TuningError::invalid_config(
                "learner max_clusters must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(LearnerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range() {
        let config = LearnerConfig {
            learning_rate: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = LearnerConfig::default().with_similarity(f64::NAN, 0.6);
        assert!(config.validate().is_err());

        let config = LearnerConfig {
            max_clusters: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
