//! Engine configuration.
//!
//! [`EngineConfig`] bundles the configuration of every component. All
//! values have defaults; an INI file only needs the keys it changes.
//!
//! # Example Configuration (INI)
//!
//! ```ini
//! [controller]
//! promote_threshold = 0.9
//! demote_threshold = 0.7
//! sample_window_secs = 10
//!
//! [budget]
//! frame_length_ms = 16
//!
//! [throttle]
//! min_interval_ms = 8
//! max_interval_ms = 50
//!
//! [optimizer]
//! max_iterations = 50
//! exploration_rate = 0.2
//!
//! [validator]
//! test_iterations = 5
//! parameters = throttle_interval_ms, debounce_delay_ms
//!
//! [learner]
//! join_similarity = 0.7
//!
//! [logging]
//! filter = adaptune=debug
//! file = /var/log/adaptune.log
//! ```

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};

use crate::controller::ControllerConfig;
use crate::error::{ConfigError, TuningResult};
use crate::learning::LearnerConfig;
use crate::logging::LoggingConfig;
use crate::optimizer::{OptimizationConfig, TunableParameter};
use crate::validator::ValidationConfig;

/// Configuration for a [`TuningEngine`](crate::engine::TuningEngine).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EngineConfig {
    pub controller: ControllerConfig,
    pub optimizer: OptimizationConfig,
    pub validator: ValidationConfig,
    pub learner: LearnerConfig,
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ini_str(&text)?;
        tracing::debug!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Parse and validate INI text. Missing keys keep their defaults.
    pub fn from_ini_str(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut config = Self::default();

        if let Some(s) = section(&ini, "controller") {
            let c = &mut config.controller;
            s.read("promote_threshold", &mut c.promote_threshold)?;
            s.read("demote_threshold", &mut c.demote_threshold)?;
            s.read("busy_interaction", &mut c.busy_interaction)?;
            s.read("idle_interaction", &mut c.idle_interaction)?;
            s.read("busy_factor", &mut c.busy_factor)?;
            s.read("idle_factor", &mut c.idle_factor)?;
            s.read_secs("sample_window_secs", &mut c.sample_window)?;
            s.read("max_samples", &mut c.max_samples)?;
            s.read_secs("interaction_window_secs", &mut c.interaction_window)?;
        }

        if let Some(s) = section(&ini, "budget") {
            s.read_millis("frame_length_ms", &mut config.controller.frame_length)?;
        }

        if let Some(s) = section(&ini, "throttle") {
            let t = &mut config.controller.throttle;
            s.read("min_interval_ms", &mut t.min_interval_ms)?;
            s.read("max_interval_ms", &mut t.max_interval_ms)?;
            s.read("threshold", &mut t.threshold)?;
        }

        if let Some(s) = section(&ini, "debounce") {
            let d = &mut config.controller.debounce;
            s.read("min_delay_ms", &mut d.min_delay_ms)?;
            s.read("max_delay_ms", &mut d.max_delay_ms)?;
        }

        if let Some(s) = section(&ini, "optimizer") {
            let o = &mut config.optimizer;
            s.read("max_iterations", &mut o.max_iterations)?;
            s.read("convergence_threshold", &mut o.convergence_threshold)?;
            s.read("learning_rate", &mut o.learning_rate)?;
            s.read("exploration_rate", &mut o.exploration_rate)?;
            s.read("min_improvement", &mut o.min_improvement)?;
            s.read("warmup_iterations", &mut o.warmup_iterations)?;
            s.read("seed", &mut o.seed)?;
        }

        if let Some(s) = section(&ini, "validator") {
            s.read("test_iterations", &mut config.validator.test_iterations)?;
            if let Some(raw) = s.props.get("parameters") {
                config.validator.parameters = parse_parameters(raw)?;
            }
        }

        if let Some(s) = section(&ini, "learner") {
            let l = &mut config.learner;
            s.read("learning_rate", &mut l.learning_rate)?;
            s.read("convergence_threshold", &mut l.convergence_threshold)?;
            s.read("join_similarity", &mut l.join_similarity)?;
            s.read("match_similarity", &mut l.match_similarity)?;
            s.read("max_kmeans_iterations", &mut l.max_kmeans_iterations)?;
            s.read("max_clusters", &mut l.max_clusters)?;
            s.read("seed", &mut l.seed)?;
        }

        if let Some(s) = section(&ini, "logging") {
            if let Some(filter) = s.props.get("filter") {
                config.logging.filter = filter.trim().to_string();
            }
            if let Some(file) = s.props.get("file") {
                let file = file.trim();
                config.logging.file = (!file.is_empty()).then(|| PathBuf::from(file));
            }
            s.read("ansi", &mut config.logging.ansi)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate every component configuration.
    pub fn validate(&self) -> TuningResult<()> {
        self.controller.validate()?;
        self.optimizer.validate()?;
        self.validator.validate()?;
        self.learner.validate()?;
        Ok(())
    }
}

/// One INI section with typed accessors.
struct Section<'a> {
    name: &'static str,
    props: &'a Properties,
}

fn section<'a>(ini: &'a Ini, name: &'static str) -> Option<Section<'a>> {
    ini.section(Some(name)).map(|props| Section { name, props })
}

impl Section<'_> {
    /// Overwrite `target` if `key` is present.
    fn read<T>(&self, key: &str, target: &mut T) -> Result<(), ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        if let Some(raw) = self.props.get(key) {
            *target = raw.trim().parse().map_err(|_| self.invalid(key, raw))?;
        }
        Ok(())
    }

    fn read_secs(&self, key: &str, target: &mut Duration) -> Result<(), ConfigError> {
        self.read_duration(key, target, Duration::try_from_secs_f64)
    }

    fn read_millis(&self, key: &str, target: &mut Duration) -> Result<(), ConfigError> {
        self.read_duration(key, target, |ms| Duration::try_from_secs_f64(ms / 1000.0))
    }

    fn read_duration<E>(
        &self,
        key: &str,
        target: &mut Duration,
        convert: impl Fn(f64) -> Result<Duration, E>,
    ) -> Result<(), ConfigError> {
        if let Some(raw) = self.props.get(key) {
            let value: f64 = raw.trim().parse().map_err(|_| self.invalid(key, raw))?;
            *target = convert(value).map_err(|_| self.invalid(key, raw))?;
        }
        Ok(())
    }

    fn invalid(&self, key: &str, raw: &str) -> ConfigError {
        ConfigError::InvalidValue {
            section: self.name.to_string(),
            key: key.to_string(),
            value: raw.to_string(),
        }
    }
}

/// Comma-separated parameter names.
fn parse_parameters(raw: &str) -> Result<Vec<TunableParameter>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            TunableParameter::from_name(name).ok_or_else(|| ConfigError::InvalidValue {
                section: "validator".to_string(),
                key: "parameters".to_string(),
                value: name.to_string(),
            })
        })
        .collect()
}
