//! Bounded logs of past optimization and validation runs.
//!
//! Both logs keep the most recent [`MAX_HISTORY`] records and are persisted
//! under their own store keys.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::device::DeviceInfo;
use crate::error::StoreError;
use crate::optimizer::OptimizationResult;
use crate::store::{self, KeyValueStore, Persisted, OPTIMIZATION_HISTORY_KEY, VALIDATION_HISTORY_KEY};
use crate::validator::ValidationResult;

/// Records kept per log.
pub const MAX_HISTORY: usize = 100;

/// An optimization result and the device it ran on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRecord {
    pub device: DeviceInfo,
    pub result: OptimizationResult,
}

/// One validation sweep and the device it ran on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationRecord {
    pub device: DeviceInfo,
    pub results: Vec<ValidationResult>,

    /// Unix milliseconds.
    pub timestamp_ms: i64,
}

/// Persisted optimization log, oldest first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptimizationLog(pub VecDeque<OptimizationRecord>);

/// Persisted validation log, oldest first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationLog(pub VecDeque<ValidationRecord>);

impl Persisted for OptimizationLog {
    const KEY: &'static str = OPTIMIZATION_HISTORY_KEY;

    fn check(&self) -> Result<(), StoreError> {
        check_len(Self::KEY, self.0.len())
    }
}

impl Persisted for ValidationLog {
    const KEY: &'static str = VALIDATION_HISTORY_KEY;

    fn check(&self) -> Result<(), StoreError> {
        check_len(Self::KEY, self.0.len())
    }
}

fn check_len(key: &str, len: usize) -> Result<(), StoreError> {
    if len > MAX_HISTORY {
        return Err(StoreError::Malformed {
            key: key.to_string(),
            reason: format!("{} records exceed the limit of {}", len, MAX_HISTORY),
        });
    }
    Ok(())
}

fn push_bounded<T>(log: &mut VecDeque<T>, record: T) {
    log.push_back(record);
    while log.len() > MAX_HISTORY {
        log.pop_front();
    }
}

/// Both logs together.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TuningHistory {
    optimizations: OptimizationLog,
    validations: ValidationLog,
}

impl TuningHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load both logs. Unreadable logs start empty.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        Self {
            optimizations: store::load_or_default(store),
            validations: store::load_or_default(store),
        }
    }

    pub fn save_optimizations(&self, store: &dyn KeyValueStore) -> Result<(), StoreError> {
        store::save(store, &self.optimizations)
    }

    pub fn save_validations(&self, store: &dyn KeyValueStore) -> Result<(), StoreError> {
        store::save(store, &self.validations)
    }

    pub fn record_optimization(&mut self, device: &DeviceInfo, result: &OptimizationResult) {
        push_bounded(
            &mut self.optimizations.0,
            OptimizationRecord {
                device: device.clone(),
                result: result.clone(),
            },
        );
    }

    pub fn record_validation(&mut self, device: &DeviceInfo, results: &[ValidationResult]) {
        push_bounded(
            &mut self.validations.0,
            ValidationRecord {
                device: device.clone(),
                results: results.to_vec(),
                timestamp_ms: crate::clock::unix_millis(),
            },
        );
    }

    /// Optimization records, oldest first.
    pub fn optimizations(&self) -> impl Iterator<Item = &OptimizationRecord> {
        self.optimizations.0.iter()
    }

    /// Validation records, oldest first.
    pub fn validations(&self) -> impl Iterator<Item = &ValidationRecord> {
        self.validations.0.iter()
    }

    pub fn latest_optimization(&self) -> Option<&OptimizationRecord> {
        self.optimizations.0.back()
    }

    pub fn latest_validation(&self) -> Option<&ValidationRecord> {
        self.validations.0.back()
    }

    pub fn optimization_count(&self) -> usize {
        self.optimizations.0.len()
    }

    pub fn validation_count(&self) -> usize {
        self.validations.0.len()
    }
}
