//! Interaction-aware debouncer.
//!
//! Each trigger replaces any pending payload and pushes its deadline out by
//! the effective delay. The host polls with the current instant and receives
//! the payload once the quiet period has elapsed.

use std::time::{Duration, Instant};

const BUSY_LEVEL: f64 = 0.8;
const IDLE_LEVEL: f64 = 0.3;
const IDLE_FACTOR: f64 = 1.5;

/// Debouncer configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DebounceConfig {
    /// Delay used at moderate interaction levels (ms).
    pub base_delay_ms: f64,
    /// Floor for the halved delay (ms).
    pub min_delay_ms: f64,
    /// Cap for the grown delay (ms).
    pub max_delay_ms: f64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 100.0,
            min_delay_ms: 25.0,
            max_delay_ms: 300.0,
        }
    }
}

#[derive(Debug)]
struct Pending<T> {
    payload: T,
    due: Instant,
}

/// Debouncer whose delay follows the interaction level.
#[derive(Debug)]
pub struct DynamicDebouncer<T> {
    config: DebounceConfig,
    effective_delay_ms: f64,
    pending: Option<Pending<T>>,
}

impl<T> DynamicDebouncer<T> {
    pub fn new(config: DebounceConfig) -> Self {
        let effective_delay_ms = config.base_delay_ms.max(0.0);
        Self {
            config,
            effective_delay_ms,
            pending: None,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DebounceConfig::default())
    }

    /// Delay for an interaction level, always derived from the base delay.
    pub fn delay_for(&self, interaction_level: f64) -> f64 {
        let base = self.config.base_delay_ms.max(0.0);
        if interaction_level > BUSY_LEVEL {
            (base / 2.0).max(self.config.min_delay_ms)
        } else if interaction_level < IDLE_LEVEL {
            (base * IDLE_FACTOR).min(self.config.max_delay_ms)
        } else {
            base
        }
    }

    /// Schedule `payload`, replacing whatever was pending.
    ///
    /// Returns the instant at which the payload becomes due.
    pub fn trigger(&mut self, now: Instant, interaction_level: f64, payload: T) -> Instant {
        self.effective_delay_ms = self.delay_for(interaction_level);
        let due = now + self.effective_delay();
        if self.pending.is_some() {
            tracing::trace!(delay_ms = self.effective_delay_ms, "Debounce rescheduled");
        }
        self.pending = Some(Pending { payload, due });
        due
    }

    /// Take the pending payload if its quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some(pending) if now >= pending.due => self.pending.take().map(|p| p.payload),
            _ => None,
        }
    }

    /// Drop the pending payload, returning it.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.payload)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Deadline of the pending payload.
    pub fn due_at(&self) -> Option<Instant> {
        self.pending.as_ref().map(|p| p.due)
    }

    /// Change the base delay (e.g. after a profile change).
    pub fn set_base_delay(&mut self, base_delay_ms: f64) {
        self.config.base_delay_ms = base_delay_ms;
        self.effective_delay_ms = base_delay_ms.max(0.0);
    }

    /// Delay applied by the most recent trigger.
    pub fn effective_delay_ms(&self) -> f64 {
        self.effective_delay_ms
    }

    pub fn effective_delay(&self) -> Duration {
        Duration::from_secs_f64(self.effective_delay_ms.max(0.0) / 1000.0)
    }

    pub fn config(&self) -> &DebounceConfig {
        &self.config
    }
}

impl<T> Default for DynamicDebouncer<T> {
    fn default() -> Self {
        Self::with_defaults()
    }
}
