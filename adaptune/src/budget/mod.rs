//! Per-frame admission control.
//!
//! The budget manager tracks two independent allowances per frame: one for
//! frame work (animations, layout) and one for event handling. Callers ask
//! before doing optional work and debit what they actually spent.
//!
//! This is advisory only. A rejected request is never queued or retried;
//! the caller decides whether to defer or skip (e.g. drop a ripple effect).
//!
//! # Frame Cycle
//!
//! ```text
//! reset ──► can_execute_*(estimate) ──► record_*_time(actual) ──► ... ──► reset
//!   ▲                                                                    │
//!   └──────────────────────── frame length elapsed ─────────────────────┘
//! ```

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::profile::PerformanceProfile;

/// Length of one frame at 60 Hz.
pub const DEFAULT_FRAME_LENGTH: Duration = Duration::from_millis(16);

/// Budget configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetConfig {
    /// Frame-work allowance per frame (ms).
    pub frame_budget_ms: f64,

    /// Event-work allowance per frame (ms).
    pub event_budget_ms: f64,

    /// Automatic reset period.
    pub frame_length: Duration,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            frame_budget_ms: 8.0,
            event_budget_ms: 4.0,
            frame_length: DEFAULT_FRAME_LENGTH,
        }
    }
}

impl BudgetConfig {
    /// Budgets taken from a profile.
    pub fn from_profile(profile: &PerformanceProfile) -> Self {
        Self {
            frame_budget_ms: profile.animation_budget_ms,
            event_budget_ms: profile.event_budget_ms,
            ..Default::default()
        }
    }
}

/// Snapshot of the remaining budgets for the UI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub frame_budget_remaining_ms: f64,
    pub event_budget_remaining_ms: f64,
    pub interaction_level: f64,
}

/// Tracks frame and event work against per-frame budgets.
#[derive(Debug)]
pub struct PerformanceBudgetManager {
    frame_budget_ms: f64,
    event_budget_ms: f64,
    frame_length: Duration,
    frame_used_ms: f64,
    event_used_ms: f64,
    frame_started: Option<Instant>,
}

impl PerformanceBudgetManager {
    pub fn new(config: &BudgetConfig) -> Self {
        Self {
            frame_budget_ms: config.frame_budget_ms.max(0.0),
            event_budget_ms: config.event_budget_ms.max(0.0),
            frame_length: config.frame_length,
            frame_used_ms: 0.0,
            event_used_ms: 0.0,
            frame_started: None,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(&BudgetConfig::default())
    }

    /// Change the allowances (e.g. after a profile change). Usage is kept.
    pub fn set_budgets(&mut self, frame_budget_ms: f64, event_budget_ms: f64) {
        self.frame_budget_ms = frame_budget_ms.max(0.0);
        self.event_budget_ms = event_budget_ms.max(0.0);
    }

    /// Zero both usage counters.
    pub fn reset(&mut self) {
        self.frame_used_ms = 0.0;
        self.event_used_ms = 0.0;
    }

    /// Reset if a full frame has elapsed since the current frame started.
    ///
    /// Returns `true` when a reset happened.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.frame_started {
            Some(started) if now.saturating_duration_since(started) < self.frame_length => false,
            _ => {
                self.frame_started = Some(now);
                self.reset();
                true
            }
        }
    }

    pub fn can_execute_frame(&self, estimated_ms: f64) -> bool {
        self.frame_remaining_ms() >= estimated_ms
    }

    pub fn can_execute_event(&self, estimated_ms: f64) -> bool {
        self.event_remaining_ms() >= estimated_ms
    }

    /// Debit frame work actually performed.
    pub fn record_frame_time(&mut self, actual_ms: f64) {
        if actual_ms.is_finite() && actual_ms > 0.0 {
            self.frame_used_ms += actual_ms;
        }
    }

    /// Debit event work actually performed.
    pub fn record_event_time(&mut self, actual_ms: f64) {
        if actual_ms.is_finite() && actual_ms > 0.0 {
            self.event_used_ms += actual_ms;
        }
    }

    /// Remaining frame allowance, never negative.
    pub fn frame_remaining_ms(&self) -> f64 {
        (self.frame_budget_ms - self.frame_used_ms).max(0.0)
    }

    /// Remaining event allowance, never negative.
    pub fn event_remaining_ms(&self) -> f64 {
        (self.event_budget_ms - self.event_used_ms).max(0.0)
    }

    pub fn frame_budget_ms(&self) -> f64 {
        self.frame_budget_ms
    }

    pub fn event_budget_ms(&self) -> f64 {
        self.event_budget_ms
    }

    pub fn status(&self, interaction_level: f64) -> BudgetStatus {
        BudgetStatus {
            frame_budget_remaining_ms: self.frame_remaining_ms(),
            event_budget_remaining_ms: self.event_remaining_ms(),
            interaction_level,
        }
    }
}

impl Default for PerformanceBudgetManager {
    fn default() -> Self {
        Self::with_defaults()
    }
}
