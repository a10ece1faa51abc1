//! Closed-loop profile controller.
//!
//! The controller consumes telemetry and interaction events, steps the
//! active profile rank with hysteresis, and keeps the budget manager and
//! rate limiters aligned with the emitted profile.
//!
//! # State Machine
//!
//! ```text
//!                score >= 0.9                    score >= 0.9
//!   ┌──────────┐ ───────────► ┌──────────┐ ... ───────────► ┌────────────┐
//!   │ ultra-   │              │ power-   │                  │ ultra-high │
//!   │ power-   │ ◄─────────── │ saver    │ ... ◄─────────── │            │
//!   │ saver    │ score <= 0.7 └──────────┘     score <= 0.7 └────────────┘
//!   └──────────┘
//!          0.7 < score < 0.9: stay
//! ```
//!
//! The interaction adjustment scales timings of the emitted profile but
//! never changes the rank. `step` never benchmarks and is cheap enough to
//! run every frame.

mod config;
mod status;

pub use config::{
    ControllerConfig, DEBOUNCE_BOUNDS_MS, THROTTLE_BOUNDS_MS, TOUCH_DELAY_BOUNDS_MS,
};
pub use status::{ControllerStatus, ProfileTransition, StepOutcome};

use std::time::Instant;

use crate::budget::{BudgetConfig, BudgetStatus, PerformanceBudgetManager};
use crate::device::DeviceInfo;
use crate::limiter::{DebounceConfig, DynamicDebouncer, DynamicThrottler, ThrottleConfig};
use crate::profile::{PerformanceProfile, ProfileCatalog, ProfileRank};
use crate::telemetry::{InteractionTracker, PerformanceSample, SampleAverages, SampleWindow};

/// Weight of the fps ratio in the performance score.
const FPS_WEIGHT: f64 = 0.6;

/// Weight of the latency headroom in the performance score.
const LATENCY_WEIGHT: f64 = 0.4;

/// Score a window of samples against a profile's targets.
///
/// `0.6 * fps/target_fps + 0.4 * (1 - latency/max_latency)`
pub fn performance_score(averages: &SampleAverages, profile: &PerformanceProfile) -> f64 {
    let fps_ratio = if profile.target_fps > 0.0 {
        averages.fps / profile.target_fps
    } else {
        0.0
    };
    let latency_headroom = if profile.max_latency_ms > 0.0 {
        1.0 - averages.input_latency_ms / profile.max_latency_ms
    } else {
        0.0
    };
    FPS_WEIGHT * fps_ratio + LATENCY_WEIGHT * latency_headroom
}

/// Adaptive controller owning the live sample window and active profile.
#[derive(Debug)]
pub struct AdaptiveController {
    config: ControllerConfig,
    catalog: ProfileCatalog,
    rank: ProfileRank,

    /// Profile the rank resolves to, unless a recommendation overrides it.
    base: PerformanceProfile,

    /// Profile handed to consumers.
    emitted: PerformanceProfile,

    samples: SampleWindow,
    interactions: InteractionTracker,
    budget: PerformanceBudgetManager,
    throttler: DynamicThrottler,
    debouncer: DynamicDebouncer<String>,

    last_score: Option<f64>,
    interaction_level: f64,
    transitions: u64,
}

impl AdaptiveController {
    /// Create a controller starting at the cold-start profile for `device`.
    pub fn new(device: &DeviceInfo, config: ControllerConfig) -> Self {
        Self::with_catalog(device, config, ProfileCatalog::standard())
    }

    pub fn with_catalog(
        device: &DeviceInfo,
        config: ControllerConfig,
        catalog: ProfileCatalog,
    ) -> Self {
        let base = catalog.select(device.capability).clone();
        let rank = base.rank;

        let budget = PerformanceBudgetManager::new(&BudgetConfig {
            frame_length: config.frame_length,
            ..BudgetConfig::from_profile(&base)
        });
        let throttler = DynamicThrottler::new(ThrottleConfig {
            base_interval_ms: base.throttle_interval_ms,
            ..config.throttle.clone()
        });
        let debouncer = DynamicDebouncer::new(DebounceConfig {
            base_delay_ms: base.debounce_delay_ms,
            ..config.debounce.clone()
        });

        tracing::info!(
            capability = format!("{:.2}", device.capability),
            profile = %rank,
            "Adaptive controller starting"
        );

        Self {
            samples: SampleWindow::new(config.sample_window, config.max_samples),
            interactions: InteractionTracker::new(config.interaction_window),
            emitted: base.clone(),
            base,
            rank,
            catalog,
            budget,
            throttler,
            debouncer,
            last_score: None,
            interaction_level: 0.0,
            transitions: 0,
            config,
        }
    }

    /// Append a telemetry sample (arrival order is preserved).
    pub fn push_sample(&mut self, sample: PerformanceSample) {
        self.samples.push(sample);
    }

    /// Record a UI interaction event.
    pub fn interaction_event(&mut self, kind: &str, at: Instant) {
        self.interactions.record(kind, at);
    }

    /// Run one control tick.
    ///
    /// With an empty sample window this is a no-op that returns the current
    /// profile unchanged.
    pub fn step(&mut self, now: Instant) -> StepOutcome {
        self.samples.prune(now);
        self.budget.tick(now);

        let Some(averages) = self.samples.averages() else {
            return StepOutcome {
                profile: self.emitted.clone(),
                transition: None,
                score: None,
            };
        };

        let score = performance_score(&averages, &self.base);
        self.last_score = Some(score);

        let next = next_rank(self.rank, score, &self.config);
        let transition = if next != self.rank {
            let transition = ProfileTransition {
                from: self.rank,
                to: next,
                score,
            };
            tracing::info!(
                from = %transition.from,
                to = %transition.to,
                score = format!("{:.2}", score),
                fps = format!("{:.1}", averages.fps),
                latency_ms = format!("{:.1}", averages.input_latency_ms),
                "Performance profile changed"
            );
            self.rank = next;
            self.base = self.catalog.profile(next).clone();
            self.transitions += 1;
            Some(transition)
        } else {
            tracing::trace!(
                profile = %self.rank,
                score = format!("{:.2}", score),
                "Profile unchanged"
            );
            None
        };

        self.interaction_level = self.interactions.intensity(now);
        let adjusted = self.adjust_for_interaction(&self.base);
        if transition.is_some() {
            self.retarget(&adjusted);
            self.emitted = adjusted;
        } else if adjusted != self.emitted {
            self.retune(&adjusted);
            self.emitted = adjusted;
        }
        self.throttler.record_metric(score.clamp(0.0, 1.0));

        StepOutcome {
            profile: self.emitted.clone(),
            transition,
            score: Some(score),
        }
    }

    /// Replace the base profile (e.g. with a learned recommendation).
    ///
    /// The rank follows the profile's rank. The override holds until the
    /// next rank change.
    pub fn apply_profile(&mut self, profile: PerformanceProfile) {
        tracing::info!(profile = %profile, "Applying external profile");
        self.rank = profile.rank;
        self.retarget(&profile);
        self.emitted = profile.clone();
        self.base = profile;
    }

    fn adjust_for_interaction(&self, base: &PerformanceProfile) -> PerformanceProfile {
        let factor = if self.interaction_level > self.config.busy_interaction {
            self.config.busy_factor
        } else if self.interaction_level < self.config.idle_interaction {
            self.config.idle_factor
        } else {
            1.0
        };

        let mut profile = base.clone();
        profile.throttle_interval_ms = clamp_to(base.throttle_interval_ms * factor, THROTTLE_BOUNDS_MS);
        profile.debounce_delay_ms = clamp_to(base.debounce_delay_ms * factor, DEBOUNCE_BOUNDS_MS);
        profile.touch_hold_delay_ms =
            clamp_to(base.touch_hold_delay_ms * factor, TOUCH_DELAY_BOUNDS_MS);
        profile
    }

    /// Point budgets and limiters at a new profile, restarting throttle adaptation.
    fn retarget(&mut self, profile: &PerformanceProfile) {
        self.budget
            .set_budgets(profile.animation_budget_ms, profile.event_budget_ms);
        self.throttler.set_base_interval(profile.throttle_interval_ms);
        self.debouncer.set_base_delay(profile.debounce_delay_ms);
    }

    /// Follow an interaction-only change. The throttler keeps its adaptation.
    fn retune(&mut self, profile: &PerformanceProfile) {
        self.budget
            .set_budgets(profile.animation_budget_ms, profile.event_budget_ms);
        self.throttler.rescale_base_interval(profile.throttle_interval_ms);
        self.debouncer.set_base_delay(profile.debounce_delay_ms);
    }

    /// Run `f` if the adaptive throttle interval has elapsed.
    pub fn throttle<F, R>(&mut self, now: Instant, f: F) -> Option<R>
    where
        F: FnOnce() -> R,
    {
        if !self.emitted.throttling_enabled {
            return Some(f());
        }
        self.throttler.fire_if_ready(now, f)
    }

    /// Debounce a named action. The latest action wins.
    ///
    /// With debouncing disabled nothing is scheduled and `now` is returned:
    /// the caller runs the action right away.
    pub fn debounce(&mut self, now: Instant, action: impl Into<String>) -> Instant {
        if !self.emitted.debouncing_enabled {
            return now;
        }
        let level = self.interactions.intensity(now);
        self.debouncer.trigger(now, level, action.into())
    }

    /// Take the debounced action once its quiet period elapsed.
    ///
    /// An action still pending when debouncing was switched off is released
    /// immediately.
    pub fn poll_debounced(&mut self, now: Instant) -> Option<String> {
        if !self.emitted.debouncing_enabled {
            return self.debouncer.cancel();
        }
        self.debouncer.poll(now)
    }

    // Budget calls roll the frame over first.

    pub fn can_execute_frame(&mut self, now: Instant, estimated_ms: f64) -> bool {
        self.budget.tick(now);
        self.budget.can_execute_frame(estimated_ms)
    }

    pub fn can_execute_event(&mut self, now: Instant, estimated_ms: f64) -> bool {
        self.budget.tick(now);
        self.budget.can_execute_event(estimated_ms)
    }

    pub fn record_frame_time(&mut self, now: Instant, actual_ms: f64) {
        self.budget.tick(now);
        self.budget.record_frame_time(actual_ms);
    }

    pub fn record_event_time(&mut self, now: Instant, actual_ms: f64) {
        self.budget.tick(now);
        self.budget.record_event_time(actual_ms);
    }

    /// Reset both per-frame budgets now.
    pub fn reset_budget(&mut self) {
        self.budget.reset();
    }

    pub fn budget_status(&mut self, now: Instant) -> BudgetStatus {
        self.budget.tick(now);
        self.budget.status(self.interaction_level)
    }

    /// Profile handed to consumers.
    pub fn current_profile(&self) -> &PerformanceProfile {
        &self.emitted
    }

    pub fn rank(&self) -> ProfileRank {
        self.rank
    }

    pub fn last_score(&self) -> Option<f64> {
        self.last_score
    }

    pub fn throttle_interval_ms(&self) -> f64 {
        self.throttler.effective_interval_ms()
    }

    pub fn catalog(&self) -> &ProfileCatalog {
        &self.catalog
    }

    pub fn status(&self) -> ControllerStatus {
        ControllerStatus {
            rank: self.rank,
            profile: self.emitted.clone(),
            last_score: self.last_score,
            sample_count: self.samples.len(),
            interaction_level: self.interaction_level,
            transitions: self.transitions,
        }
    }
}

/// Hysteresis decision for one score.
pub fn next_rank(current: ProfileRank, score: f64, config: &ControllerConfig) -> ProfileRank {
    if score >= config.promote_threshold {
        current.upgrade()
    } else if score <= config.demote_threshold {
        current.downgrade()
    } else {
        current
    }
}

fn clamp_to(value: f64, (min, max): (f64, f64)) -> f64 {
    value.clamp(min, max)
}
