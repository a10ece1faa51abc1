//! The host-facing tuning engine.
//!
//! A [`TuningEngine`] is built once per session from a device snapshot, a
//! configuration, a store and a clock. It owns every component and exposes
//! the operations a UI host needs:
//!
//! ```text
//!            push_sample / interaction_event / tick
//!  host ─────────────────────────────────────────────► AdaptiveController
//!   │                                                        │
//!   │        optimize / validate (cancellable)               ▼
//!   ├──────────────────────────────► optimizer,      current_profile,
//!   │                                validator ──► history ──► store
//!   │        add_result / train / recommend
//!   └──────────────────────────────► CrossDeviceLearner ──► store
//! ```
//!
//! All methods take `&self`, so an engine can be shared behind an `Arc`.
//! Long-running operations are single-flight per kind and fail fast with
//! [`TuningError::ConcurrentOperation`](crate::TuningError::ConcurrentOperation).
//! Automatic saves never fail an operation; errors are logged.

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::benchmark::Benchmark;
use crate::budget::BudgetStatus;
use crate::clock::{Clock, SharedClock, SystemClock};
use crate::config::EngineConfig;
use crate::controller::{AdaptiveController, ControllerStatus, StepOutcome};
use crate::device::DeviceInfo;
use crate::error::TuningResult;
use crate::history::TuningHistory;
use crate::learning::{CrossDeviceLearner, CrossDeviceRecommendation, LearningModel, TrainingReport};
use crate::optimizer::{OptimizationResult, ParameterOptimizer};
use crate::profile::{PerformanceProfile, RenderHints};
use crate::store::{MemoryStore, SharedStore};
use crate::telemetry::PerformanceSample;
use crate::validator::{ParameterValidator, ValidationResult};

/// Host handle owning the controller, tuners, learner and history.
pub struct TuningEngine {
    device: DeviceInfo,
    clock: SharedClock,
    store: SharedStore,
    controller: Mutex<AdaptiveController>,
    optimizer: ParameterOptimizer,
    validator: ParameterValidator,
    learner: CrossDeviceLearner,
    history: RwLock<TuningHistory>,
}

impl TuningEngine {
    /// Build an engine, loading the learning model and histories from `store`.
    ///
    /// Unreadable stored state is logged and replaced by defaults. Only an
    /// invalid configuration is an error.
    pub fn new(
        device: DeviceInfo,
        config: EngineConfig,
        store: SharedStore,
        clock: SharedClock,
    ) -> TuningResult<Self> {
        config.validate()?;

        let optimizer = ParameterOptimizer::new(config.optimizer)?;
        let validator = ParameterValidator::new(config.validator)?;
        let learner = CrossDeviceLearner::with_store(config.learner, store.clone())?;
        let history = TuningHistory::load(store.as_ref());
        let controller = AdaptiveController::new(&device, config.controller);

        tracing::info!(
            platform = %device.platform,
            capability = format!("{:.2}", device.capability),
            category = %device.category(),
            clusters = learner.snapshot().clusters.len(),
            optimizations = history.optimization_count(),
            "Tuning engine ready"
        );

        Ok(Self {
            device,
            clock,
            store,
            controller: Mutex::new(controller),
            optimizer,
            validator,
            learner,
            history: RwLock::new(history),
        })
    }

    /// Engine with default configuration, an in-memory store and the system clock.
    pub fn in_memory(device: DeviceInfo) -> TuningResult<Self> {
        Self::new(
            device,
            EngineConfig::default(),
            std::sync::Arc::new(MemoryStore::new()),
            std::sync::Arc::new(SystemClock),
        )
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    // Telemetry and control

    pub fn push_sample(&self, sample: PerformanceSample) {
        self.controller.lock().push_sample(sample);
    }

    /// Record an interaction (`tap`, `drag`, `scroll`, ...) at the current time.
    pub fn interaction_event(&self, kind: &str) {
        let now = self.clock.now();
        self.controller.lock().interaction_event(kind, now);
    }

    /// Run one controller tick.
    pub fn tick(&self) -> StepOutcome {
        let now = self.clock.now();
        self.controller.lock().step(now)
    }

    /// Copy of the profile consumers should use right now.
    pub fn current_profile(&self) -> PerformanceProfile {
        self.controller.lock().current_profile().clone()
    }

    pub fn status(&self) -> ControllerStatus {
        self.controller.lock().status()
    }

    pub fn render_hints(&self) -> RenderHints {
        RenderHints::from_profile(self.controller.lock().current_profile())
    }

    // Budgets and rate limiting

    // Budgets reset on their own once a frame length has passed on the clock.

    pub fn budget_status(&self) -> BudgetStatus {
        let now = self.clock.now();
        self.controller.lock().budget_status(now)
    }

    pub fn can_execute_frame(&self, estimated_ms: f64) -> bool {
        let now = self.clock.now();
        self.controller.lock().can_execute_frame(now, estimated_ms)
    }

    pub fn can_execute_event(&self, estimated_ms: f64) -> bool {
        let now = self.clock.now();
        self.controller.lock().can_execute_event(now, estimated_ms)
    }

    pub fn record_frame_time(&self, actual_ms: f64) {
        let now = self.clock.now();
        self.controller.lock().record_frame_time(now, actual_ms);
    }

    pub fn record_event_time(&self, actual_ms: f64) {
        let now = self.clock.now();
        self.controller.lock().record_event_time(now, actual_ms);
    }

    pub fn reset_budget(&self) {
        self.controller.lock().reset_budget();
    }

    /// Run `f` if the adaptive throttle interval has elapsed.
    ///
    /// `f` runs after the controller lock is released.
    pub fn throttle<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce() -> R,
    {
        let now = self.clock.now();
        let fired = self.controller.lock().throttle(now, || ()).is_some();
        fired.then(f)
    }

    /// Debounce a named action; returns when it will become due.
    pub fn debounce(&self, action: impl Into<String>) -> std::time::Instant {
        let now = self.clock.now();
        self.controller.lock().debounce(now, action)
    }

    /// Take the pending debounced action if its quiet period has elapsed.
    pub fn poll_debounced(&self) -> Option<String> {
        let now = self.clock.now();
        self.controller.lock().poll_debounced(now)
    }

    // Optimization and validation

    /// Optimize this device's parameters against `bench`.
    ///
    /// The result is appended to the optimization history, which is then
    /// saved. Failed benchmark passes come back as `success == false`.
    pub fn optimize<B>(
        &self,
        bench: &mut B,
        cancel: &CancellationToken,
    ) -> TuningResult<OptimizationResult>
    where
        B: Benchmark + ?Sized,
    {
        let result = self.optimizer.optimize(&self.device, bench, cancel)?;
        self.record_optimization(&result);
        Ok(result)
    }

    pub async fn optimize_async<B>(
        &self,
        bench: &mut B,
        cancel: &CancellationToken,
    ) -> TuningResult<OptimizationResult>
    where
        B: Benchmark + ?Sized,
    {
        let result = self
            .optimizer
            .optimize_async(&self.device, bench, cancel)
            .await?;
        self.record_optimization(&result);
        Ok(result)
    }

    /// Validate this device's parameter ranges against `bench`.
    pub fn validate<B>(
        &self,
        bench: &mut B,
        cancel: &CancellationToken,
    ) -> TuningResult<Vec<ValidationResult>>
    where
        B: Benchmark + ?Sized,
    {
        let results = self.validator.validate(&self.device, bench, cancel)?;
        self.record_validation(&results);
        Ok(results)
    }

    pub async fn validate_async<B>(
        &self,
        bench: &mut B,
        cancel: &CancellationToken,
    ) -> TuningResult<Vec<ValidationResult>>
    where
        B: Benchmark + ?Sized,
    {
        let results = self
            .validator
            .validate_async(&self.device, bench, cancel)
            .await?;
        self.record_validation(&results);
        Ok(results)
    }

    fn record_optimization(&self, result: &OptimizationResult) {
        let mut history = self.history.write();
        history.record_optimization(&self.device, result);
        if let Err(e) = history.save_optimizations(self.store.as_ref()) {
            tracing::warn!(error = %e, "Failed to save optimization history");
        }
    }

    fn record_validation(&self, results: &[ValidationResult]) {
        let mut history = self.history.write();
        history.record_validation(&self.device, results);
        if let Err(e) = history.save_validations(self.store.as_ref()) {
            tracing::warn!(error = %e, "Failed to save validation history");
        }
    }

    /// Switch the controller to an optimized profile.
    ///
    /// Failed results are ignored. Returns whether the profile was applied.
    pub fn apply_optimization(&self, result: &OptimizationResult) -> bool {
        if !result.success {
            return false;
        }
        self.controller.lock().apply_profile(result.optimized.clone());
        true
    }

    // Cross-device learning

    /// Queue a result from any device for the next training pass.
    pub fn add_result(&self, device: &DeviceInfo, result: &OptimizationResult) -> bool {
        self.learner.add_result(device, result)
    }

    pub fn train(&self, cancel: &CancellationToken) -> TuningResult<TrainingReport> {
        self.learner.train(cancel)
    }

    pub async fn train_async(&self, cancel: &CancellationToken) -> TuningResult<TrainingReport> {
        self.learner.train_async(cancel).await
    }

    /// Learned profile for this device.
    pub fn recommend(&self) -> Option<CrossDeviceRecommendation> {
        self.learner.recommend(&self.device)
    }

    /// Learned profile for another device.
    pub fn recommend_for(&self, device: &DeviceInfo) -> Option<CrossDeviceRecommendation> {
        self.learner.recommend(device)
    }

    /// Switch the controller to a recommended profile.
    pub fn apply_recommendation(&self, recommendation: &CrossDeviceRecommendation) {
        tracing::info!(
            source = %recommendation.source,
            confidence = format!("{:.2}", recommendation.confidence),
            "Applying cross-device recommendation"
        );
        self.controller
            .lock()
            .apply_profile(recommendation.profile.clone());
    }

    /// Read-only copy of the learning model.
    pub fn model_snapshot(&self) -> LearningModel {
        self.learner.snapshot()
    }

    /// Write the learning model now, surfacing any store error.
    pub fn persist_model(&self) -> TuningResult<()> {
        self.learner.persist()
    }

    /// Copy of the optimization and validation history.
    pub fn history(&self) -> TuningHistory {
        self.history.read().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.optimizer.is_running() || self.validator.is_running() || self.learner.is_training()
    }
}
