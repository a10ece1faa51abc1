//! Integration tests for the tuning engine.
//!
//! These tests drive the public API end to end:
//! - Cold-start profile selection for weak devices
//! - The controller loop with telemetry, hysteresis and interaction
//! - Optimization, cross-device training and recommendations
//! - Persistence across engine restarts
//!
//! Run with: `cargo test --test engine_integration`

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use adaptune::benchmark::BenchmarkError;
use adaptune::learning::RecommendationSource;
use adaptune::{
    BenchmarkMetrics, Clock, DeviceHints, DeviceInfo, DirectoryStore, EngineConfig, ManualClock,
    MemoryStore, NetworkClass, OptimizationConfig, ParameterOptimizer, PerformanceProfile,
    PerformanceSample, ProfileCatalog, ProfileRank, SharedStore, SyntheticBenchmark, TuningEngine,
    TuningError,
};

// ============================================================================
// Helper Functions
// ============================================================================

/// A touch device with the given memory, cores and capability.
fn phone(memory_gb: f64, cores: u32, capability: f64) -> DeviceInfo {
    DeviceHints::new("android")
        .with_memory_gb(memory_gb)
        .with_cores(cores)
        .with_network(NetworkClass::Fast)
        .with_screen(1080, 2400, 2.0)
        .with_touch(true)
        .into_device_info()
        .with_capability(capability)
}

/// Engine configuration with short optimization runs.
fn quick_config() -> EngineConfig {
    EngineConfig {
        optimizer: OptimizationConfig::default().with_max_iterations(12),
        ..Default::default()
    }
}

fn engine_for(device: DeviceInfo, store: SharedStore) -> (TuningEngine, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let engine = TuningEngine::new(device, quick_config(), store, clock.clone()).unwrap();
    (engine, clock)
}

/// Push `count` identical samples, 100ms apart.
fn feed(engine: &TuningEngine, clock: &ManualClock, fps: f64, latency_ms: f64, count: usize) {
    for _ in 0..count {
        engine.push_sample(PerformanceSample::from_fps(fps, latency_ms, clock.now()));
        clock.advance_ms(100);
    }
}

// ============================================================================
// Integration Tests
// ============================================================================

/// A weak device starts on the most conservative profile.
#[test]
fn test_weak_device_gets_ultra_power_saver() {
    let device = DeviceHints::new("android")
        .with_memory_gb(2.0)
        .with_cores(2)
        .into_device_info()
        .with_capability(0.15);
    let (engine, _) = engine_for(device, Arc::new(MemoryStore::new()));

    let profile = engine.current_profile();
    assert_eq!(profile.name, "ultra-power-saver");
    assert_eq!(profile.rank, ProfileRank::UltraPowerSaver);
    assert_eq!(profile.throttle_interval_ms, 50.0);
    assert_eq!(profile.max_concurrent_animations, 1);

    let hints = engine.render_hints();
    assert!(!hints.use_hardware_acceleration);
}

/// Poor telemetry demotes to the floor, in-band scores hold the rank and
/// heavy interaction tightens timings.
#[test]
fn test_controller_loop() {
    let (engine, clock) = engine_for(phone(4.0, 4, 0.5), Arc::new(MemoryStore::new()));
    assert_eq!(engine.status().rank, ProfileRank::Balanced);

    // Empty window: nothing happens.
    let outcome = engine.tick();
    assert!(outcome.score.is_none());
    assert_eq!(outcome.profile.rank, ProfileRank::Balanced);

    feed(&engine, &clock, 20.0, 40.0, 10);
    let mut ranks = Vec::new();
    for _ in 0..4 {
        ranks.push(engine.tick().profile.rank);
    }
    assert_eq!(
        ranks,
        vec![
            ProfileRank::PowerSaver,
            ProfileRank::UltraPowerSaver,
            ProfileRank::UltraPowerSaver,
            ProfileRank::UltraPowerSaver,
        ]
    );
    assert_eq!(engine.status().transitions, 2);

    // Let the poor samples age out, then hold a score inside the band.
    clock.advance_ms(11_000);
    // 0.6 * 24/30 + 0.4 * (1 - 30/100) = 0.76
    feed(&engine, &clock, 24.0, 30.0, 10);
    for _ in 0..3 {
        let outcome = engine.tick();
        assert!(outcome.transition.is_none());
        assert_eq!(outcome.profile.rank, ProfileRank::UltraPowerSaver);
    }
    // Idle: 50ms * 1.2 is clamped back to 50ms.
    assert_eq!(engine.current_profile().throttle_interval_ms, 50.0);

    for _ in 0..14 {
        engine.interaction_event("drag");
    }
    let outcome = engine.tick();
    assert_eq!(outcome.profile.throttle_interval_ms, 40.0);
    assert!(engine.budget_status().interaction_level > 0.8);
}

/// Two similar devices end up in one cluster, and a third identical device
/// gets that cluster's aggregated profile.
#[test]
fn test_cross_device_recommendation() {
    let a = phone(4.0, 4, 0.5);
    let b = phone(4.5, 4, 0.55);
    assert!(a.features().similarity(&b.features()) >= 0.75);

    let (engine, _) = engine_for(a.clone(), Arc::new(MemoryStore::new()));
    let cancel = CancellationToken::new();

    let result_a = engine
        .optimize(&mut SyntheticBenchmark::new(1), &cancel)
        .unwrap();
    let optimizer =
        ParameterOptimizer::new(OptimizationConfig::default().with_max_iterations(12)).unwrap();
    let result_b = optimizer
        .optimize(&b, &mut SyntheticBenchmark::new(2), &cancel)
        .unwrap();
    assert!(result_a.success && result_b.success);

    assert!(engine.add_result(&a, &result_a));
    assert!(engine.add_result(&b, &result_b));
    let report = engine.train(&cancel).unwrap();
    assert_eq!(report.processed, 2);
    assert_eq!(report.clusters, 1);

    let model = engine.model_snapshot();
    assert_eq!(model.clusters[0].members.len(), 2);

    let third = a.clone();
    let recommendation = engine.recommend_for(&third).unwrap();
    assert!(recommendation.confidence > 0.6);
    match &recommendation.source {
        RecommendationSource::Cluster { id, .. } => assert_eq!(*id, model.clusters[0].id),
        other => panic!("expected a cluster recommendation, got {other}"),
    }

    let catalog = ProfileCatalog::standard();
    let base = catalog.select(third.capability);
    let expected = model.clusters[0].aggregated_profile(base).unwrap();
    assert_eq!(recommendation.profile, expected);

    engine.apply_recommendation(&recommendation);
    assert_eq!(engine.current_profile(), expected);
}

/// Model and history survive an engine restart on the same directory.
#[test]
fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let device = phone(6.0, 6, 0.75);
    let cancel = CancellationToken::new();

    let first_snapshot = {
        let store: SharedStore = Arc::new(DirectoryStore::open(dir.path()).unwrap());
        let (engine, _) = engine_for(device.clone(), store);
        let result = engine
            .optimize(&mut SyntheticBenchmark::new(9), &cancel)
            .unwrap();
        engine.add_result(&device, &result);
        let report = engine.train(&cancel).unwrap();
        assert!(report.persisted);
        engine
            .validate(&mut SyntheticBenchmark::new(10), &cancel)
            .unwrap();
        engine.model_snapshot()
    };

    let store: SharedStore = Arc::new(DirectoryStore::open(dir.path()).unwrap());
    let (engine, _) = engine_for(device.clone(), store);
    assert_eq!(engine.model_snapshot(), first_snapshot);

    let history = engine.history();
    assert_eq!(history.optimization_count(), 1);
    assert_eq!(history.validation_count(), 1);
    assert_eq!(history.latest_validation().unwrap().results.len(), 5);
    assert!(engine.recommend().unwrap().is_from_cluster());
}

/// A corrupt model file is replaced by a fresh model instead of failing.
#[test]
fn test_corrupt_state_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("learning_model.json"), b"{\"version\": 99}").unwrap();
    std::fs::write(dir.path().join("optimization_history.json"), b"not json").unwrap();

    let store: SharedStore = Arc::new(DirectoryStore::open(dir.path()).unwrap());
    let (engine, _) = engine_for(phone(4.0, 4, 0.5), store);
    assert!(engine.model_snapshot().clusters.is_empty());
    assert_eq!(engine.history().optimization_count(), 0);
    assert!(engine.recommend().is_none());
}

/// Cancelling mid-run discards progress and leaves no trace.
#[test]
fn test_cancel_during_optimization() {
    let (engine, _) = engine_for(phone(4.0, 4, 0.5), Arc::new(MemoryStore::new()));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    let mut passes = 0;
    let mut bench = |device: &DeviceInfo, profile: &PerformanceProfile| {
        passes += 1;
        if passes == 3 {
            trigger.cancel();
        }
        Ok::<BenchmarkMetrics, BenchmarkError>(SyntheticBenchmark::model(device, profile))
    };

    let err = engine.optimize(&mut bench, &cancel).unwrap_err();
    assert!(matches!(err, TuningError::Cancelled { .. }));
    assert_eq!(passes, 3);
    assert_eq!(engine.history().optimization_count(), 0);
    assert!(!engine.is_busy());
}

/// A failing benchmark yields an unsuccessful result that the learner ignores.
#[test]
fn test_benchmark_failure_is_a_result() {
    let (engine, _) = engine_for(phone(4.0, 4, 0.5), Arc::new(MemoryStore::new()));
    let mut bench = SyntheticBenchmark::new(4).failing_after(2);

    let result = engine.optimize(&mut bench, &CancellationToken::new()).unwrap();
    assert!(!result.success);
    assert!(result.error.is_some());
    assert_eq!(result.optimized, result.original);

    assert!(!engine.add_result(engine.device(), &result));
    assert_eq!(engine.history().optimization_count(), 1);
}

/// The async drivers produce the same kind of results as the sync ones.
#[tokio::test]
async fn test_async_optimize_and_train() {
    let device = phone(8.0, 8, 0.9);
    let engine = Arc::new(
        TuningEngine::new(
            device.clone(),
            quick_config(),
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::new()),
        )
        .unwrap(),
    );
    let cancel = CancellationToken::new();

    let mut bench = SyntheticBenchmark::new(21);
    let result = engine.optimize_async(&mut bench, &cancel).await.unwrap();
    assert!(result.success);
    assert!(result.confidence >= 0.5 && result.confidence <= 1.0);

    engine.add_result(&device, &result);
    let report = engine.train_async(&cancel).await.unwrap();
    assert_eq!(report.processed, 1);

    let results = engine
        .validate_async(&mut SyntheticBenchmark::new(22), &cancel)
        .await
        .unwrap();
    assert!(results.iter().all(|r| r.success));
    assert!(results
        .iter()
        .all(|r| r.recommended_range.min >= r.current_range.min
            && r.recommended_range.max <= r.current_range.max));
}
