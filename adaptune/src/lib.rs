//! Adaptune - adaptive performance tuning for interactive UIs
//!
//! This library decides, on the device, how responsive a UI can afford to
//! be. It scores the host device, picks a performance profile, adapts that
//! profile to live telemetry, tunes its parameters against a benchmark and
//! learns recommendations across devices.
//!
//! # Module Structure
//!
//! - [`device`] - Device snapshot and capability assessment
//! - [`profile`] - Profile presets and render hints
//! - [`telemetry`] - Rolling sample window and interaction intensity
//! - [`controller`] - Hysteresis-based profile switching
//! - [`budget`] / [`limiter`] - Per-frame budgets, throttling and debouncing
//! - [`optimizer`] / [`validator`] - Benchmark-driven parameter search
//! - [`learning`] - Cross-device clustering and recommendations
//! - [`store`] / [`history`] - Persistence behind a key-value store
//! - [`engine`] - The [`TuningEngine`] host handle
//!
//! # Example
//!
//! ```
//! use adaptune::{DeviceHints, NetworkClass, PerformanceSample, TuningEngine};
//!
//! let device = DeviceHints::new("android")
//!     .with_memory_gb(4.0)
//!     .with_cores(8)
//!     .with_network(NetworkClass::Fast)
//!     .into_device_info();
//! let engine = TuningEngine::in_memory(device).unwrap();
//!
//! engine.push_sample(PerformanceSample::from_fps(58.0, 12.0, std::time::Instant::now()));
//! let outcome = engine.tick();
//! println!("profile: {}", outcome.profile);
//! ```

pub mod benchmark;
pub mod budget;
pub mod busy;
pub mod clock;
pub mod config;
pub mod controller;
pub mod device;
pub mod engine;
pub mod error;
pub mod history;
pub mod learning;
pub mod limiter;
pub mod logging;
pub mod optimizer;
pub mod profile;
pub mod store;
pub mod telemetry;
pub mod validator;

pub use benchmark::{Benchmark, BenchmarkError, BenchmarkMetrics, SyntheticBenchmark};
pub use budget::{BudgetStatus, PerformanceBudgetManager};
pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
pub use config::EngineConfig;
pub use controller::{AdaptiveController, ControllerConfig, ControllerStatus, ProfileTransition};
pub use device::{assess, DeviceCategory, DeviceHints, DeviceInfo, NetworkClass};
pub use engine::TuningEngine;
pub use error::{ConfigError, StoreError, TuningError, TuningResult};
pub use history::TuningHistory;
pub use learning::{CrossDeviceLearner, CrossDeviceRecommendation, LearningModel};
pub use logging::{init_logging, LoggingConfig};
pub use optimizer::{OptimizationConfig, OptimizationResult, ParameterOptimizer, TunableParameter};
pub use profile::{PerformanceProfile, ProfileCatalog, ProfileRank, RenderHints};
pub use store::{DirectoryStore, KeyValueStore, MemoryStore, SharedStore};
pub use telemetry::PerformanceSample;
pub use validator::{ParameterValidator, ValidationConfig, ValidationResult};
