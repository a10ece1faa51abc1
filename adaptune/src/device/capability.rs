//! Device capability scoring.
//!
//! # Weighting
//!
//! | Signal | Max contribution | Full score at |
//! |--------|------------------|---------------|
//! | Memory | 0.3 | 8 GB |
//! | Logical cores | 0.3 | 8 cores |
//! | Network class | 0.2 | `fast` |
//! | Battery level | 0.2 | 100% |
//!
//! The sum is clamped to `[0.0, 1.0]`.

use super::DeviceHints;

/// Memory assumed when the platform does not report it.
pub const DEFAULT_MEMORY_GB: f64 = 4.0;

/// Core count assumed when the platform does not report it.
pub const DEFAULT_CORES: f64 = 4.0;

/// Battery level assumed when no battery information is available.
pub const DEFAULT_BATTERY_LEVEL: f64 = 0.5;

/// Memory at which the memory component saturates.
pub const FULL_SCORE_MEMORY_GB: f64 = 8.0;

/// Core count at which the core component saturates.
pub const FULL_SCORE_CORES: f64 = 8.0;

const MEMORY_WEIGHT: f64 = 0.3;
const CORES_WEIGHT: f64 = 0.3;
const NETWORK_WEIGHT: f64 = 0.2;
const BATTERY_WEIGHT: f64 = 0.2;

/// Score a device from its hints.
///
/// Pure and deterministic: the same hints always produce the same score,
/// and the score is always within `[0.0, 1.0]`.
pub fn assess(hints: &DeviceHints) -> f64 {
    let memory = hints.memory_gb.unwrap_or(DEFAULT_MEMORY_GB).max(0.0);
    let cores = hints
        .logical_cores
        .map(f64::from)
        .unwrap_or(DEFAULT_CORES);
    let network = hints.network.unwrap_or_default();
    let battery = hints
        .battery_level
        .unwrap_or(DEFAULT_BATTERY_LEVEL)
        .clamp(0.0, 1.0);

    let score = (memory / FULL_SCORE_MEMORY_GB).min(1.0) * MEMORY_WEIGHT
        + (cores / FULL_SCORE_CORES).min(1.0) * CORES_WEIGHT
        + network.weight() * NETWORK_WEIGHT
        + battery * BATTERY_WEIGHT;

    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::NetworkClass;

    #[test]
    fn test_flagship_scores_full() {
        let hints = DeviceHints::new("ios")
            .with_memory_gb(8.0)
            .with_cores(8)
            .with_network(NetworkClass::Fast)
            .with_battery(1.0);
        assert_eq!(assess(&hints), 1.0);
    }

    #[test]
    fn test_oversized_hardware_is_clamped() {
        let hints = DeviceHints::new("desktop")
            .with_memory_gb(64.0)
            .with_cores(32)
            .with_network(NetworkClass::Fast)
            .with_battery(1.0);
        assert_eq!(assess(&hints), 1.0);
    }

    #[test]
    fn test_defaults_when_hints_missing() {
        // 0.15 + 0.15 + 0.14 + 0.10
        let score = assess(&DeviceHints::new("unknown"));
        assert!((score - 0.54).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn test_weak_device() {
        let hints = DeviceHints::new("android")
            .with_memory_gb(1.0)
            .with_cores(2)
            .with_network(NetworkClass::VerySlow)
            .with_battery(0.1);
        // 0.0375 + 0.075 + 0.04 + 0.02
        let score = assess(&hints);
        assert!((score - 0.1725).abs() < 1e-9, "got {score}");
    }

    #[test]
    fn test_is_deterministic() {
        let hints = DeviceHints::new("android")
            .with_memory_gb(3.0)
            .with_cores(6)
            .with_network(NetworkClass::Slow);
        assert_eq!(assess(&hints), assess(&hints.clone()));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_score_always_in_unit_range(
                memory in proptest::option::of(-4.0..128.0_f64),
                cores in proptest::option::of(0u32..256),
                battery in proptest::option::of(-1.0..2.0_f64),
                network in 0usize..4,
            ) {
                let network = [
                    NetworkClass::Fast,
                    NetworkClass::Medium,
                    NetworkClass::Slow,
                    NetworkClass::VerySlow,
                ][network];
                let hints = DeviceHints {
                    memory_gb: memory,
                    logical_cores: cores,
                    battery_level: battery,
                    network: Some(network),
                    ..DeviceHints::new("prop")
                };
                let score = assess(&hints);
                prop_assert!((0.0..=1.0).contains(&score), "score {} out of range", score);
                prop_assert_eq!(score, assess(&hints));
            }
        }
    }
}
