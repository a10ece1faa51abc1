//! The persisted learning model.
//!
//! A [`LearningModel`] holds device clusters and global parameter
//! statistics. It is owned and mutated only by the learner; everyone else
//! works on snapshots.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::device::{DeviceCategory, DeviceFeatures, DeviceInfo};
use crate::error::StoreError;
use crate::optimizer::{OptimizationResult, ParameterVector, TunableParameter};
use crate::profile::PerformanceProfile;
use crate::store::{Persisted, LEARNING_MODEL_KEY};

/// Schema version written into every persisted model.
pub const MODEL_VERSION: u32 = 1;

/// Confidence of parameter statistics that were never trained.
pub const INITIAL_STATS_CONFIDENCE: f64 = 0.3;

/// Ceiling for global statistics confidence.
pub const MAX_STATS_CONFIDENCE: f64 = 0.9;

/// Ceiling for cluster confidence.
pub const MAX_CLUSTER_CONFIDENCE: f64 = 0.95;

/// Clusters, global statistics and training metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningModel {
    pub version: u32,
    pub clusters: Vec<DeviceCluster>,
    pub global: GlobalOptimizations,
    pub learning_rate: f64,
    pub convergence_threshold: f64,

    /// Unix milliseconds of the last committed training pass.
    pub last_training_ms: Option<i64>,

    /// Id handed to the next new cluster.
    pub next_cluster_id: u64,
}

impl LearningModel {
    pub fn new(learning_rate: f64, convergence_threshold: f64) -> Self {
        Self {
            version: MODEL_VERSION,
            clusters: Vec::new(),
            global: GlobalOptimizations::default(),
            learning_rate,
            convergence_threshold,
            last_training_ms: None,
            next_cluster_id: 1,
        }
    }

    pub fn cluster(&self, id: u64) -> Option<&DeviceCluster> {
        self.clusters.iter().find(|c| c.id == id)
    }

    /// Total members across clusters.
    pub fn member_count(&self) -> usize {
        self.clusters.iter().map(|c| c.members.len()).sum()
    }

    /// Most similar cluster to `features`, with its similarity.
    pub fn best_match(&self, features: &DeviceFeatures) -> Option<(&DeviceCluster, f64)> {
        self.clusters
            .iter()
            .map(|c| (c, c.centroid.similarity(features)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    pub(crate) fn allocate_cluster_id(&mut self) -> u64 {
        let id = self.next_cluster_id;
        self.next_cluster_id += 1;
        id
    }

    /// Structural checks run after deserialization.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.version != MODEL_VERSION {
            return Err(StoreError::VersionMismatch {
                key: LEARNING_MODEL_KEY.to_string(),
                found: self.version,
                expected: MODEL_VERSION,
            });
        }

        let malformed = |reason: String| StoreError::Malformed {
            key: LEARNING_MODEL_KEY.to_string(),
            reason,
        };

        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(malformed(format!(
                "learning rate {} outside (0, 1]",
                self.learning_rate
            )));
        }
        if !self.convergence_threshold.is_finite() || self.convergence_threshold < 0.0 {
            return Err(malformed(format!(
                "convergence threshold {} is negative or not finite",
                self.convergence_threshold
            )));
        }

        let mut ids = HashSet::new();
        for cluster in &self.clusters {
            if !ids.insert(cluster.id) {
                return Err(malformed(format!("duplicate cluster id {}", cluster.id)));
            }
            if cluster.id >= self.next_cluster_id {
                return Err(malformed(format!(
                    "cluster id {} not below next id {}",
                    cluster.id, self.next_cluster_id
                )));
            }
            if cluster.members.is_empty() {
                return Err(malformed(format!("cluster {} has no members", cluster.id)));
            }
            if !(0.0..=1.0).contains(&cluster.confidence) {
                return Err(malformed(format!(
                    "cluster {} confidence {} outside [0, 1]",
                    cluster.id, cluster.confidence
                )));
            }
        }

        for param in TunableParameter::ALL {
            let stats = self.global.get(param);
            if !stats.mean.is_finite() || !stats.std_dev.is_finite() {
                return Err(malformed(format!("non-finite statistics for {}", param)));
            }
        }
        Ok(())
    }
}

impl Default for LearningModel {
    fn default() -> Self {
        Self::new(0.1, 0.01)
    }
}

impl Persisted for LearningModel {
    const KEY: &'static str = LEARNING_MODEL_KEY;

    fn check(&self) -> Result<(), StoreError> {
        self.validate()
    }
}

/// One device's optimized profile inside a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterMember {
    pub device: DeviceInfo,
    pub profile: PerformanceProfile,

    /// Analytic overall improvement of the optimization result.
    pub estimated_improvement: f64,

    /// Confidence of the optimization result.
    pub confidence: f64,
}

impl ClusterMember {
    pub fn from_result(device: DeviceInfo, result: &OptimizationResult) -> Self {
        Self {
            device,
            profile: result.optimized.clone(),
            estimated_improvement: result.improvement.overall,
            confidence: result.confidence,
        }
    }

    pub fn features(&self) -> DeviceFeatures {
        self.device.features()
    }
}

/// Devices similar enough to share a recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCluster {
    pub id: u64,
    pub name: String,
    pub members: Vec<ClusterMember>,

    /// Component-wise mean of member features.
    pub centroid: DeviceFeatures,

    /// Mean estimated improvement of the members. Never measured.
    pub average_improvement: f64,

    pub confidence: f64,

    /// Unix milliseconds.
    pub last_updated_ms: i64,
}

impl DeviceCluster {
    /// Cluster with a single founding member.
    pub fn new(id: u64, member: ClusterMember, now_ms: i64) -> Self {
        Self::from_members(id, vec![member], now_ms)
    }

    /// Cluster over a non-empty member list.
    pub fn from_members(id: u64, members: Vec<ClusterMember>, now_ms: i64) -> Self {
        let mut cluster = Self {
            id,
            name: String::new(),
            members,
            centroid: DeviceFeatures::default(),
            average_improvement: 0.0,
            confidence: 0.0,
            last_updated_ms: now_ms,
        };
        cluster.recompute();
        cluster
    }

    /// Fold a member in and recompute the derived fields.
    pub fn add_member(&mut self, member: ClusterMember, now_ms: i64) {
        self.members.push(member);
        self.last_updated_ms = now_ms;
        self.recompute();
    }

    fn recompute(&mut self) {
        let features: Vec<DeviceFeatures> = self.members.iter().map(|m| m.features()).collect();
        self.centroid = DeviceFeatures::mean(&features).unwrap_or_default();

        let n = self.members.len().max(1) as f64;
        self.average_improvement =
            self.members.iter().map(|m| m.estimated_improvement).sum::<f64>() / n;
        let mean_confidence = self.members.iter().map(|m| m.confidence).sum::<f64>() / n;
        self.confidence = (0.4 + 0.1 * self.members.len() as f64 + 0.3 * mean_confidence)
            .clamp(0.0, MAX_CLUSTER_CONFIDENCE);
        self.name = cluster_name(&self.centroid);
    }

    pub fn devices(&self) -> impl Iterator<Item = &DeviceInfo> {
        self.members.iter().map(|m| &m.device)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &PerformanceProfile> {
        self.members.iter().map(|m| &m.profile)
    }

    /// Per-parameter mean of member profiles, snapped to the grid and
    /// written over `base`.
    pub fn aggregated_profile(&self, base: &PerformanceProfile) -> Option<PerformanceProfile> {
        if self.members.is_empty() {
            return None;
        }
        let n = self.members.len() as f64;
        let mut sum = ParameterVector::default();
        for profile in self.profiles() {
            let values = ParameterVector::from_profile(profile);
            sum = sum.map(|p, acc| acc + values.get(p));
        }
        let mean = sum.map(|_, total| total / n).snapped();
        Some(mean.apply_to(base).renamed(format!("{} (learned)", self.name)))
    }
}

/// "Mid-Range touch", "High-End pointer" and so on.
pub fn cluster_name(centroid: &DeviceFeatures) -> String {
    let category =
        DeviceCategory::from_features(centroid.memory_gb, centroid.cores, centroid.capability);
    let input = if centroid.is_touch() { "touch" } else { "pointer" };
    format!("{} {}", category.name(), input)
}

/// Weighted statistics for one tunable parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterStats {
    pub mean: f64,
    pub std_dev: f64,
    pub confidence: f64,
    pub samples: u64,
}

impl Default for ParameterStats {
    fn default() -> Self {
        Self {
            mean: 0.0,
            std_dev: 0.0,
            confidence: INITIAL_STATS_CONFIDENCE,
            samples: 0,
        }
    }
}

impl ParameterStats {
    /// Blend one batch's weighted statistics in.
    ///
    /// The first batch is assigned directly; later ones move the stored
    /// values toward the batch by `learning_rate`.
    pub fn blend(&mut self, batch_mean: f64, batch_std: f64, batch_len: u64, learning_rate: f64) {
        if batch_len == 0 {
            return;
        }
        if self.samples == 0 {
            self.mean = batch_mean;
            self.std_dev = batch_std;
        } else {
            self.mean += learning_rate * (batch_mean - self.mean);
            self.std_dev += learning_rate * (batch_std - self.std_dev);
        }
        self.samples += batch_len;
        self.confidence = (self.confidence + 0.1).min(MAX_STATS_CONFIDENCE);
    }
}

/// Statistics across every device the learner has seen.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GlobalOptimizations {
    pub throttle_interval: ParameterStats,
    pub debounce_delay: ParameterStats,
    pub touch_threshold: ParameterStats,
    pub touch_delay: ParameterStats,
    pub max_animations: ParameterStats,

    /// Results folded in so far.
    pub observations: u64,
}

impl GlobalOptimizations {
    pub fn get(&self, param: TunableParameter) -> &ParameterStats {
        match param {
            TunableParameter::ThrottleInterval => &self.throttle_interval,
            TunableParameter::DebounceDelay => &self.debounce_delay,
            TunableParameter::TouchThreshold => &self.touch_threshold,
            TunableParameter::TouchDelay => &self.touch_delay,
            TunableParameter::MaxAnimations => &self.max_animations,
        }
    }

    pub fn get_mut(&mut self, param: TunableParameter) -> &mut ParameterStats {
        match param {
            TunableParameter::ThrottleInterval => &mut self.throttle_interval,
            TunableParameter::DebounceDelay => &mut self.debounce_delay,
            TunableParameter::TouchThreshold => &mut self.touch_threshold,
            TunableParameter::TouchDelay => &mut self.touch_delay,
            TunableParameter::MaxAnimations => &mut self.max_animations,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.observations > 0
    }

    /// Stored means as a parameter vector.
    pub fn means(&self) -> ParameterVector {
        ParameterVector::default().map(|p, _| self.get(p).mean)
    }

    /// Fold a batch of `(values, weight)` pairs in.
    pub fn update(&mut self, batch: &[(ParameterVector, f64)], learning_rate: f64) {
        let total_weight: f64 = batch.iter().map(|(_, w)| w).sum();
        if batch.is_empty() || total_weight <= 0.0 {
            return;
        }
        for param in TunableParameter::ALL {
            let mean = batch
                .iter()
                .map(|(values, w)| w * values.get(param))
                .sum::<f64>()
                / total_weight;
            let variance = batch
                .iter()
                .map(|(values, w)| w * (values.get(param) - mean).powi(2))
                .sum::<f64>()
                / total_weight;
            self.get_mut(param)
                .blend(mean, variance.sqrt(), batch.len() as u64, learning_rate);
        }
        self.observations += batch.len() as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceHints;
    use crate::optimizer::ImprovementEstimate;
    use crate::profile::{ProfileCatalog, ProfileRank};

    fn device(memory: f64, cores: u32, touch: bool) -> DeviceInfo {
        DeviceHints::new("test")
            .with_memory_gb(memory)
            .with_cores(cores)
            .with_touch(touch)
            .into_device_info()
    }

    fn member(memory: f64, throttle: f64) -> ClusterMember {
        let mut profile = ProfileCatalog::standard()
            .profile(ProfileRank::Balanced)
            .clone();
        profile.throttle_interval_ms = throttle;
        ClusterMember {
            device: device(memory, 4, true),
            profile,
            estimated_improvement: 0.1,
            confidence: 0.8,
        }
    }

    #[test]
    fn test_cluster_centroid_is_member_mean() {
        let mut cluster = DeviceCluster::new(1, member(4.0, 24.0), 0);
        cluster.add_member(member(6.0, 28.0), 10);

        assert_eq!(cluster.centroid.memory_gb, 5.0);
        assert_eq!(cluster.last_updated_ms, 10);
        assert_eq!(cluster.devices().count(), 2);
        // 0.4 + 0.1 * 2 + 0.3 * 0.8
        assert!((cluster.confidence - 0.84).abs() < 1e-9);
    }

    #[test]
    fn test_cluster_confidence_is_capped() {
        let members = (0..10).map(|_| member(4.0, 24.0)).collect();
        let cluster = DeviceCluster::from_members(1, members, 0);
        assert_eq!(cluster.confidence, MAX_CLUSTER_CONFIDENCE);
    }

    #[test]
    fn test_aggregated_profile_averages_and_snaps() {
        let mut cluster = DeviceCluster::new(1, member(4.0, 24.0), 0);
        cluster.add_member(member(4.0, 30.0), 0);

        let base = ProfileCatalog::standard()
            .profile(ProfileRank::PowerSaver)
            .clone();
        let profile = cluster.aggregated_profile(&base).unwrap();
        // mean 27 snaps to the 2ms grid
        assert_eq!(profile.throttle_interval_ms, 28.0);
        assert_eq!(profile.rank, ProfileRank::PowerSaver);
        assert!(profile.name.contains("learned"));
    }

    #[test]
    fn test_cluster_name_uses_category_and_input() {
        let centroid = device(4.0, 4, true).with_capability(0.6).features();
        assert_eq!(cluster_name(&centroid), "Mid-Range touch");

        let centroid = device(1.0, 1, false).features();
        assert_eq!(cluster_name(&centroid), "Legacy pointer");
    }

    #[test]
    fn test_stats_first_batch_assigned_directly() {
        let mut stats = ParameterStats::default();
        stats.blend(30.0, 2.0, 3, 0.1);
        assert_eq!(stats.mean, 30.0);
        assert_eq!(stats.std_dev, 2.0);
        assert!((stats.confidence - 0.4).abs() < 1e-9);

        stats.blend(40.0, 2.0, 1, 0.1);
        assert!((stats.mean - 31.0).abs() < 1e-9);
        assert_eq!(stats.samples, 4);
    }

    #[test]
    fn test_stats_confidence_capped() {
        let mut stats = ParameterStats::default();
        for _ in 0..20 {
            stats.blend(10.0, 0.0, 1, 0.5);
        }
        assert_eq!(stats.confidence, MAX_STATS_CONFIDENCE);
    }

    #[test]
    fn test_global_update_is_weighted() {
        let base = ProfileCatalog::standard()
            .profile(ProfileRank::Balanced)
            .clone();
        let mut a = ParameterVector::from_profile(&base);
        let mut b = a;
        a.set(TunableParameter::ThrottleInterval, 20.0);
        b.set(TunableParameter::ThrottleInterval, 40.0);

        let mut global = GlobalOptimizations::default();
        global.update(&[(a, 3.0), (b, 1.0)], 0.1);

        assert!((global.throttle_interval.mean - 25.0).abs() < 1e-9);
        assert!(global.throttle_interval.std_dev > 0.0);
        assert_eq!(global.observations, 2);
        assert!(global.is_trained());
    }

    #[test]
    fn test_validate_rejects_bad_models() {
        let mut model = LearningModel::default();
        assert!(model.validate().is_ok());

        model.version = 7;
        assert!(matches!(
            model.validate(),
            Err(StoreError::VersionMismatch { found: 7, .. })
        ));

        let mut model = LearningModel::default();
        let id = model.allocate_cluster_id();
        model.clusters.push(DeviceCluster::new(id, member(4.0, 24.0), 0));
        model.clusters.push(DeviceCluster::new(id, member(4.0, 24.0), 0));
        assert!(matches!(model.validate(), Err(StoreError::Malformed { .. })));

        let mut model = LearningModel::default();
        model.learning_rate = 0.0;
        assert!(matches!(model.validate(), Err(StoreError::Malformed { .. })));
    }

    #[test]
    fn test_member_from_result() {
        let profile = ProfileCatalog::standard()
            .profile(ProfileRank::High)
            .clone();
        let mut result = OptimizationResult::failed(profile, "unused", 0);
        result.success = true;
        result.confidence = 0.7;
        result.improvement = ImprovementEstimate {
            overall: 0.12,
            estimated: true,
            ..Default::default()
        };
        let member = ClusterMember::from_result(device(8.0, 8, false), &result);
        assert_eq!(member.estimated_improvement, 0.12);
        assert_eq!(member.confidence, 0.7);
        assert_eq!(member.features().memory_gb, 8.0);
    }
}
