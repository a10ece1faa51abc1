//! Cross-device learning.
//!
//! Optimization results from many devices are queued with
//! [`CrossDeviceLearner::add_result`] and folded into a [`LearningModel`] by
//! a training pass:
//!
//! ```text
//! queue ──► Assign ──► Statistics ──► Recluster ──► commit + persist
//!           │            │               │
//!           │            │               └─ k-means over member features,
//!           │            │                  k = min(max, ceil(clusters / 2))
//!           │            └─ improvement-weighted global means
//!           └─ join best cluster above 0.7 similarity, else found a new one
//! ```
//!
//! A [`TrainingRun`] works on a copy of the model, one step per queued
//! result or k-means iteration. Nothing is visible to readers until
//! [`TrainingRun::finish`] commits. Dropping an unfinished run puts its batch
//! back at the head of the queue.
//!
//! Recommendations pick the most similar cluster above 0.6 similarity and
//! fall back to the global statistics.

mod config;
mod kmeans;
mod model;
mod recommendation;

pub use config::LearnerConfig;
pub use kmeans::{KMeans, KMeansOutcome};
pub use model::{
    cluster_name, ClusterMember, DeviceCluster, GlobalOptimizations, LearningModel,
    ParameterStats, INITIAL_STATS_CONFIDENCE, MAX_CLUSTER_CONFIDENCE, MAX_STATS_CONFIDENCE,
    MODEL_VERSION,
};
pub use recommendation::{CrossDeviceRecommendation, RecommendationSource};

use std::collections::HashMap;

use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio_util::sync::CancellationToken;

use crate::busy::{BusyFlag, BusyPermit};
use crate::device::DeviceInfo;
use crate::error::{TuningError, TuningResult};
use crate::optimizer::{OptimizationResult, ParameterVector};
use crate::profile::ProfileCatalog;
use crate::store::{self, SharedStore};

const OPERATION: &str = "training";

/// Minimum weight of a result in the global statistics.
const BASE_WEIGHT: f64 = 0.05;

#[derive(Debug, Clone)]
struct QueuedResult {
    device: DeviceInfo,
    result: OptimizationResult,
}

/// Owns the learning model and the queue of results awaiting training.
pub struct CrossDeviceLearner {
    config: LearnerConfig,
    catalog: ProfileCatalog,
    model: RwLock<LearningModel>,
    queue: Mutex<Vec<QueuedResult>>,
    rng: Mutex<StdRng>,
    busy: BusyFlag,
    store: Option<SharedStore>,
}

impl CrossDeviceLearner {
    /// In-memory learner with a fresh model.
    pub fn new(config: LearnerConfig) -> TuningResult<Self> {
        config.validate()?;
        let model = LearningModel::new(config.learning_rate, config.convergence_threshold);
        Ok(Self::with_model(config, model, None))
    }

    /// Learner backed by a store.
    ///
    /// A missing or unreadable model is logged and replaced by a fresh one.
    pub fn with_store(config: LearnerConfig, store: SharedStore) -> TuningResult<Self> {
        config.validate()?;
        let mut model: LearningModel = store::load_or_default(store.as_ref());
        model.learning_rate = config.learning_rate;
        model.convergence_threshold = config.convergence_threshold;
        tracing::debug!(
            clusters = model.clusters.len(),
            observations = model.global.observations,
            "Learning model loaded"
        );
        Ok(Self::with_model(config, model, Some(store)))
    }

    fn with_model(config: LearnerConfig, model: LearningModel, store: Option<SharedStore>) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(config.seed)),
            config,
            catalog: ProfileCatalog::standard(),
            model: RwLock::new(model),
            queue: Mutex::new(Vec::new()),
            busy: BusyFlag::new(OPERATION),
            store,
        }
    }

    pub fn with_catalog(mut self, catalog: ProfileCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    /// Queue a result for the next training pass.
    ///
    /// Failed results are ignored. Returns whether the result was queued.
    pub fn add_result(&self, device: &DeviceInfo, result: &OptimizationResult) -> bool {
        if !result.success {
            tracing::debug!(
                error = result.error.as_deref().unwrap_or("unknown"),
                "Ignoring failed optimization result"
            );
            return false;
        }
        let mut queue = self.queue.lock();
        queue.push(QueuedResult {
            device: device.clone(),
            result: result.clone(),
        });
        tracing::debug!(pending = queue.len(), "Optimization result queued");
        true
    }

    /// Results waiting for training.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_training(&self) -> bool {
        self.busy.is_busy()
    }

    /// Begin a training pass over the current queue.
    ///
    /// Fails fast with [`TuningError::ConcurrentOperation`] while another pass
    /// is running.
    pub fn start_training(&self) -> TuningResult<TrainingRun<'_>> {
        let permit = self.busy.try_acquire()?;
        let batch = std::mem::take(&mut *self.queue.lock());
        let model = self.model.read().clone();
        Ok(TrainingRun::new(self, permit, model, batch))
    }

    /// Run a full training pass synchronously.
    ///
    /// An empty queue finishes immediately with nothing processed. On
    /// cancellation the batch goes back on the queue and the model is left
    /// untouched.
    pub fn train(&self, cancel: &CancellationToken) -> TuningResult<TrainingReport> {
        let mut run = self.start_training()?;
        while !run.is_done() {
            if cancel.is_cancelled() {
                tracing::info!(phase = ?run.phase(), "Training cancelled");
                return Err(TuningError::Cancelled {
                    operation: OPERATION,
                });
            }
            run.step();
        }
        Ok(run.finish())
    }

    /// Like [`train`](Self::train), yielding to the scheduler between steps.
    pub async fn train_async(&self, cancel: &CancellationToken) -> TuningResult<TrainingReport> {
        let mut run = self.start_training()?;
        while !run.is_done() {
            if cancel.is_cancelled() {
                tracing::info!(phase = ?run.phase(), "Training cancelled");
                return Err(TuningError::Cancelled {
                    operation: OPERATION,
                });
            }
            run.step();
            tokio::task::yield_now().await;
        }
        Ok(run.finish())
    }

    /// Learned profile for `device`, if the model knows anything useful.
    pub fn recommend(&self, device: &DeviceInfo) -> Option<CrossDeviceRecommendation> {
        let model = self.model.read();
        let base = self.catalog.select(device.capability);
        let features = device.features();

        if let Some((cluster, similarity)) = model.best_match(&features) {
            if similarity > self.config.match_similarity {
                let profile = cluster.aggregated_profile(base)?;
                return Some(CrossDeviceRecommendation {
                    profile,
                    confidence: (cluster.confidence * similarity).clamp(0.0, 1.0),
                    source: RecommendationSource::Cluster {
                        id: cluster.id,
                        name: cluster.name.clone(),
                        similarity,
                    },
                });
            }
        }

        if !model.global.is_trained() {
            return None;
        }
        let profile = model
            .global
            .means()
            .snapped()
            .apply_to(base)
            .renamed(format!("{} (global)", base.rank));
        Some(CrossDeviceRecommendation {
            profile,
            confidence: model.global.throttle_interval.confidence,
            source: RecommendationSource::Global,
        })
    }

    /// Read-only copy of the model.
    pub fn snapshot(&self) -> LearningModel {
        self.model.read().clone()
    }

    /// Write the current model to the store.
    ///
    /// A learner without a store has nothing to do.
    pub fn persist(&self) -> TuningResult<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let model = self.model.read();
        store::save(store.as_ref(), &*model)?;
        Ok(())
    }

    /// Replace the model with the stored one.
    pub fn reload(&self) -> TuningResult<bool> {
        let Some(store) = &self.store else {
            return Ok(false);
        };
        match store::load::<LearningModel>(store.as_ref())? {
            Some(mut model) => {
                model.learning_rate = self.config.learning_rate;
                model.convergence_threshold = self.config.convergence_threshold;
                *self.model.write() = model;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Stage of a [`TrainingRun`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingPhase {
    /// Folding queued results into clusters, one per step.
    Assign,
    /// Updating global statistics.
    Statistics,
    /// K-means re-clustering, one iteration per step.
    Recluster,
    Done,
}

/// Summary of a committed training pass.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub processed: usize,
    pub clusters: usize,
    pub reclustered: bool,
    pub kmeans_iterations: u32,

    /// `false` when there was no store or the write failed.
    pub persisted: bool,
}

/// An in-flight training pass. Holds the learner's busy flag until dropped.
pub struct TrainingRun<'a> {
    learner: &'a CrossDeviceLearner,
    _permit: BusyPermit<'a>,
    model: LearningModel,
    batch: Vec<QueuedResult>,
    cursor: usize,
    phase: TrainingPhase,
    kmeans: Option<KMeans>,
    kmeans_iterations: u32,
    reclustered: bool,
    committed: bool,
}

impl<'a> TrainingRun<'a> {
    fn new(
        learner: &'a CrossDeviceLearner,
        permit: BusyPermit<'a>,
        model: LearningModel,
        batch: Vec<QueuedResult>,
    ) -> Self {
        let phase = if batch.is_empty() {
            TrainingPhase::Done
        } else {
            TrainingPhase::Assign
        };
        tracing::debug!(batch = batch.len(), "Training pass starting");
        Self {
            learner,
            _permit: permit,
            model,
            batch,
            cursor: 0,
            phase,
            kmeans: None,
            kmeans_iterations: 0,
            reclustered: false,
            committed: false,
        }
    }

    /// Advance by one unit of work. Returns the phase now current.
    pub fn step(&mut self) -> TrainingPhase {
        match self.phase {
            TrainingPhase::Assign => self.assign_next(),
            TrainingPhase::Statistics => self.update_statistics(),
            TrainingPhase::Recluster => self.recluster_step(),
            TrainingPhase::Done => {}
        }
        self.phase
    }

    fn assign_next(&mut self) {
        let Some(item) = self.batch.get(self.cursor) else {
            self.phase = TrainingPhase::Statistics;
            return;
        };
        let now_ms = crate::clock::unix_millis();
        let join_similarity = self.learner.config.join_similarity;
        let member = ClusterMember::from_result(item.device.clone(), &item.result);
        let features = member.features();

        let joined = self
            .model
            .clusters
            .iter_mut()
            .map(|c| {
                let similarity = c.centroid.similarity(&features);
                (c, similarity)
            })
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .filter(|(_, similarity)| *similarity > join_similarity);

        match joined {
            Some((cluster, similarity)) => {
                tracing::debug!(
                    cluster = cluster.id,
                    similarity = format!("{:.3}", similarity),
                    "Device joined cluster"
                );
                cluster.add_member(member, now_ms);
            }
            None => {
                let id = self.model.allocate_cluster_id();
                let cluster = DeviceCluster::new(id, member, now_ms);
                tracing::debug!(cluster = id, name = %cluster.name, "New cluster");
                self.model.clusters.push(cluster);
            }
        }

        self.cursor += 1;
        if self.cursor >= self.batch.len() {
            self.phase = TrainingPhase::Statistics;
        }
    }

    fn update_statistics(&mut self) {
        let weighted: Vec<(ParameterVector, f64)> = self
            .batch
            .iter()
            .map(|item| {
                let weight = item.result.improvement.overall.max(0.0) + BASE_WEIGHT;
                (ParameterVector::from_profile(&item.result.optimized), weight)
            })
            .collect();
        self.model
            .global
            .update(&weighted, self.model.learning_rate);

        self.phase = if self.model.clusters.len() >= 2 {
            TrainingPhase::Recluster
        } else {
            TrainingPhase::Done
        };
    }

    fn recluster_step(&mut self) {
        let threshold = self.model.convergence_threshold;
        let max_iterations = self.learner.config.max_kmeans_iterations;

        let kmeans = self.kmeans.get_or_insert_with(|| {
            let points = self
                .model
                .clusters
                .iter()
                .flat_map(|c| c.members.iter().map(|m| m.features()))
                .collect();
            let k = self
                .learner
                .config
                .max_clusters
                .min(self.model.clusters.len().div_ceil(2));
            KMeans::new(points, k, &mut *self.learner.rng.lock())
        });

        let movement = kmeans.step();
        self.kmeans_iterations += 1;
        if movement < threshold || self.kmeans_iterations >= max_iterations {
            tracing::debug!(
                iterations = self.kmeans_iterations,
                movement = format!("{:.4}", movement),
                "K-means finished"
            );
            self.rebuild_clusters();
            self.phase = TrainingPhase::Done;
        }
    }

    /// Replace the clusters with the final k-means grouping.
    ///
    /// Each group keeps the id of the old cluster that contributed most of
    /// its members, unless an earlier group already took it.
    fn rebuild_clusters(&mut self) {
        let Some(kmeans) = self.kmeans.take() else {
            return;
        };
        let now_ms = crate::clock::unix_millis();

        let members: Vec<(u64, ClusterMember)> = std::mem::take(&mut self.model.clusters)
            .into_iter()
            .flat_map(|c| {
                let id = c.id;
                c.members.into_iter().map(move |m| (id, m))
            })
            .collect();

        let mut groups: Vec<Vec<(u64, ClusterMember)>> = vec![Vec::new(); kmeans.k()];
        for ((old_id, member), &group) in members.into_iter().zip(kmeans.assignment()) {
            groups[group].push((old_id, member));
        }

        let mut used = Vec::new();
        for group in groups.into_iter().filter(|g| !g.is_empty()) {
            let mut counts: HashMap<u64, usize> = HashMap::new();
            for (old_id, _) in &group {
                *counts.entry(*old_id).or_default() += 1;
            }
            let preferred = counts
                .into_iter()
                .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
                .map(|(id, _)| id);
            let id = match preferred {
                Some(id) if !used.contains(&id) => id,
                _ => self.model.allocate_cluster_id(),
            };
            used.push(id);

            let members = group.into_iter().map(|(_, m)| m).collect();
            self.model
                .clusters
                .push(DeviceCluster::from_members(id, members, now_ms));
        }
        self.reclustered = true;
    }

    pub fn phase(&self) -> TrainingPhase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == TrainingPhase::Done
    }

    /// Queued results in this pass.
    pub fn batch_len(&self) -> usize {
        self.batch.len()
    }

    /// Commit the model, persist it and release the busy flag.
    ///
    /// Finishing early skips the remaining steps. A failed save is logged
    /// and reported in [`TrainingReport::persisted`].
    pub fn finish(mut self) -> TrainingReport {
        while !self.is_done() {
            self.step();
        }
        self.committed = true;

        let processed = self.batch.len();
        let mut model = std::mem::take(&mut self.model);
        if processed == 0 {
            return TrainingReport {
                processed,
                clusters: self.learner.model.read().clusters.len(),
                reclustered: false,
                kmeans_iterations: 0,
                persisted: false,
            };
        }

        model.last_training_ms = Some(crate::clock::unix_millis());
        let clusters = model.clusters.len();
        *self.learner.model.write() = model;

        let persisted = match &self.learner.store {
            Some(store) => {
                let model = self.learner.model.read();
                store::save_logged(store.as_ref(), &*model)
            }
            None => false,
        };

        tracing::info!(
            processed,
            clusters,
            reclustered = self.reclustered,
            kmeans_iterations = self.kmeans_iterations,
            persisted,
            "Training pass complete"
        );

        TrainingReport {
            processed,
            clusters,
            reclustered: self.reclustered,
            kmeans_iterations: self.kmeans_iterations,
            persisted,
        }
    }
}

impl Drop for TrainingRun<'_> {
    fn drop(&mut self) {
        if self.committed || self.batch.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.batch);
        let mut queue = self.learner.queue.lock();
        let newer = std::mem::replace(&mut *queue, batch);
        queue.extend(newer);
        tracing::debug!(requeued = queue.len(), "Training pass abandoned");
    }
}
