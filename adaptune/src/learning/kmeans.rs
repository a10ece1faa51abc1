//! Lloyd's k-means over device feature vectors.
//!
//! Centroids start at `k` distinct points drawn from the caller's RNG, so a
//! seeded RNG gives reproducible clusterings. Each [`KMeans::step`] assigns
//! every point to its nearest centroid, moves each centroid to the mean of
//! its points and reports the largest centroid movement.

use rand::Rng;

use crate::device::DeviceFeatures;

/// Result of [`KMeans::run`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeansOutcome {
    pub iterations: u32,
    pub converged: bool,
    pub last_movement: f64,
}

/// K-means state over an owned point set.
#[derive(Debug, Clone)]
pub struct KMeans {
    points: Vec<DeviceFeatures>,
    centroids: Vec<DeviceFeatures>,
    assignment: Vec<usize>,
}

impl KMeans {
    /// Pick `k` distinct points as initial centroids.
    ///
    /// `k` is clamped to `1..=points.len()`; an empty point set has no
    /// centroids.
    pub fn new<R: Rng + ?Sized>(points: Vec<DeviceFeatures>, k: usize, rng: &mut R) -> Self {
        let k = k.clamp(1, points.len().max(1)).min(points.len());
        let centroids = rand::seq::index::sample(rng, points.len(), k)
            .iter()
            .map(|i| points[i])
            .collect();
        let assignment = vec![0; points.len()];
        Self {
            points,
            centroids,
            assignment,
        }
    }

    /// One assign + update pass. Returns the largest centroid movement.
    pub fn step(&mut self) -> f64 {
        if self.centroids.is_empty() {
            return 0.0;
        }

        for (point, slot) in self.points.iter().zip(self.assignment.iter_mut()) {
            *slot = nearest(&self.centroids, point);
        }

        let mut movement: f64 = 0.0;
        for (index, centroid) in self.centroids.iter_mut().enumerate() {
            let members = self
                .points
                .iter()
                .zip(&self.assignment)
                .filter(|(_, a)| **a == index)
                .map(|(p, _)| p);
            // An empty centroid stays where it is.
            if let Some(mean) = DeviceFeatures::mean(members) {
                movement = movement.max(centroid.euclidean_distance(&mean));
                *centroid = mean;
            }
        }
        movement
    }

    /// Step until movement drops below `threshold` or `max_iterations` pass.
    pub fn run(&mut self, max_iterations: u32, threshold: f64) -> KMeansOutcome {
        let mut outcome = KMeansOutcome {
            iterations: 0,
            converged: false,
            last_movement: 0.0,
        };
        while outcome.iterations < max_iterations {
            outcome.last_movement = self.step();
            outcome.iterations += 1;
            if outcome.last_movement < threshold {
                outcome.converged = true;
                break;
            }
        }
        outcome
    }

    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    pub fn centroids(&self) -> &[DeviceFeatures] {
        &self.centroids
    }

    /// Centroid index per point, valid after the first step.
    pub fn assignment(&self) -> &[usize] {
        &self.assignment
    }

    pub fn points(&self) -> &[DeviceFeatures] {
        &self.points
    }
}

fn nearest(centroids: &[DeviceFeatures], point: &DeviceFeatures) -> usize {
    centroids
        .iter()
        .enumerate()
        .map(|(i, c)| (i, c.euclidean_distance(point)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
        .unwrap_or(0)
}
