use std::fmt;

use serde::{Deserialize, Serialize};

use crate::profile::PerformanceProfile;

/// Where a recommendation came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecommendationSource {
    /// A cluster whose centroid is similar to the device.
    Cluster {
        id: u64,
        name: String,
        similarity: f64,
    },
    /// Global weighted means, used when no cluster matches.
    Global,
}

impl fmt::Display for RecommendationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecommendationSource::Cluster {
                id,
                name,
                similarity,
            } => write!(f, "cluster {} '{}' (similarity {:.2})", id, name, similarity),
            RecommendationSource::Global => write!(f, "global statistics"),
        }
    }
}

/// A profile learned from other devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossDeviceRecommendation {
    pub profile: PerformanceProfile,

    /// 0.0 - 1.0
    pub confidence: f64,

    pub source: RecommendationSource,
}

impl CrossDeviceRecommendation {
    pub fn is_from_cluster(&self) -> bool {
        matches!(self.source, RecommendationSource::Cluster { .. })
    }
}
