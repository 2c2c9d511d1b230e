//! Data association: matching extracted landmarks against the map.
//!
//! Each observation is scored against every mapped landmark by Mahalanobis
//! distance under the filter's innovation covariance, falling back to plain
//! Euclidean distance in the world frame when that covariance cannot be
//! inverted. Candidate pairs inside the gate are then matched greedily in
//! ascending-distance order with removal, so association is strictly
//! one-to-one within a cycle: no two observations may claim the same
//! landmark. Anything left unmatched is a new-landmark candidate.

use serde::{Deserialize, Serialize};

use crate::algorithms::estimation::{EkfEstimator, RangeBearing};
use crate::algorithms::extraction::LandmarkObservation;

/// Configuration for the associator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AssociationConfig {
    /// Mahalanobis gate: observations farther than this from every landmark
    /// are classified new.
    #[serde(default = "default_gate")]
    pub gate: f32,

    /// Euclidean gate in meters, used only on the fallback path.
    #[serde(default = "default_euclidean_gate")]
    pub euclidean_gate: f32,
}

fn default_gate() -> f32 {
    3.0
}

fn default_euclidean_gate() -> f32 {
    0.5
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            gate: default_gate(),
            euclidean_gate: default_euclidean_gate(),
        }
    }
}

/// Result of associating one cycle's observations with the map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Association {
    /// (observation index, landmark index) pairs, one-to-one.
    pub matches: Vec<(usize, usize)>,
    /// Observation indices with no landmark inside the gate.
    pub new_landmarks: Vec<usize>,
}

/// Gated nearest-neighbour data associator.
#[derive(Debug, Clone)]
pub struct DataAssociator {
    config: AssociationConfig,
}

impl DataAssociator {
    pub fn new(config: AssociationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AssociationConfig {
        &self.config
    }

    /// Associate local-frame observations against the filter's landmark map.
    pub fn associate(
        &self,
        ekf: &EkfEstimator,
        observations: &[LandmarkObservation],
    ) -> Association {
        let n_landmarks = ekf.landmark_count();
        if n_landmarks == 0 {
            return Association {
                matches: Vec::new(),
                new_landmarks: (0..observations.len()).collect(),
            };
        }

        let pose = ekf.pose();

        // All gated candidate pairs across the cycle.
        let mut candidates: Vec<(f32, usize, usize)> = Vec::new();

        for (obs_idx, obs) in observations.iter().enumerate() {
            let rb = RangeBearing::from_local_point(&obs.position);
            let world = pose.transform_point(&obs.position);

            for lm_idx in 0..n_landmarks {
                let score = match ekf.mahalanobis(&rb, lm_idx) {
                    Some(d) if d < self.config.gate => Some(d),
                    Some(_) => None,
                    None => {
                        // Singular innovation covariance: fall back to
                        // world-frame Euclidean distance with its own gate.
                        let lm = match ekf.landmark(lm_idx) {
                            Some(p) => p,
                            None => continue,
                        };
                        let d = world.distance(&lm);
                        (d < self.config.euclidean_gate).then_some(d)
                    }
                };
                if let Some(d) = score {
                    candidates.push((d, obs_idx, lm_idx));
                }
            }
        }

        candidates.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut obs_taken = vec![false; observations.len()];
        let mut lm_taken = vec![false; n_landmarks];
        let mut matches = Vec::new();

        for (_, obs_idx, lm_idx) in candidates {
            if obs_taken[obs_idx] || lm_taken[lm_idx] {
                continue;
            }
            obs_taken[obs_idx] = true;
            lm_taken[lm_idx] = true;
            matches.push((obs_idx, lm_idx));
        }

        let new_landmarks = (0..observations.len())
            .filter(|&i| !obs_taken[i])
            .collect();

        Association {
            matches,
            new_landmarks,
        }
    }
}
