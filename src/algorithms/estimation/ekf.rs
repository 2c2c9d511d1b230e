//! EKF-SLAM: joint estimation of robot pose and point-landmark map.
//!
//! # State layout
//!
//! ```text
//! mu    = [x, y, θ, m0_x, m0_y, m1_x, m1_y, ...]     (3 + 2N)
//! sigma = matching (3 + 2N) × (3 + 2N) covariance
//! ```
//!
//! A landmark's identity is its index into the state vector: index i lives
//! at rows 3+2i and 3+2i+1. Indices are stable for the lifetime of the
//! filter — the state only ever grows, by exactly two rows per augmentation.
//!
//! Each cycle runs predict → update (per matched observation) → augment
//! (per new landmark), in that order, so augmentation always derives the
//! initial landmark position from the corrected pose.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::core::math::normalize_angle;
use crate::core::types::{Point2D, Pose2D};

/// Rows occupied by the pose at the head of the state vector.
const POSE_DIM: usize = 3;

/// Noise model for the filter.
///
/// Process noise scales with realized motion, so a stationary robot gains no
/// uncertainty; observation noise is the fixed sensor model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EkfConfig {
    /// Position variance added per meter traveled (m²/m).
    #[serde(default = "default_trans_noise")]
    pub trans_noise_per_meter: f32,

    /// Heading variance added per radian turned (rad²/rad).
    #[serde(default = "default_rot_noise")]
    pub rot_noise_per_rad: f32,

    /// Heading variance added per meter traveled (wheel slip, rad²/m).
    #[serde(default = "default_rot_noise_per_meter")]
    pub rot_noise_per_meter: f32,

    /// Range measurement variance (m²).
    #[serde(default = "default_range_var")]
    pub range_var: f32,

    /// Bearing measurement variance (rad²).
    #[serde(default = "default_bearing_var")]
    pub bearing_var: f32,
}

fn default_trans_noise() -> f32 {
    0.02
}
fn default_rot_noise() -> f32 {
    0.05
}
fn default_rot_noise_per_meter() -> f32 {
    0.01
}
fn default_range_var() -> f32 {
    0.01
}
fn default_bearing_var() -> f32 {
    0.0005
}

impl Default for EkfConfig {
    fn default() -> Self {
        Self {
            trans_noise_per_meter: default_trans_noise(),
            rot_noise_per_rad: default_rot_noise(),
            rot_noise_per_meter: default_rot_noise_per_meter(),
            range_var: default_range_var(),
            bearing_var: default_bearing_var(),
        }
    }
}

/// A range-bearing observation in the robot frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeBearing {
    /// Distance to the landmark, meters.
    pub range: f32,
    /// Bearing relative to the robot heading, radians.
    pub bearing: f32,
}

impl RangeBearing {
    pub fn new(range: f32, bearing: f32) -> Self {
        Self { range, bearing }
    }

    /// Observation of a point expressed in the robot's local frame.
    pub fn from_local_point(p: &Point2D) -> Self {
        Self {
            range: p.norm(),
            bearing: p.y.atan2(p.x),
        }
    }
}

/// Snapshot of one mapped landmark, for telemetry and inspection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Landmark {
    /// Stable state-vector index.
    pub id: usize,
    /// Estimated position in the world frame.
    pub position: Point2D,
    /// Trace of the landmark's 2×2 covariance block.
    pub uncertainty: f32,
}

/// Extended Kalman filter over pose and landmark map.
#[derive(Debug, Clone)]
pub struct EkfEstimator {
    config: EkfConfig,
    mu: DVector<f32>,
    sigma: DMatrix<f32>,
    n_landmarks: usize,
}

impl EkfEstimator {
    /// Create a filter at `initial` with small initial pose uncertainty.
    pub fn new(initial: Pose2D, config: EkfConfig) -> Self {
        let mut mu = DVector::zeros(POSE_DIM);
        mu[0] = initial.x;
        mu[1] = initial.y;
        mu[2] = initial.theta;
        let sigma = DMatrix::from_diagonal(&DVector::from_vec(vec![0.01, 0.01, 0.001]));
        Self {
            config,
            mu,
            sigma,
            n_landmarks: 0,
        }
    }

    pub fn config(&self) -> &EkfConfig {
        &self.config
    }

    /// Current pose estimate.
    pub fn pose(&self) -> Pose2D {
        Pose2D::new(self.mu[0], self.mu[1], self.mu[2])
    }

    /// Pose covariance block (3×3).
    pub fn pose_covariance(&self) -> DMatrix<f32> {
        self.sigma.view((0, 0), (POSE_DIM, POSE_DIM)).clone_owned()
    }

    pub fn landmark_count(&self) -> usize {
        self.n_landmarks
    }

    /// State dimension (3 + 2N).
    pub fn dim(&self) -> usize {
        self.mu.len()
    }

    /// Estimated position of landmark `i`.
    pub fn landmark(&self, i: usize) -> Option<Point2D> {
        if i >= self.n_landmarks {
            return None;
        }
        let base = POSE_DIM + 2 * i;
        Some(Point2D::new(self.mu[base], self.mu[base + 1]))
    }

    /// Covariance block (2×2) of landmark `i`.
    pub fn landmark_covariance(&self, i: usize) -> Option<DMatrix<f32>> {
        if i >= self.n_landmarks {
            return None;
        }
        let base = POSE_DIM + 2 * i;
        Some(self.sigma.view((base, base), (2, 2)).clone_owned())
    }

    /// Snapshot of every mapped landmark.
    pub fn landmarks(&self) -> Vec<Landmark> {
        (0..self.n_landmarks)
            .map(|i| {
                let base = POSE_DIM + 2 * i;
                Landmark {
                    id: i,
                    position: Point2D::new(self.mu[base], self.mu[base + 1]),
                    uncertainty: self.sigma[(base, base)] + self.sigma[(base + 1, base + 1)],
                }
            })
            .collect()
    }

    /// Predict step: apply an odometry delta (robot local frame).
    ///
    /// The pose mean composes with the delta; the pose covariance block and
    /// the pose–landmark cross blocks propagate through the motion Jacobian;
    /// landmark means and the landmark–landmark block are untouched. A zero
    /// delta is a no-op, matching the motion-scaled process noise.
    pub fn predict(&mut self, delta: &Pose2D) {
        if delta.x == 0.0 && delta.y == 0.0 && delta.theta == 0.0 {
            return;
        }

        let prior = self.pose();
        let next = prior.compose(delta);
        // Realized global displacement, which is also what the heading
        // column of the motion Jacobian is built from.
        let gx = next.x - prior.x;
        let gy = next.y - prior.y;

        self.mu[0] = next.x;
        self.mu[1] = next.y;
        self.mu[2] = next.theta;

        // Jacobian of the composed pose w.r.t. the prior pose.
        #[rustfmt::skip]
        let g_pose = DMatrix::from_row_slice(POSE_DIM, POSE_DIM, &[
            1.0, 0.0, -gy,
            0.0, 1.0,  gx,
            0.0, 0.0,  1.0,
        ]);

        let dist = (delta.x * delta.x + delta.y * delta.y).sqrt();
        let rot = delta.theta.abs();
        let process_noise = DMatrix::from_diagonal(&DVector::from_vec(vec![
            self.config.trans_noise_per_meter * dist,
            self.config.trans_noise_per_meter * dist,
            self.config.rot_noise_per_rad * rot + self.config.rot_noise_per_meter * dist,
        ]));

        let sigma_rr = self.pose_covariance();
        let new_rr = &g_pose * &sigma_rr * g_pose.transpose() + process_noise;
        self.sigma
            .view_mut((0, 0), (POSE_DIM, POSE_DIM))
            .copy_from(&new_rr);

        let m = 2 * self.n_landmarks;
        if m > 0 {
            let sigma_rm = self.sigma.view((0, POSE_DIM), (POSE_DIM, m)).clone_owned();
            let new_rm = &g_pose * &sigma_rm;
            self.sigma
                .view_mut((0, POSE_DIM), (POSE_DIM, m))
                .copy_from(&new_rm);
            self.sigma
                .view_mut((POSE_DIM, 0), (m, POSE_DIM))
                .copy_from(&new_rm.transpose());
        }
    }

    /// Expected range-bearing observation of landmark `i` from the current pose.
    pub fn expected_observation(&self, i: usize) -> Option<RangeBearing> {
        self.observation_terms(i).map(|t| t.predicted)
    }

    /// Innovation covariance S = HΣHᵀ + Q for landmark `i`.
    pub fn innovation_covariance(&self, i: usize) -> Option<DMatrix<f32>> {
        let terms = self.observation_terms(i)?;
        Some(self.innovation_cov_from(&terms))
    }

    /// Mahalanobis distance of `obs` against landmark `i`.
    ///
    /// `None` when the landmark index is out of range, the geometry is
    /// degenerate, or the innovation covariance cannot be inverted.
    pub fn mahalanobis(&self, obs: &RangeBearing, i: usize) -> Option<f32> {
        let terms = self.observation_terms(i)?;
        let s = self.innovation_cov_from(&terms);
        let s_inv = invert_2x2(&s)?;
        let nu = DVector::from_vec(vec![
            obs.range - terms.predicted.range,
            normalize_angle(obs.bearing - terms.predicted.bearing),
        ]);
        let d2 = (nu.transpose() * s_inv * nu)[(0, 0)];
        Some(d2.max(0.0).sqrt())
    }

    /// Update step for one matched observation.
    ///
    /// Returns `false` — skipping only this observation — when the innovation
    /// covariance is near singular; the caller's cycle continues.
    pub fn update(&mut self, obs: &RangeBearing, i: usize) -> bool {
        let terms = match self.observation_terms(i) {
            Some(t) => t,
            None => {
                log::warn!("ekf: update against invalid landmark {i}, skipping");
                return false;
            }
        };

        let n = self.mu.len();
        let h = self.observation_matrix(&terms);
        let s = self.innovation_cov_from(&terms);

        let s_inv = match invert_2x2(&s) {
            Some(inv) => inv,
            None => {
                log::warn!("ekf: near-singular innovation covariance for landmark {i}, skipping observation");
                return false;
            }
        };

        let nu = DVector::from_vec(vec![
            obs.range - terms.predicted.range,
            normalize_angle(obs.bearing - terms.predicted.bearing),
        ]);

        let gain = &self.sigma * h.transpose() * &s_inv;
        self.mu += &gain * &nu;
        self.mu[2] = normalize_angle(self.mu[2]);

        let identity = DMatrix::<f32>::identity(n, n);
        self.sigma = (identity - &gain * &h) * &self.sigma;
        // Multiplication order drifts off symmetry; restore the invariant.
        self.sigma = (&self.sigma + self.sigma.transpose()) * 0.5;

        true
    }

    /// Augment step: admit a new landmark from an observation taken at the
    /// current pose. Returns the new landmark's stable index.
    ///
    /// The state grows by exactly two rows. The new block's covariance is the
    /// pose uncertainty pushed through the initialization Jacobian plus the
    /// sensor noise; cross terms against the pose and every existing landmark
    /// are filled in so later corrections propagate across the whole map.
    pub fn augment(&mut self, obs: &RangeBearing) -> usize {
        let (x, y, theta) = (self.mu[0], self.mu[1], self.mu[2]);
        let angle = theta + obs.bearing;
        let (sin_a, cos_a) = angle.sin_cos();

        let old_n = self.mu.len();
        let new_n = old_n + 2;

        let mut mu = DVector::zeros(new_n);
        mu.rows_mut(0, old_n).copy_from(&self.mu);
        mu[old_n] = x + obs.range * cos_a;
        mu[old_n + 1] = y + obs.range * sin_a;
        self.mu = mu;

        // Jacobians of the initialization w.r.t. pose and observation.
        #[rustfmt::skip]
        let g_pose = DMatrix::from_row_slice(2, POSE_DIM, &[
            1.0, 0.0, -obs.range * sin_a,
            0.0, 1.0,  obs.range * cos_a,
        ]);
        #[rustfmt::skip]
        let g_obs = DMatrix::from_row_slice(2, 2, &[
            cos_a, -obs.range * sin_a,
            sin_a,  obs.range * cos_a,
        ]);
        let q = DMatrix::from_diagonal(&DVector::from_vec(vec![
            self.config.range_var,
            self.config.bearing_var,
        ]));

        let mut sigma = DMatrix::zeros(new_n, new_n);
        sigma
            .view_mut((0, 0), (old_n, old_n))
            .copy_from(&self.sigma);

        // Cross covariance of the new landmark against everything prior,
        // pose block included: Σ_new,j = G_pose · Σ_pose,j.
        let sigma_pose_rows = self.sigma.view((0, 0), (POSE_DIM, old_n)).clone_owned();
        let cross = &g_pose * &sigma_pose_rows;
        sigma.view_mut((old_n, 0), (2, old_n)).copy_from(&cross);
        sigma
            .view_mut((0, old_n), (old_n, 2))
            .copy_from(&cross.transpose());

        let sigma_rr = self.sigma.view((0, 0), (POSE_DIM, POSE_DIM)).clone_owned();
        let block = &g_pose * &sigma_rr * g_pose.transpose() + &g_obs * &q * g_obs.transpose();
        sigma.view_mut((old_n, old_n), (2, 2)).copy_from(&block);

        self.sigma = sigma;
        self.n_landmarks += 1;
        self.n_landmarks - 1
    }

    /// Predicted observation plus the Jacobian ingredients for landmark `i`.
    fn observation_terms(&self, i: usize) -> Option<ObservationTerms> {
        if i >= self.n_landmarks {
            return None;
        }
        let base = POSE_DIM + 2 * i;
        let dx = self.mu[base] - self.mu[0];
        let dy = self.mu[base + 1] - self.mu[1];
        let q = dx * dx + dy * dy;
        if q < 1e-12 {
            // Landmark estimated on top of the robot; bearing undefined.
            return None;
        }
        let sqrt_q = q.sqrt();
        Some(ObservationTerms {
            index: i,
            predicted: RangeBearing {
                range: sqrt_q,
                bearing: normalize_angle(dy.atan2(dx) - self.mu[2]),
            },
            dx,
            dy,
            q,
            sqrt_q,
        })
    }

    /// Sparse observation Jacobian H (2 × dim), nonzero only in the pose
    /// block and the observed landmark's block.
    fn observation_matrix(&self, terms: &ObservationTerms) -> DMatrix<f32> {
        let n = self.mu.len();
        let base = POSE_DIM + 2 * terms.index;
        let (dx, dy, q, sqrt_q) = (terms.dx, terms.dy, terms.q, terms.sqrt_q);

        let mut h = DMatrix::zeros(2, n);
        h[(0, 0)] = -dx / sqrt_q;
        h[(0, 1)] = -dy / sqrt_q;
        h[(1, 0)] = dy / q;
        h[(1, 1)] = -dx / q;
        h[(1, 2)] = -1.0;
        h[(0, base)] = dx / sqrt_q;
        h[(0, base + 1)] = dy / sqrt_q;
        h[(1, base)] = -dy / q;
        h[(1, base + 1)] = dx / q;
        h
    }

    fn innovation_cov_from(&self, terms: &ObservationTerms) -> DMatrix<f32> {
        // Dense H for clarity; the state stays small enough that exploiting
        // the sparsity here has not been worth it.
        let h = self.observation_matrix(terms);
        let q = DMatrix::from_diagonal(&DVector::from_vec(vec![
            self.config.range_var,
            self.config.bearing_var,
        ]));
        &h * &self.sigma * h.transpose() + q
    }
}

struct ObservationTerms {
    index: usize,
    predicted: RangeBearing,
    dx: f32,
    dy: f32,
    q: f32,
    sqrt_q: f32,
}

/// Inverse of a 2×2 matrix, `None` when the determinant is negligible.
fn invert_2x2(m: &DMatrix<f32>) -> Option<DMatrix<f32>> {
    let det = m[(0, 0)] * m[(1, 1)] - m[(0, 1)] * m[(1, 0)];
    if det.abs() < 1e-9 {
        return None;
    }
    let inv_det = 1.0 / det;
    Some(DMatrix::from_row_slice(
        2,
        2,
        &[
            m[(1, 1)] * inv_det,
            -m[(0, 1)] * inv_det,
            -m[(1, 0)] * inv_det,
            m[(0, 0)] * inv_det,
        ],
    ))
}
