//! Pose and map estimation.

mod ekf;

pub use ekf::{EkfConfig, EkfEstimator, Landmark, RangeBearing};
