//! Sensor processing layer.

pub mod odometry;

pub use odometry::{OdometryConfig, OdometryIntegrator, OdometryUpdate};
