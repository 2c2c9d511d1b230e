//! Wheel odometry from encoder ticks.
//!
//! Converts differential-drive encoder readings into pose deltas in the
//! robot's local frame, plus the matching twist for telemetry.
//!
//! # Differential drive kinematics
//!
//! - Both wheels forward equally → straight-line motion
//! - Wheels in opposite directions → rotation in place
//! - Unequal wheel motion → arc motion
//!
//! The local frame is x = forward, y = left, theta = counter-clockwise.

use serde::{Deserialize, Serialize};

use crate::core::types::{EncoderReading, Pose2D, Twist2D};

/// Configuration for the odometry integrator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OdometryConfig {
    /// Encoder ticks per meter of wheel travel.
    #[serde(default = "default_ticks_per_meter")]
    pub ticks_per_meter: f32,

    /// Distance between wheel centers in meters.
    #[serde(default = "default_wheel_base")]
    pub wheel_base: f32,
}

fn default_ticks_per_meter() -> f32 {
    1000.0
}

fn default_wheel_base() -> f32 {
    0.248
}

impl Default for OdometryConfig {
    fn default() -> Self {
        Self {
            ticks_per_meter: default_ticks_per_meter(),
            wheel_base: default_wheel_base(),
        }
    }
}

/// One integration step: the local-frame pose delta and the velocities
/// realized over the step interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OdometryUpdate {
    /// Pose change in the robot's local frame at the start of the motion.
    pub delta: Pose2D,
    /// Linear/angular velocity over the step (delta / dt).
    pub twist: Twist2D,
}

/// Dead-reckoning integrator over encoder counters.
///
/// Holds the previous reading and emits deltas; the first reading only
/// initializes state. Counter wraparound is handled by
/// [`EncoderReading::delta_ticks`].
#[derive(Debug)]
pub struct OdometryIntegrator {
    config: OdometryConfig,
    last: Option<EncoderReading>,
}

impl OdometryIntegrator {
    pub fn new(config: OdometryConfig) -> Self {
        Self { config, last: None }
    }

    /// Update with a fresh encoder reading taken `dt` seconds after the last.
    ///
    /// Returns `None` on the first call (state initialization) and for
    /// `dt <= 0`, which is rejected rather than divided by. A rejected
    /// reading still replaces the stored counters so a stalled clock does
    /// not accumulate into a giant delta on recovery.
    pub fn update(&mut self, reading: EncoderReading, dt: f32) -> Option<OdometryUpdate> {
        let previous = self.last.replace(reading);
        let previous = previous?;

        if dt <= 0.0 {
            log::warn!("odometry: non-positive dt ({dt:.6}s), skipping integration");
            return None;
        }

        let (dl_ticks, dr_ticks) = reading.delta_ticks(&previous);
        let d_left = dl_ticks as f32 / self.config.ticks_per_meter;
        let d_right = dr_ticks as f32 / self.config.ticks_per_meter;

        let delta = self.drive_delta(d_left, d_right);
        let twist = Twist2D::new(
            (d_left + d_right) / 2.0 / dt,
            (d_right - d_left) / self.config.wheel_base / dt,
        );

        Some(OdometryUpdate { delta, twist })
    }

    /// Pose delta from per-wheel displacements in meters.
    fn drive_delta(&self, d_left: f32, d_right: f32) -> Pose2D {
        // Below this the arc radius is numerically meaningless.
        const STRAIGHT_THRESHOLD: f32 = 1e-6;

        let d_theta = (d_right - d_left) / self.config.wheel_base;

        if d_theta.abs() < STRAIGHT_THRESHOLD {
            Pose2D::new((d_left + d_right) / 2.0, 0.0, 0.0)
        } else {
            // Arc about the instantaneous center of curvature.
            let radius = (d_left + d_right) / (2.0 * d_theta);
            Pose2D::new(
                radius * d_theta.sin(),
                radius * (1.0 - d_theta.cos()),
                d_theta,
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    fn test_config() -> OdometryConfig {
        OdometryConfig {
            ticks_per_meter: 1000.0,
            wheel_base: 0.2,
        }
    }

    #[test]
    fn first_reading_initializes_only() {
        let mut odom = OdometryIntegrator::new(test_config());
        assert!(odom.update(EncoderReading::new(0, 0), 0.5).is_none());
    }

    #[test]
    fn equal_deltas_translate_straight() {
        let mut odom = OdometryIntegrator::new(test_config());
        odom.update(EncoderReading::new(0, 0), 0.5);

        let up = odom.update(EncoderReading::new(1000, 1000), 0.5).unwrap();
        assert_relative_eq!(up.delta.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(up.delta.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(up.delta.theta, 0.0, epsilon = 1e-6);
        assert_relative_eq!(up.twist.linear, 2.0, epsilon = 1e-6);
        assert_relative_eq!(up.twist.angular, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn zero_dt_is_rejected() {
        let mut odom = OdometryIntegrator::new(test_config());
        odom.update(EncoderReading::new(0, 0), 0.5);
        assert!(odom.update(EncoderReading::new(500, 500), 0.0).is_none());
        // The stored counters still advanced; the next step only sees
        // motion since the rejected reading.
        let up = odom.update(EncoderReading::new(600, 600), 0.5).unwrap();
        assert_relative_eq!(up.delta.x, 0.1, epsilon = 1e-6);
    }

    #[test]
    fn rotation_in_place() {
        let mut odom = OdometryIntegrator::new(test_config());
        odom.update(EncoderReading::new(10_000, 10_000), 0.5);

        // Arc per wheel for a 90° CCW turn: (wheel_base / 2) * π/2.
        let ticks = (0.1 * FRAC_PI_2 * 1000.0) as i32;
        let up = odom
            .update(
                EncoderReading::new((10_000 - ticks) as u32, (10_000 + ticks) as u32),
                0.5,
            )
            .unwrap();
        assert_relative_eq!(up.delta.theta, FRAC_PI_2, epsilon = 0.01);
        assert!(up.delta.x.abs() < 0.01);
    }

    #[test]
    fn counter_wraparound_reads_as_small_forward_step() {
        let mut odom = OdometryIntegrator::new(test_config());
        odom.update(EncoderReading::new(u32::MAX - 49, u32::MAX - 49), 0.5);

        let up = odom.update(EncoderReading::new(50, 50), 0.5).unwrap();
        // 100 ticks of travel, straight.
        assert_relative_eq!(up.delta.x, 0.1, epsilon = 1e-4);
        assert_relative_eq!(up.delta.theta, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn backward_motion_is_negative() {
        let mut odom = OdometryIntegrator::new(test_config());
        odom.update(EncoderReading::new(1000, 1000), 0.5);
        let up = odom.update(EncoderReading::new(900, 900), 0.5).unwrap();
        assert_relative_eq!(up.delta.x, -0.1, epsilon = 1e-6);
        assert!(up.twist.linear < 0.0);
    }

    #[test]
    fn arc_motion_bends_left_when_right_wheel_leads() {
        let mut odom = OdometryIntegrator::new(test_config());
        odom.update(EncoderReading::new(0, 0), 0.5);
        let up = odom.update(EncoderReading::new(100, 200), 0.5).unwrap();
        assert!(up.delta.x > 0.0);
        assert!(up.delta.y > 0.0);
        assert!(up.delta.theta > 0.0);
    }
}
