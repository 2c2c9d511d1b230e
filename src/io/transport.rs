//! Telemetry messages and the publisher abstraction.
//!
//! The publish/subscribe transport itself lives outside this crate; the loop
//! only hands it these message structs once per tick.

use serde::{Deserialize, Serialize};

use crate::core::types::{LaserScan, Pose2D, Twist2D};

/// Heading-only orientation, the two nonzero components of a yaw quaternion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeadingQuaternion {
    pub z: f32,
    pub w: f32,
}

impl HeadingQuaternion {
    /// Encode a planar heading: z = sin(θ/2), w = cos(θ/2).
    pub fn from_theta(theta: f32) -> Self {
        let (z, w) = (theta / 2.0).sin_cos();
        Self { z, w }
    }
}

/// Pose estimate with its twist, as published each tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OdometryMessage {
    /// Frame the pose is expressed in.
    pub frame_id: String,
    /// Frame of the robot base.
    pub child_frame_id: String,
    pub x: f32,
    pub y: f32,
    pub orientation: HeadingQuaternion,
    pub twist: Twist2D,
}

impl OdometryMessage {
    pub fn new(frame_id: &str, child_frame_id: &str, pose: &Pose2D, twist: Twist2D) -> Self {
        Self {
            frame_id: frame_id.to_string(),
            child_frame_id: child_frame_id.to_string(),
            x: pose.x,
            y: pose.y,
            orientation: HeadingQuaternion::from_theta(pose.theta),
            twist,
        }
    }
}

/// Transform broadcast between two named coordinate frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformMessage {
    pub parent_frame: String,
    pub child_frame: String,
    pub x: f32,
    pub y: f32,
    pub orientation: HeadingQuaternion,
}

impl TransformMessage {
    pub fn new(parent_frame: &str, child_frame: &str, pose: &Pose2D) -> Self {
        Self {
            parent_frame: parent_frame.to_string(),
            child_frame: child_frame.to_string(),
            x: pose.x,
            y: pose.y,
            orientation: HeadingQuaternion::from_theta(pose.theta),
        }
    }
}

/// Scan passthrough with the configured geometry bounds attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanMessage {
    pub frame_id: String,
    pub scan: LaserScan,
}

/// Outbound telemetry sink, one publish per message kind per tick.
pub trait TelemetryPublisher {
    fn publish_odometry(&mut self, msg: &OdometryMessage) -> crate::error::Result<()>;
    fn publish_transform(&mut self, msg: &TransformMessage) -> crate::error::Result<()>;
    fn publish_scan(&mut self, msg: &ScanMessage) -> crate::error::Result<()>;
}

/// Publisher that logs at debug level and drops the messages.
///
/// Stands in when no transport is attached to the node.
#[derive(Debug, Default)]
pub struct LogPublisher;

impl TelemetryPublisher for LogPublisher {
    fn publish_odometry(&mut self, msg: &OdometryMessage) -> crate::error::Result<()> {
        log::debug!(
            "odom: ({:.3}, {:.3}) twist ({:.3} m/s, {:.3} rad/s)",
            msg.x,
            msg.y,
            msg.twist.linear,
            msg.twist.angular
        );
        Ok(())
    }

    fn publish_transform(&mut self, msg: &TransformMessage) -> crate::error::Result<()> {
        log::debug!(
            "tf {} -> {}: ({:.3}, {:.3})",
            msg.parent_frame,
            msg.child_frame,
            msg.x,
            msg.y
        );
        Ok(())
    }

    fn publish_scan(&mut self, msg: &ScanMessage) -> crate::error::Result<()> {
        log::debug!(
            "scan [{}]: {} ranges, {} valid",
            msg.frame_id,
            msg.scan.len(),
            msg.scan.valid_count()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::PI;

    #[test]
    fn quaternion_encodes_heading() {
        let q = HeadingQuaternion::from_theta(0.0);
        assert_relative_eq!(q.z, 0.0);
        assert_relative_eq!(q.w, 1.0);

        let q = HeadingQuaternion::from_theta(PI);
        assert_relative_eq!(q.z, 1.0, epsilon = 1e-6);
        assert_relative_eq!(q.w, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn odometry_message_carries_pose_and_twist() {
        let pose = Pose2D::new(1.0, 2.0, PI / 2.0);
        let msg = OdometryMessage::new("odom", "base_link", &pose, Twist2D::new(0.1, 0.2));
        assert_eq!(msg.frame_id, "odom");
        assert_relative_eq!(msg.x, 1.0);
        assert_relative_eq!(msg.orientation.z, (PI / 4.0).sin(), epsilon = 1e-6);
        assert_relative_eq!(msg.twist.angular, 0.2);
    }
}
