//! Reactive goal-seeking controller (tangent-bug style).
//!
//! Instead of planning a path, the controller picks a subgoal every tick:
//! the scan return whose implied world position leaves the least remaining
//! distance to the goal. Steering is rotation-first — align with the subgoal
//! bearing, then drive, then stop inside tolerance.

use serde::{Deserialize, Serialize};

use crate::core::math::angle_diff;
use crate::core::types::{LaserScan, Point2D, Pose2D, VelocityCommand};

/// Configuration for the navigation controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigatorConfig {
    /// Position tolerance in meters; inside it the robot holds still.
    #[serde(default = "default_position_tolerance")]
    pub position_tolerance: f32,

    /// Heading tolerance in radians for switching from rotation to driving.
    #[serde(default = "default_angular_tolerance")]
    pub angular_tolerance: f32,

    /// Forward wheel speed in mm/s.
    #[serde(default = "default_drive_speed")]
    pub drive_speed: f32,

    /// In-place turn wheel speed in mm/s.
    #[serde(default = "default_turn_speed")]
    pub turn_speed: f32,

    /// Platform maximum wheel speed in mm/s; commands saturate here.
    #[serde(default = "default_max_wheel_speed")]
    pub max_wheel_speed: f32,

    /// Wheel base in meters, for twist-to-wheel conversion.
    #[serde(default = "default_wheel_base")]
    pub wheel_base: f32,
}

fn default_position_tolerance() -> f32 {
    0.10
}
fn default_angular_tolerance() -> f32 {
    0.05
}
fn default_drive_speed() -> f32 {
    100.0
}
fn default_turn_speed() -> f32 {
    30.0
}
fn default_max_wheel_speed() -> f32 {
    300.0
}
fn default_wheel_base() -> f32 {
    0.248
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            position_tolerance: default_position_tolerance(),
            angular_tolerance: default_angular_tolerance(),
            drive_speed: default_drive_speed(),
            turn_speed: default_turn_speed(),
            max_wheel_speed: default_max_wheel_speed(),
            wheel_base: default_wheel_base(),
        }
    }
}

/// What the controller decided this tick, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavDecision {
    /// The intermediate target steered toward this tick.
    pub subgoal: Point2D,
    /// Signed heading error to the subgoal, radians.
    pub heading_error: f32,
    /// The wheel command to dispatch.
    pub command: VelocityCommand,
}

/// Reactive navigation controller.
#[derive(Debug, Clone)]
pub struct NavigationController {
    config: NavigatorConfig,
}

impl NavigationController {
    pub fn new(config: NavigatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    /// Compute this tick's command from the corrected pose, goal, and scan.
    pub fn update(&self, pose: &Pose2D, goal: &Point2D, scan: &LaserScan) -> NavDecision {
        // At the goal: stop before any bearing is formed, so a goal
        // coincident with the pose never divides by a zero displacement.
        if pose.distance_to(goal) <= self.config.position_tolerance {
            return NavDecision {
                subgoal: *goal,
                heading_error: 0.0,
                command: VelocityCommand::stop(),
            };
        }

        let subgoal = self.select_subgoal(pose, goal, scan);

        let heading_error = angle_diff(pose.theta, pose.bearing_to(&subgoal));
        let command = if heading_error.abs() > self.config.angular_tolerance {
            // Rotate in place toward the subgoal; error sign picks the
            // direction, so the command has zero linear component.
            let turn = self.config.turn_speed * heading_error.signum();
            self.clamp(-turn, turn)
        } else if pose.distance_to(&subgoal) > self.config.position_tolerance {
            self.clamp(self.config.drive_speed, self.config.drive_speed)
        } else {
            VelocityCommand::stop()
        };

        NavDecision {
            subgoal,
            heading_error,
            command,
        }
    }

    /// Pick the scan return whose world position minimizes remaining
    /// distance to the goal. With no valid return the space ahead is treated
    /// as open and the goal itself becomes the subgoal.
    fn select_subgoal(&self, pose: &Pose2D, goal: &Point2D, scan: &LaserScan) -> Point2D {
        let mut best: Option<(f32, Point2D)> = None;

        for (angle, range) in scan.iter_valid() {
            let (sin_a, cos_a) = angle.sin_cos();
            let local = Point2D::new(range * cos_a, range * sin_a);
            let world = pose.transform_point(&local);
            let residual = world.distance_squared(goal);

            if best.map_or(true, |(d, _)| residual < d) {
                best = Some((residual, world));
            }
        }

        match best {
            Some((_, world)) => world,
            None => *goal,
        }
    }

    /// Convert a transport twist command into a wheel pair.
    ///
    /// The differential model splits linear ± angular·(wheel_base/2) across
    /// the wheels in mm/s; saturation preserves the left:right ratio.
    pub fn wheels_from_twist(&self, linear: f32, angular: f32) -> VelocityCommand {
        let x = linear * 1000.0;
        let th = angular * (self.config.wheel_base * 1000.0) / 2.0;
        self.clamp(x - th, x + th)
    }

    fn clamp(&self, left: f32, right: f32) -> VelocityCommand {
        VelocityCommand::from_wheel_speeds(left, right, self.config.max_wheel_speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    fn controller() -> NavigationController {
        NavigationController::new(NavigatorConfig::default())
    }

    fn empty_scan() -> LaserScan {
        LaserScan::empty(0.0, 6.26, 0.017437326, 0.02, 5.0)
    }

    #[test]
    fn stop_is_a_fixed_point_at_the_goal() {
        let nav = controller();
        let pose = Pose2D::new(5.0, 5.0, 1.2);
        let decision = nav.update(&pose, &Point2D::new(5.0, 5.0), &empty_scan());
        assert!(decision.command.is_stop());
        assert_relative_eq!(decision.heading_error, 0.0);
    }

    #[test]
    fn goal_within_tolerance_stops() {
        let nav = controller();
        let pose = Pose2D::new(4.95, 5.0, 0.0);
        let decision = nav.update(&pose, &Point2D::new(5.0, 5.0), &empty_scan());
        assert!(decision.command.is_stop());
    }

    #[test]
    fn empty_scan_falls_back_to_goal_subgoal() {
        let nav = controller();
        let pose = Pose2D::identity();
        let goal = Point2D::new(5.0, 5.0);
        let decision = nav.update(&pose, &goal, &empty_scan());

        assert_eq!(decision.subgoal, goal);
        // Bearing to (5,5) from the origin is 45°; heading error exceeds
        // tolerance, so the command is pure rotation: zero linear component.
        assert_relative_eq!(decision.heading_error, FRAC_PI_4, epsilon = 1e-6);
        assert_eq!(decision.command.left, -decision.command.right);
        assert!(decision.command.right > 0, "CCW toward positive bearing");
    }

    #[test]
    fn aligned_heading_drives_forward() {
        let nav = controller();
        let pose = Pose2D::new(0.0, 0.0, FRAC_PI_4);
        let decision = nav.update(&pose, &Point2D::new(5.0, 5.0), &empty_scan());
        assert_eq!(decision.command.left, decision.command.right);
        assert!(decision.command.left > 0);
    }

    #[test]
    fn negative_heading_error_turns_clockwise() {
        let nav = controller();
        let pose = Pose2D::new(0.0, 0.0, FRAC_PI_2);
        let decision = nav.update(&pose, &Point2D::new(5.0, 0.0), &empty_scan());
        assert!(decision.heading_error < 0.0);
        assert!(decision.command.left > 0);
        assert!(decision.command.right < 0);
    }

    #[test]
    fn subgoal_prefers_return_closest_to_goal() {
        let nav = controller();
        let pose = Pose2D::identity();
        let goal = Point2D::new(5.0, 0.0);
        // Returns at 0° (3m, toward the goal) and 90° (3m, away from it).
        let scan = LaserScan::new(0.0, 6.26, FRAC_PI_2, 0.02, 5.0, vec![3.0, 3.0]);
        let decision = nav.update(&pose, &goal, &scan);
        assert_relative_eq!(decision.subgoal.x, 3.0, epsilon = 1e-5);
        assert_relative_eq!(decision.subgoal.y, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn command_saturation_preserves_ratio() {
        let nav = NavigationController::new(NavigatorConfig {
            drive_speed: 800.0,
            ..NavigatorConfig::default()
        });
        let pose = Pose2D::new(0.0, 0.0, 0.0);
        let decision = nav.update(&pose, &Point2D::new(5.0, 0.0), &empty_scan());
        assert_eq!(decision.command.left, 300);
        assert_eq!(decision.command.right, 300);
    }

    #[test]
    fn twist_conversion_clamps_with_ratio() {
        let nav = controller();
        // 0.1 m/s straight.
        let cmd = nav.wheels_from_twist(0.1, 0.0);
        assert_eq!(cmd.left, 100);
        assert_eq!(cmd.right, 100);

        // Excessive linear command saturates both wheels evenly.
        let cmd = nav.wheels_from_twist(1.0, 0.0);
        assert_eq!(cmd.left, 300);
        assert_eq!(cmd.right, 300);

        // Turn component keeps its proportion through saturation.
        let cmd = nav.wheels_from_twist(0.5, 2.0);
        let expected_ratio = (500.0 - 248.0) / (500.0 + 248.0);
        let actual_ratio = cmd.left as f32 / cmd.right as f32;
        assert_relative_eq!(actual_ratio, expected_ratio, epsilon = 0.01);
        assert_eq!(cmd.right, 300);
    }
}
