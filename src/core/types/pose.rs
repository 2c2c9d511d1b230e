//! Pose and point types for planar SLAM.

use serde::{Deserialize, Serialize};

use crate::core::math::normalize_angle;

/// A 2D point in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Squared distance to another point (avoids sqrt).
    #[inline]
    pub fn distance_squared(&self, other: &Point2D) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    #[inline]
    pub fn distance(&self, other: &Point2D) -> f32 {
        self.distance_squared(other).sqrt()
    }

    /// Euclidean norm (distance from the origin).
    #[inline]
    pub fn norm(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

/// Robot pose in 2D space: position (x, y) in meters, heading in radians.
///
/// Theta is normalized to [-π, π] on construction and composition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose2D {
    pub x: f32,
    pub y: f32,
    pub theta: f32,
}

impl Pose2D {
    #[inline]
    pub fn new(x: f32, y: f32, theta: f32) -> Self {
        Self {
            x,
            y,
            theta: normalize_angle(theta),
        }
    }

    /// Identity pose at the origin with zero heading.
    #[inline]
    pub fn identity() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            theta: 0.0,
        }
    }

    /// Compose this pose with a displacement expressed in its local frame.
    ///
    /// ```text
    /// C = A ⊕ B:
    ///   C.x = A.x + B.x * cos(A.θ) - B.y * sin(A.θ)
    ///   C.y = A.y + B.x * sin(A.θ) + B.y * cos(A.θ)
    ///   C.θ = normalize(A.θ + B.θ)
    /// ```
    #[inline]
    pub fn compose(&self, delta: &Pose2D) -> Pose2D {
        let (sin_t, cos_t) = self.theta.sin_cos();
        Pose2D::new(
            self.x + delta.x * cos_t - delta.y * sin_t,
            self.y + delta.x * sin_t + delta.y * cos_t,
            self.theta + delta.theta,
        )
    }

    /// Transform a point from the local frame to the global frame.
    #[inline]
    pub fn transform_point(&self, point: &Point2D) -> Point2D {
        let (sin_t, cos_t) = self.theta.sin_cos();
        Point2D::new(
            self.x + point.x * cos_t - point.y * sin_t,
            self.y + point.x * sin_t + point.y * cos_t,
        )
    }

    /// Transform a point from the global frame into this pose's local frame.
    #[inline]
    pub fn inverse_transform_point(&self, point: &Point2D) -> Point2D {
        let (sin_t, cos_t) = self.theta.sin_cos();
        let dx = point.x - self.x;
        let dy = point.y - self.y;
        Point2D::new(dx * cos_t + dy * sin_t, -dx * sin_t + dy * cos_t)
    }

    /// World-frame bearing from this pose's position to a point.
    #[inline]
    pub fn bearing_to(&self, point: &Point2D) -> f32 {
        (point.y - self.y).atan2(point.x - self.x)
    }

    /// Euclidean distance from this pose's position to a point.
    #[inline]
    pub fn distance_to(&self, point: &Point2D) -> f32 {
        self.position().distance(point)
    }

    #[inline]
    pub fn position(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }
}

impl Default for Pose2D {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    #[test]
    fn point_distance() {
        let a = Point2D::new(0.0, 0.0);
        let b = Point2D::new(3.0, 4.0);
        assert_relative_eq!(a.distance(&b), 5.0);
        assert_relative_eq!(b.norm(), 5.0);
    }

    #[test]
    fn compose_identity_is_noop() {
        let p = Pose2D::new(1.0, 2.0, 0.5);
        let r = p.compose(&Pose2D::identity());
        assert_relative_eq!(r.x, p.x);
        assert_relative_eq!(r.y, p.y);
        assert_relative_eq!(r.theta, p.theta);
    }

    #[test]
    fn compose_rotates_displacement_into_global_frame() {
        // Facing +y, a local forward step moves along +y.
        let p = Pose2D::new(1.0, 1.0, FRAC_PI_2);
        let r = p.compose(&Pose2D::new(2.0, 0.0, 0.0));
        assert_relative_eq!(r.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(r.y, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn transform_point_roundtrip() {
        let pose = Pose2D::new(1.0, -2.0, 0.8);
        let local = Point2D::new(0.7, -0.3);
        let global = pose.transform_point(&local);
        let back = pose.inverse_transform_point(&global);
        assert_relative_eq!(back.x, local.x, epsilon = 1e-5);
        assert_relative_eq!(back.y, local.y, epsilon = 1e-5);
    }

    #[test]
    fn bearing_to_diagonal_target() {
        let pose = Pose2D::identity();
        let goal = Point2D::new(5.0, 5.0);
        assert_relative_eq!(pose.bearing_to(&goal), FRAC_PI_4, epsilon = 1e-6);
        assert_relative_eq!(pose.distance_to(&goal), 50.0_f32.sqrt(), epsilon = 1e-5);
    }
}
