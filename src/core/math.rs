//! Angular arithmetic for planar estimation.

use std::f32::consts::PI;

/// Normalize angle to [-π, π].
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    let mut a = angle % (2.0 * PI);
    if a > PI {
        a -= 2.0 * PI;
    } else if a < -PI {
        a += 2.0 * PI;
    }
    a
}

/// Shortest signed angular difference from `a` to `b`.
///
/// Adding the result to `a` reaches `b` by the short way around the circle.
#[inline]
pub fn angle_diff(a: f32, b: f32) -> f32 {
    normalize_angle(b - a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn normalize_identity_in_range() {
        assert_relative_eq!(normalize_angle(0.0), 0.0);
        assert_relative_eq!(normalize_angle(1.5), 1.5);
        assert_relative_eq!(normalize_angle(-1.5), -1.5);
    }

    #[test]
    fn normalize_wraps_positive() {
        assert_relative_eq!(normalize_angle(2.0 * PI), 0.0, epsilon = 1e-6);
        assert_relative_eq!(normalize_angle(3.0 * PI), PI, epsilon = 1e-6);
    }

    #[test]
    fn normalize_wraps_negative() {
        assert_relative_eq!(normalize_angle(-2.0 * PI), 0.0, epsilon = 1e-6);
        assert_relative_eq!(normalize_angle(-3.0 * PI), -PI, epsilon = 1e-6);
    }

    #[test]
    fn diff_takes_short_way_across_boundary() {
        assert_relative_eq!(angle_diff(PI - 0.1, -PI + 0.1), 0.2, epsilon = 1e-6);
        assert_relative_eq!(angle_diff(-PI + 0.1, PI - 0.1), -0.2, epsilon = 1e-6);
    }

    #[test]
    fn diff_same_angle_is_zero() {
        assert_relative_eq!(angle_diff(1.0, 1.0), 0.0, epsilon = 1e-6);
    }
}
