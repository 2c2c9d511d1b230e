//! Range scanner types.

use serde::{Deserialize, Serialize};

use super::pose::Point2D;

/// A single revolution of the rotating range scanner, in polar form.
///
/// Ranges are ordered by angle at a fixed angular increment starting from
/// `angle_min`. A range of zero (or anything non-finite or negative) is the
/// driver's sentinel for "no return at this angle".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaserScan {
    /// Start angle in radians, in the scanner frame.
    pub angle_min: f32,
    /// End angle in radians.
    pub angle_max: f32,
    /// Angular step between consecutive readings, radians.
    pub angle_increment: f32,
    /// Minimum valid range in meters.
    pub range_min: f32,
    /// Maximum valid range in meters.
    pub range_max: f32,
    /// Range measurements in meters, sentinel ≤ 0 for invalid.
    pub ranges: Vec<f32>,
}

impl LaserScan {
    pub fn new(
        angle_min: f32,
        angle_max: f32,
        angle_increment: f32,
        range_min: f32,
        range_max: f32,
        ranges: Vec<f32>,
    ) -> Self {
        Self {
            angle_min,
            angle_max,
            angle_increment,
            range_min,
            range_max,
            ranges,
        }
    }

    /// An empty scan carrying the given geometry constants.
    pub fn empty(angle_min: f32, angle_max: f32, angle_increment: f32, range_min: f32, range_max: f32) -> Self {
        Self::new(angle_min, angle_max, angle_increment, range_min, range_max, Vec::new())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Angle of the reading at `index`.
    #[inline]
    pub fn angle_at(&self, index: usize) -> f32 {
        self.angle_min + index as f32 * self.angle_increment
    }

    /// Whether a range value lies inside the scanner's valid band.
    #[inline]
    pub fn is_valid_range(&self, range: f32) -> bool {
        range.is_finite() && range >= self.range_min && range <= self.range_max
    }

    /// Iterate over `(angle, range)` pairs, valid or not.
    pub fn iter(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.ranges
            .iter()
            .enumerate()
            .map(move |(i, &r)| (self.angle_at(i), r))
    }

    /// Iterate over `(angle, range)` pairs whose range is in the valid band.
    pub fn iter_valid(&self) -> impl Iterator<Item = (f32, f32)> + '_ {
        self.iter().filter(|&(_, r)| self.is_valid_range(r))
    }

    pub fn valid_count(&self) -> usize {
        self.ranges
            .iter()
            .filter(|&&r| self.is_valid_range(r))
            .count()
    }

    /// Convert every valid return into a Cartesian point in the scanner frame.
    pub fn local_points(&self) -> Vec<Point2D> {
        self.iter_valid()
            .map(|(angle, range)| {
                let (sin_a, cos_a) = angle.sin_cos();
                Point2D::new(range * cos_a, range * sin_a)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    fn scan_with(ranges: Vec<f32>) -> LaserScan {
        LaserScan::new(0.0, 6.26, FRAC_PI_2, 0.02, 5.0, ranges)
    }

    #[test]
    fn validity_band() {
        let scan = scan_with(vec![]);
        assert!(scan.is_valid_range(1.0));
        assert!(scan.is_valid_range(0.02));
        assert!(scan.is_valid_range(5.0));
        assert!(!scan.is_valid_range(0.0));
        assert!(!scan.is_valid_range(0.01));
        assert!(!scan.is_valid_range(5.5));
        assert!(!scan.is_valid_range(f32::NAN));
        assert!(!scan.is_valid_range(-1.0));
    }

    #[test]
    fn valid_iteration_skips_sentinels() {
        let scan = scan_with(vec![1.0, 0.0, 2.0, 9.0]);
        assert_eq!(scan.len(), 4);
        assert_eq!(scan.valid_count(), 2);
        let valid: Vec<_> = scan.iter_valid().collect();
        assert_relative_eq!(valid[0].1, 1.0);
        assert_relative_eq!(valid[1].1, 2.0);
        assert_relative_eq!(valid[1].0, 2.0 * FRAC_PI_2, epsilon = 1e-6);
    }

    #[test]
    fn local_points_are_polar_to_cartesian() {
        // Readings at 0 and π/2.
        let scan = scan_with(vec![2.0, 3.0]);
        let points = scan.local_points();
        assert_eq!(points.len(), 2);
        assert_relative_eq!(points[0].x, 2.0, epsilon = 1e-6);
        assert_relative_eq!(points[0].y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(points[1].x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(points[1].y, 3.0, epsilon = 1e-6);
    }

    #[test]
    fn empty_scan() {
        let scan = LaserScan::empty(0.0, 6.26, 0.017437326, 0.02, 5.0);
        assert!(scan.is_empty());
        assert_eq!(scan.valid_count(), 0);
        assert!(scan.local_points().is_empty());
    }
}
