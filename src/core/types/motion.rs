//! Motion-related types: encoder counters, twists, wheel commands.

use serde::{Deserialize, Serialize};

/// Raw wheel encoder counters from the driver.
///
/// Counters count millimeters of wheel travel, increase monotonically while
/// driving forward and wrap around their u32 range. Consumers must take
/// deltas with [`EncoderReading::delta_ticks`], never absolute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EncoderReading {
    pub left_ticks: u32,
    pub right_ticks: u32,
}

impl EncoderReading {
    pub fn new(left_ticks: u32, right_ticks: u32) -> Self {
        Self {
            left_ticks,
            right_ticks,
        }
    }

    /// Signed per-wheel tick deltas since `previous`, wraparound-safe.
    ///
    /// `wrapping_sub` followed by the cast to i32 interprets a counter that
    /// wrapped past the end of its range as a small signed step, the same
    /// policy applied to 16-bit encoders widened to this counter width.
    #[inline]
    pub fn delta_ticks(&self, previous: &EncoderReading) -> (i32, i32) {
        (
            self.left_ticks.wrapping_sub(previous.left_ticks) as i32,
            self.right_ticks.wrapping_sub(previous.right_ticks) as i32,
        )
    }
}

/// Planar velocity: linear in m/s, angular in rad/s.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Twist2D {
    pub linear: f32,
    pub angular: f32,
}

impl Twist2D {
    pub fn new(linear: f32, angular: f32) -> Self {
        Self { linear, angular }
    }
}

/// Integer per-wheel velocity command in mm/s, as the motor firmware takes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VelocityCommand {
    pub left: i32,
    pub right: i32,
}

impl VelocityCommand {
    pub fn new(left: i32, right: i32) -> Self {
        Self { left, right }
    }

    /// The all-stop command.
    pub fn stop() -> Self {
        Self { left: 0, right: 0 }
    }

    pub fn is_stop(&self) -> bool {
        self.left == 0 && self.right == 0
    }

    /// Build a command from floating wheel speeds, saturating to `max_speed`.
    ///
    /// When either wheel exceeds the platform maximum both wheels are scaled
    /// by the same factor, so the left:right ratio — and with it the turning
    /// radius — survives saturation.
    pub fn from_wheel_speeds(left: f32, right: f32, max_speed: f32) -> Self {
        let peak = left.abs().max(right.abs());
        let (left, right) = if peak > max_speed && peak > 0.0 {
            let scale = max_speed / peak;
            (left * scale, right * scale)
        } else {
            (left, right)
        };
        Self {
            left: left.round() as i32,
            right: right.round() as i32,
        }
    }

    /// Speed argument the motor firmware expects alongside the wheel pair.
    pub fn peak_magnitude(&self) -> i32 {
        self.left.abs().max(self.right.abs())
    }
}
