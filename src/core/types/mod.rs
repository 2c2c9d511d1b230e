//! Core data types shared across the crate.

mod motion;
mod pose;
mod scan;

pub use motion::{EncoderReading, Twist2D, VelocityCommand};
pub use pose::{Point2D, Pose2D};
pub use scan::LaserScan;
