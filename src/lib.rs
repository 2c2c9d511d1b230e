//! DishaSLAM — pose estimation and reactive navigation core for a
//! differential-drive vacuum robot.
//!
//! The crate fuses wheel odometry with landmark observations extracted from
//! a rotating range scanner in an EKF that jointly estimates the robot pose
//! and a point-landmark map, accumulates an evidence grid from the same
//! range data, and closes the loop with a reactive tangent-bug controller —
//! all inside one fixed-rate control loop.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  engine/                        │  ← Fixed-rate control loop
//! └─────────────────────────────────────────────────┘
//!                       │
//! ┌─────────────────────────────────────────────────┐
//! │            io/        state/                    │  ← Driver + transport seams
//! └─────────────────────────────────────────────────┘
//!                       │
//! ┌─────────────────────────────────────────────────┐
//! │   navigation/       algorithms/                 │  ← Controller, RANSAC,
//! │                                                 │    association, EKF, grid
//! └─────────────────────────────────────────────────┘
//!                       │
//! ┌─────────────────────────────────────────────────┐
//! │                 sensors/                        │  ← Wheel odometry
//! └─────────────────────────────────────────────────┘
//!                       │
//! ┌─────────────────────────────────────────────────┐
//! │                  core/                          │  ← Types, math
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! The hardware driver and the publish/subscribe transport are collaborators
//! behind the [`io::RobotDriver`] and [`io::TelemetryPublisher`] traits; the
//! crate never opens a port itself.

pub mod algorithms;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod io;
pub mod navigation;
pub mod sensors;
pub mod state;
pub mod utils;

// Flat re-exports for common use.
pub use algorithms::association::{Association, AssociationConfig, DataAssociator};
pub use algorithms::estimation::{EkfConfig, EkfEstimator, Landmark, RangeBearing};
pub use algorithms::extraction::{LandmarkExtractor, LandmarkObservation, RansacConfig};
pub use algorithms::mapping::{CellState, EvidenceGrid, EvidenceGridConfig};
pub use config::DishaConfig;
pub use core::math;
pub use core::types::{EncoderReading, LaserScan, Point2D, Pose2D, Twist2D, VelocityCommand};
pub use engine::ControlLoop;
pub use error::{DishaError, Result};
pub use io::{OdometryMessage, RobotDriver, ScanMessage, TelemetryPublisher, TransformMessage};
pub use navigation::{NavDecision, NavigationController, NavigatorConfig};
pub use sensors::{OdometryConfig, OdometryIntegrator, OdometryUpdate};
pub use state::{CommandArbiter, DriveMode, OverrideSender, VelocityOverride};
