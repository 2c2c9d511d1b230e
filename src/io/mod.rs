//! I/O boundary: driver and transport abstractions plus test doubles.

mod driver;
pub mod mock;
mod transport;

pub use driver::RobotDriver;
pub use transport::{
    HeadingQuaternion, LogPublisher, OdometryMessage, ScanMessage, TelemetryPublisher,
    TransformMessage,
};
