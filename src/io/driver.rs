//! Hardware driver abstraction.

use crate::core::types::{EncoderReading, LaserScan, VelocityCommand};
use crate::error::Result;

/// The robot base as the control loop sees it.
///
/// Implementations own the transport to the hardware (or a simulation of
/// it). Every call may fail; the control loop treats a failed read or write
/// as a lost tick, never as a fatal condition.
pub trait RobotDriver {
    /// Latest cumulative wheel encoder counters.
    fn read_encoders(&mut self) -> Result<EncoderReading>;

    /// One full revolution of the range scanner.
    fn read_scan(&mut self) -> Result<LaserScan>;

    /// Dispatch a wheel velocity command.
    fn set_motors(&mut self, command: &VelocityCommand) -> Result<()>;

    /// Power the rotating scanner on or off. Called with `false` as the
    /// terminal action on shutdown.
    fn set_scanner_power(&mut self, on: bool) -> Result<()>;
}
