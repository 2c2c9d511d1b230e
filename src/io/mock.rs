//! Deterministic stand-ins for the hardware driver and the transport.
//!
//! [`ScriptedDriver`] replays canned sensor sequences and records every
//! command — the workhorse for integration tests. [`RoomSimDriver`] is a
//! minimal closed-loop simulation of a differential-drive base inside a
//! rectangular room, enough to run the node end-to-end without hardware.

use std::collections::VecDeque;

use crate::core::types::{EncoderReading, LaserScan, VelocityCommand};
use crate::error::{DishaError, Result};
use crate::io::driver::RobotDriver;
use crate::io::transport::{OdometryMessage, ScanMessage, TelemetryPublisher, TransformMessage};

/// Driver that replays scripted sensor data and records commands.
#[derive(Debug, Default)]
pub struct ScriptedDriver {
    encoders: VecDeque<EncoderReading>,
    scans: VecDeque<LaserScan>,
    last_encoders: EncoderReading,
    last_scan: Option<LaserScan>,
    /// Every wheel command the loop dispatched, in order.
    pub commands: Vec<VelocityCommand>,
    /// Scanner power transitions, in order.
    pub scanner_power: Vec<bool>,
    /// When set, the next encoder read fails once.
    pub fail_next_read: bool,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an encoder reading for a future tick.
    pub fn push_encoders(&mut self, reading: EncoderReading) {
        self.encoders.push_back(reading);
    }

    /// Queue a scan for a future tick.
    pub fn push_scan(&mut self, scan: LaserScan) {
        self.scans.push_back(scan);
    }

    /// Queue `n` identical (encoders, scan) ticks.
    pub fn push_ticks(&mut self, n: usize, reading: EncoderReading, scan: &LaserScan) {
        for _ in 0..n {
            self.push_encoders(reading);
            self.push_scan(scan.clone());
        }
    }
}

impl RobotDriver for ScriptedDriver {
    fn read_encoders(&mut self) -> Result<EncoderReading> {
        if self.fail_next_read {
            self.fail_next_read = false;
            return Err(DishaError::Driver("scripted read failure".into()));
        }
        if let Some(r) = self.encoders.pop_front() {
            self.last_encoders = r;
        }
        Ok(self.last_encoders)
    }

    fn read_scan(&mut self) -> Result<LaserScan> {
        if let Some(s) = self.scans.pop_front() {
            self.last_scan = Some(s);
        }
        self.last_scan
            .clone()
            .ok_or_else(|| DishaError::Driver("no scan scripted".into()))
    }

    fn set_motors(&mut self, command: &VelocityCommand) -> Result<()> {
        self.commands.push(*command);
        Ok(())
    }

    fn set_scanner_power(&mut self, on: bool) -> Result<()> {
        self.scanner_power.push(on);
        Ok(())
    }
}

/// Scan geometry used by the room simulation.
#[derive(Debug, Clone, Copy)]
pub struct SimScanGeometry {
    pub angle_min: f32,
    pub angle_increment: f32,
    pub samples: usize,
    pub range_min: f32,
    pub range_max: f32,
}

impl Default for SimScanGeometry {
    fn default() -> Self {
        Self {
            angle_min: 0.0,
            angle_increment: 0.017437326,
            samples: 360,
            range_min: 0.02,
            range_max: 5.0,
        }
    }
}

/// Closed-loop simulation of the base inside an axis-aligned room.
///
/// Reading a scan advances the simulated state by one tick interval using
/// the last dispatched wheel command, then ray-casts against the room walls.
#[derive(Debug)]
pub struct RoomSimDriver {
    /// Room half extents in meters, centered on the world origin.
    half_width: f32,
    half_height: f32,
    geometry: SimScanGeometry,
    /// Seconds of simulated time per scan read.
    tick_dt: f32,

    // True (simulated) state, not visible to the estimator.
    sim_x: f32,
    sim_y: f32,
    sim_theta: f32,
    left_travel_mm: f64,
    right_travel_mm: f64,
    wheel_base: f32,
    command: VelocityCommand,
    scanner_on: bool,
}

impl RoomSimDriver {
    /// Override the scan geometry (defaults match the production scanner).
    pub fn with_geometry(mut self, geometry: SimScanGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn new(width: f32, height: f32, wheel_base: f32, tick_dt: f32) -> Self {
        Self {
            half_width: width / 2.0,
            half_height: height / 2.0,
            geometry: SimScanGeometry::default(),
            tick_dt,
            sim_x: 0.0,
            sim_y: 0.0,
            sim_theta: 0.0,
            left_travel_mm: 0.0,
            right_travel_mm: 0.0,
            wheel_base,
            command: VelocityCommand::stop(),
            scanner_on: false,
        }
    }

    /// Ground-truth pose, for inspecting simulation runs.
    pub fn true_pose(&self) -> (f32, f32, f32) {
        (self.sim_x, self.sim_y, self.sim_theta)
    }

    fn step(&mut self) {
        let dt = self.tick_dt;
        // Wheel speeds arrive in mm/s.
        let v_left = self.command.left as f32 / 1000.0;
        let v_right = self.command.right as f32 / 1000.0;

        self.left_travel_mm += (v_left * dt * 1000.0) as f64;
        self.right_travel_mm += (v_right * dt * 1000.0) as f64;

        let v = (v_left + v_right) / 2.0;
        let w = (v_right - v_left) / self.wheel_base;

        self.sim_x += v * dt * self.sim_theta.cos();
        self.sim_y += v * dt * self.sim_theta.sin();
        self.sim_theta = crate::core::math::normalize_angle(self.sim_theta + w * dt);

        // Walls are rigid: clip instead of leaving the room.
        self.sim_x = self.sim_x.clamp(-self.half_width, self.half_width);
        self.sim_y = self.sim_y.clamp(-self.half_height, self.half_height);
    }

    /// Distance from the simulated pose to the nearest wall along `angle`.
    fn raycast(&self, angle: f32) -> f32 {
        let (sin_a, cos_a) = angle.sin_cos();
        let mut best = f32::INFINITY;

        if cos_a.abs() > 1e-6 {
            for wall_x in [-self.half_width, self.half_width] {
                let t = (wall_x - self.sim_x) / cos_a;
                if t > 0.0 {
                    let y = self.sim_y + t * sin_a;
                    if y.abs() <= self.half_height + 1e-4 {
                        best = best.min(t);
                    }
                }
            }
        }
        if sin_a.abs() > 1e-6 {
            for wall_y in [-self.half_height, self.half_height] {
                let t = (wall_y - self.sim_y) / sin_a;
                if t > 0.0 {
                    let x = self.sim_x + t * cos_a;
                    if x.abs() <= self.half_width + 1e-4 {
                        best = best.min(t);
                    }
                }
            }
        }
        best
    }
}

impl RobotDriver for RoomSimDriver {
    fn read_encoders(&mut self) -> Result<EncoderReading> {
        Ok(EncoderReading::new(
            (self.left_travel_mm.round() as i64) as u32,
            (self.right_travel_mm.round() as i64) as u32,
        ))
    }

    fn read_scan(&mut self) -> Result<LaserScan> {
        if !self.scanner_on {
            return Err(DishaError::Driver("scanner is powered off".into()));
        }
        self.step();

        let g = &self.geometry;
        let mut ranges = Vec::with_capacity(g.samples);
        for i in 0..g.samples {
            let world_angle = self.sim_theta + g.angle_min + i as f32 * g.angle_increment;
            let r = self.raycast(world_angle);
            if r >= g.range_min && r <= g.range_max {
                ranges.push(r);
            } else {
                ranges.push(0.0);
            }
        }
        Ok(LaserScan::new(
            g.angle_min,
            g.angle_min + g.samples as f32 * g.angle_increment,
            g.angle_increment,
            g.range_min,
            g.range_max,
            ranges,
        ))
    }

    fn set_motors(&mut self, command: &VelocityCommand) -> Result<()> {
        self.command = *command;
        Ok(())
    }

    fn set_scanner_power(&mut self, on: bool) -> Result<()> {
        self.scanner_on = on;
        Ok(())
    }
}

/// Publisher that records everything it is handed.
#[derive(Debug, Default)]
pub struct RecordingPublisher {
    pub odometry: Vec<OdometryMessage>,
    pub transforms: Vec<TransformMessage>,
    pub scans: Vec<ScanMessage>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TelemetryPublisher for RecordingPublisher {
    fn publish_odometry(&mut self, msg: &OdometryMessage) -> Result<()> {
        self.odometry.push(msg.clone());
        Ok(())
    }

    fn publish_transform(&mut self, msg: &TransformMessage) -> Result<()> {
        self.transforms.push(msg.clone());
        Ok(())
    }

    fn publish_scan(&mut self, msg: &ScanMessage) -> Result<()> {
        self.scans.push(msg.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn scripted_driver_replays_and_holds_last() {
        let mut driver = ScriptedDriver::new();
        driver.push_encoders(EncoderReading::new(10, 10));
        assert_eq!(driver.read_encoders().unwrap(), EncoderReading::new(10, 10));
        // Exhausted: repeats the last reading.
        assert_eq!(driver.read_encoders().unwrap(), EncoderReading::new(10, 10));
    }

    #[test]
    fn scripted_driver_fails_once_when_asked() {
        let mut driver = ScriptedDriver::new();
        driver.push_encoders(EncoderReading::new(1, 1));
        driver.fail_next_read = true;
        assert!(driver.read_encoders().is_err());
        assert!(driver.read_encoders().is_ok());
    }

    #[test]
    fn room_sim_scan_sees_walls() {
        let mut sim = RoomSimDriver::new(4.0, 4.0, 0.248, 0.5);
        sim.set_scanner_power(true).unwrap();
        let scan = sim.read_scan().unwrap();
        // Ahead (+x) the wall is 2m away.
        assert_relative_eq!(scan.ranges[0], 2.0, epsilon = 1e-3);
        assert_eq!(scan.len(), 360);
    }

    #[test]
    fn room_sim_integrates_commands() {
        let mut sim = RoomSimDriver::new(10.0, 10.0, 0.248, 0.5);
        sim.set_scanner_power(true).unwrap();
        sim.set_motors(&VelocityCommand::new(100, 100)).unwrap();
        // Two ticks at 0.1 m/s for 0.5s each.
        sim.read_scan().unwrap();
        sim.read_scan().unwrap();
        let (x, _, _) = sim.true_pose();
        assert_relative_eq!(x, 0.1, epsilon = 1e-4);

        let enc = sim.read_encoders().unwrap();
        assert_eq!(enc.left_ticks, 100);
        assert_eq!(enc.right_ticks, 100);
    }

    #[test]
    fn room_sim_scanner_off_refuses_scans() {
        let mut sim = RoomSimDriver::new(4.0, 4.0, 0.248, 0.5);
        assert!(sim.read_scan().is_err());
    }
}
