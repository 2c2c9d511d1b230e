//! Fixed-rate control loop tying estimation, mapping, and navigation to the
//! driver and transport collaborators.
//!
//! Every component is an owned field, constructed once before the first tick
//! and reused for the life of the loop; the only allocation in steady state
//! is the scan buffer the driver hands back. Per tick, in order:
//!
//! 1. pull a fresh scan and encoder reading from the driver
//! 2. fold the raw ranges into the evidence grid
//! 3. integrate odometry and run the SLAM step (predict → update → augment)
//! 4. compute the reactive command (or consume a manual override)
//! 5. dispatch the command and publish telemetry
//!
//! A driver failure abandons the remainder of the tick; the loop carries on
//! at the next one. The stop signal powers the scanner down on the way out.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::algorithms::association::DataAssociator;
use crate::algorithms::estimation::{EkfEstimator, RangeBearing};
use crate::algorithms::extraction::LandmarkExtractor;
use crate::algorithms::mapping::EvidenceGrid;
use crate::config::{DishaConfig, FrameConfig};
use crate::core::types::{Point2D, Pose2D, Twist2D, VelocityCommand};
use crate::error::Result;
use crate::io::{
    OdometryMessage, RobotDriver, ScanMessage, TelemetryPublisher, TransformMessage,
};
use crate::navigation::NavigationController;
use crate::sensors::OdometryIntegrator;
use crate::state::{CommandArbiter, OverrideSender};

/// Fixed-rate orchestrator over the whole pipeline.
pub struct ControlLoop<D: RobotDriver, P: TelemetryPublisher> {
    driver: D,
    publisher: P,

    grid: EvidenceGrid,
    odometry: OdometryIntegrator,
    extractor: LandmarkExtractor,
    associator: DataAssociator,
    ekf: EkfEstimator,
    navigator: NavigationController,
    arbiter: CommandArbiter,

    goal: Point2D,
    frames: FrameConfig,
    tick_interval: Duration,
}

impl<D: RobotDriver, P: TelemetryPublisher> ControlLoop<D, P> {
    /// Build the loop from configuration. Returns the loop and the sender
    /// the transport side uses to deliver velocity overrides.
    pub fn new(config: &DishaConfig, driver: D, publisher: P) -> (Self, OverrideSender) {
        let (arbiter, override_tx) = CommandArbiter::new();

        let loop_ = Self {
            driver,
            publisher,
            grid: EvidenceGrid::new(config.grid.clone()),
            odometry: OdometryIntegrator::new(config.odometry),
            extractor: LandmarkExtractor::new(config.ransac.clone()),
            associator: DataAssociator::new(config.association),
            ekf: EkfEstimator::new(Pose2D::identity(), config.ekf),
            navigator: NavigationController::new(config.navigation.clone()),
            arbiter,
            goal: Point2D::new(config.control.goal[0], config.control.goal[1]),
            frames: config.frames.clone(),
            tick_interval: Duration::from_secs_f32(1.0 / config.control.rate_hz),
        };
        (loop_, override_tx)
    }

    /// Current corrected pose estimate.
    pub fn pose(&self) -> Pose2D {
        self.ekf.pose()
    }

    pub fn estimator(&self) -> &EkfEstimator {
        &self.ekf
    }

    pub fn grid(&self) -> &EvidenceGrid {
        &self.grid
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Replace the goal at runtime (e.g. from a transport goal message).
    pub fn set_goal(&mut self, goal: Point2D) {
        log::info!("new goal: ({:.2}, {:.2})", goal.x, goal.y);
        self.goal = goal;
    }

    /// Hand control back to the navigation controller after an override.
    pub fn resume_autonomous(&mut self) {
        self.arbiter.resume_autonomous();
    }

    /// Run one tick covering `dt` seconds of elapsed time.
    ///
    /// Errors out of the driver or publisher abandon the remainder of the
    /// tick; the caller decides whether to keep looping (it should).
    pub fn tick(&mut self, dt: f32) -> Result<()> {
        let scan = self.driver.read_scan()?;
        let encoders = self.driver.read_encoders()?;

        // Map update uses the last corrected pose: the scan was taken before
        // this tick's motion was integrated.
        let map_pose = self.ekf.pose();
        for (angle, range) in scan.iter() {
            let bearing = map_pose.theta + angle;
            if scan.is_valid_range(range) {
                self.grid
                    .observe_occupied(range, bearing, map_pose.x, map_pose.y);
            } else {
                self.grid
                    .observe_free(scan.range_max, bearing, map_pose.x, map_pose.y);
            }
        }

        // Dead reckoning, then the SLAM correction on top of it.
        let twist = match self.odometry.update(encoders, dt) {
            Some(update) => {
                self.ekf.predict(&update.delta);
                update.twist
            }
            None => Twist2D::default(),
        };

        let observations = self.extractor.extract(&scan, &self.ekf.pose());
        if !observations.is_empty() {
            let association = self.associator.associate(&self.ekf, &observations);

            let mut applied = 0;
            for &(obs_idx, lm_idx) in &association.matches {
                let rb = RangeBearing::from_local_point(&observations[obs_idx].position);
                if self.ekf.update(&rb, lm_idx) {
                    applied += 1;
                }
            }

            // Augment strictly after the updates, from the corrected pose.
            for &obs_idx in &association.new_landmarks {
                let rb = RangeBearing::from_local_point(&observations[obs_idx].position);
                self.ekf.augment(&rb);
            }

            log::debug!(
                "slam: {} observations, {} updated, {} new, {} landmarks total",
                observations.len(),
                applied,
                association.new_landmarks.len(),
                self.ekf.landmark_count()
            );
        }

        let pose = self.ekf.pose();
        let decision = self.navigator.update(&pose, &self.goal, &scan);
        let navigator = &self.navigator;
        let command = self
            .arbiter
            .select(decision.command, |ov| {
                navigator.wheels_from_twist(ov.linear, ov.angular)
            });

        self.driver.set_motors(&command)?;
        self.publish(&pose, twist, &scan)?;

        Ok(())
    }

    fn publish(
        &mut self,
        pose: &Pose2D,
        twist: Twist2D,
        scan: &crate::core::types::LaserScan,
    ) -> Result<()> {
        self.publisher.publish_odometry(&OdometryMessage::new(
            &self.frames.odom,
            &self.frames.base,
            pose,
            twist,
        ))?;
        self.publisher.publish_transform(&TransformMessage::new(
            &self.frames.odom,
            &self.frames.base,
            pose,
        ))?;
        self.publisher.publish_scan(&ScanMessage {
            frame_id: self.frames.scanner.clone(),
            scan: scan.clone(),
        })?;
        Ok(())
    }

    /// Run at the configured rate until `running` clears, then power down.
    pub fn run(&mut self, running: &AtomicBool) -> Result<()> {
        self.driver.set_scanner_power(true)?;
        log::info!(
            "control loop running at {:.1} Hz, goal ({:.2}, {:.2})",
            1.0 / self.tick_interval.as_secs_f32(),
            self.goal.x,
            self.goal.y
        );

        let mut last_tick: Option<Instant> = None;

        while running.load(Ordering::SeqCst) {
            let tick_start = Instant::now();
            let dt = match last_tick {
                Some(prev) => (tick_start - prev).as_secs_f32(),
                None => self.tick_interval.as_secs_f32(),
            };
            last_tick = Some(tick_start);

            if let Err(e) = self.tick(dt) {
                log::warn!("tick abandoned: {e}");
            }

            let elapsed = tick_start.elapsed();
            if let Some(remaining) = self.tick_interval.checked_sub(elapsed) {
                std::thread::sleep(remaining);
            }
        }

        self.shutdown();
        Ok(())
    }

    /// Terminal actions: stop the wheels, power the scanner down.
    fn shutdown(&mut self) {
        log::info!("shutting down: stopping motors and powering sensors off");
        if let Err(e) = self.driver.set_motors(&VelocityCommand::stop()) {
            log::warn!("failed to stop motors on shutdown: {e}");
        }
        if let Err(e) = self.driver.set_scanner_power(false) {
            log::warn!("failed to power scanner down: {e}");
        }
    }
}
