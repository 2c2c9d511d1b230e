//! Command-source arbitration between autonomous control and manual override.
//!
//! A transport callback may deliver velocity commands at any time, from
//! another thread. Rather than racing last-write-wins against the
//! controller's own output, overrides travel through a bounded channel that
//! the control loop drains exactly once per tick, and an explicit
//! [`DriveMode`] names the single authoritative source: receiving an
//! override flips the loop into `Manual`, where the held override command is
//! dispatched until an explicit resume.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};

use crate::core::types::VelocityCommand;

/// Which source owns the wheel command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveMode {
    /// The navigation controller computes the command each tick.
    Autonomous,
    /// A transport override holds the command.
    Manual,
}

/// Velocity override message as the transport delivers it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityOverride {
    /// Linear velocity in m/s.
    pub linear: f32,
    /// Angular velocity in rad/s.
    pub angular: f32,
}

/// Sending half of the override channel, handed to the transport side.
#[derive(Debug, Clone)]
pub struct OverrideSender {
    tx: Sender<VelocityOverride>,
}

impl OverrideSender {
    /// Deliver an override. When the loop has not drained the previous one
    /// yet the message is dropped; the next consumed override wins, which
    /// keeps the consumer the only writer of the active command.
    pub fn send(&self, cmd: VelocityOverride) -> bool {
        match self.tx.try_send(cmd) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Arbitrates between the controller's command and manual overrides.
#[derive(Debug)]
pub struct CommandArbiter {
    rx: Receiver<VelocityOverride>,
    mode: DriveMode,
    manual_command: VelocityCommand,
}

impl CommandArbiter {
    /// Create the arbiter plus the sender the transport side keeps.
    pub fn new() -> (Self, OverrideSender) {
        // One slot: at most one pending override between ticks.
        let (tx, rx) = crossbeam_channel::bounded(1);
        (
            Self {
                rx,
                mode: DriveMode::Autonomous,
                manual_command: VelocityCommand::stop(),
            },
            OverrideSender { tx },
        )
    }

    pub fn mode(&self) -> DriveMode {
        self.mode
    }

    /// Hand control back to the navigation controller.
    pub fn resume_autonomous(&mut self) {
        self.mode = DriveMode::Autonomous;
    }

    /// Pick this tick's authoritative command.
    ///
    /// Drains at most one pending override (converting it via `convert`),
    /// switching to `Manual` when one arrived. In `Manual` the held command
    /// repeats; in `Autonomous` the controller's command passes through.
    pub fn select<F>(&mut self, autonomous: VelocityCommand, convert: F) -> VelocityCommand
    where
        F: FnOnce(&VelocityOverride) -> VelocityCommand,
    {
        if let Ok(ov) = self.rx.try_recv() {
            self.manual_command = convert(&ov);
            self.mode = DriveMode::Manual;
        }

        match self.mode {
            DriveMode::Autonomous => autonomous,
            DriveMode::Manual => self.manual_command,
        }
    }
}
