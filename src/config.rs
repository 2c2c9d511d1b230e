//! Configuration loading for the DishaSLAM node.

use serde::Deserialize;
use std::path::Path;

use crate::algorithms::association::AssociationConfig;
use crate::algorithms::estimation::EkfConfig;
use crate::algorithms::extraction::RansacConfig;
use crate::algorithms::mapping::EvidenceGridConfig;
use crate::error::Result;
use crate::navigation::NavigatorConfig;
use crate::sensors::OdometryConfig;

/// Main configuration structure.
#[derive(Clone, Debug, Deserialize)]
pub struct DishaConfig {
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub odometry: OdometryConfig,
    #[serde(default)]
    pub ransac: RansacConfig,
    #[serde(default)]
    pub association: AssociationConfig,
    #[serde(default)]
    pub ekf: EkfConfig,
    #[serde(default)]
    pub grid: EvidenceGridConfig,
    #[serde(default)]
    pub navigation: NavigatorConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub frames: FrameConfig,
}

/// Range scanner geometry constants.
#[derive(Clone, Debug, Deserialize)]
pub struct ScannerConfig {
    /// Start angle of a revolution, radians.
    #[serde(default = "default_angle_min")]
    pub angle_min: f32,

    /// End angle of a revolution, radians.
    #[serde(default = "default_angle_max")]
    pub angle_max: f32,

    /// Angular step between readings, radians.
    #[serde(default = "default_angle_increment")]
    pub angle_increment: f32,

    /// Minimum valid range, meters.
    #[serde(default = "default_range_min")]
    pub range_min: f32,

    /// Maximum valid range, meters.
    #[serde(default = "default_range_max")]
    pub range_max: f32,
}

fn default_angle_min() -> f32 {
    0.0
}
fn default_angle_max() -> f32 {
    6.26
}
fn default_angle_increment() -> f32 {
    0.017437326
}
fn default_range_min() -> f32 {
    0.020
}
fn default_range_max() -> f32 {
    5.0
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            angle_min: default_angle_min(),
            angle_max: default_angle_max(),
            angle_increment: default_angle_increment(),
            range_min: default_range_min(),
            range_max: default_range_max(),
        }
    }
}

/// Control loop parameters.
#[derive(Clone, Debug, Deserialize)]
pub struct ControlConfig {
    /// Tick rate in Hz.
    #[serde(default = "default_rate_hz")]
    pub rate_hz: f32,

    /// Goal position in the odometry frame, meters.
    #[serde(default = "default_goal")]
    pub goal: [f32; 2],
}

fn default_rate_hz() -> f32 {
    2.0
}
fn default_goal() -> [f32; 2] {
    [5.0, 5.0]
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            rate_hz: default_rate_hz(),
            goal: default_goal(),
        }
    }
}

/// Coordinate frame names used in telemetry.
#[derive(Clone, Debug, Deserialize)]
pub struct FrameConfig {
    #[serde(default = "default_odom_frame")]
    pub odom: String,
    #[serde(default = "default_base_frame")]
    pub base: String,
    #[serde(default = "default_scanner_frame")]
    pub scanner: String,
}

fn default_odom_frame() -> String {
    "odom".to_string()
}
fn default_base_frame() -> String {
    "base_link".to_string()
}
fn default_scanner_frame() -> String {
    "base_laser_link".to_string()
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            odom: default_odom_frame(),
            base: default_base_frame(),
            scanner: default_scanner_frame(),
        }
    }
}

impl Default for DishaConfig {
    fn default() -> Self {
        Self {
            scanner: ScannerConfig::default(),
            odometry: OdometryConfig::default(),
            ransac: RansacConfig::default(),
            association: AssociationConfig::default(),
            ekf: EkfConfig::default(),
            grid: EvidenceGridConfig::default(),
            navigation: NavigatorConfig::default(),
            control: ControlConfig::default(),
            frames: FrameConfig::default(),
        }
    }
}

impl DishaConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: DishaConfig = toml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_platform() {
        let config = DishaConfig::default();
        assert_eq!(config.control.rate_hz, 2.0);
        assert_eq!(config.scanner.range_max, 5.0);
        assert_eq!(config.odometry.ticks_per_meter, 1000.0);
        assert_eq!(config.frames.base, "base_link");
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let toml_str = r#"
            [control]
            rate_hz = 5.0
            goal = [2.0, 0.0]

            [navigation]
            drive_speed = 150.0
        "#;
        let config: DishaConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.control.rate_hz, 5.0);
        assert_eq!(config.control.goal, [2.0, 0.0]);
        assert_eq!(config.navigation.drive_speed, 150.0);
        // Untouched sections keep their defaults.
        assert_eq!(config.navigation.max_wheel_speed, 300.0);
        assert_eq!(config.scanner.angle_increment, 0.017437326);
    }

    #[test]
    fn empty_toml_is_the_default_config() {
        let config: DishaConfig = toml::from_str("").unwrap();
        assert_eq!(config.control.goal, [5.0, 5.0]);
        assert_eq!(config.grid.width, 512);
    }
}
