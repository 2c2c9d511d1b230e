//! DishaSLAM node.
//!
//! Wires the control loop to a driver and runs it until Ctrl-C. Without
//! hardware attached the node runs against the built-in room simulation,
//! which is also the recommended way to sanity-check a configuration.

use std::env;
use std::path::Path;

use disha_slam::config::DishaConfig;
use disha_slam::engine::ControlLoop;
use disha_slam::error::Result;
use disha_slam::io::LogPublisher;
use disha_slam::io::mock::{RoomSimDriver, SimScanGeometry};
use disha_slam::utils::signal::shutdown_flag;

/// Parse the config path from the command line.
///
/// Supports `disha-slam-node <path>`, `--config <path>` and `-c <path>`;
/// defaults to `disha.toml` in the working directory when present.
fn parse_config_path() -> Option<String> {
    let args: Vec<String> = env::args().collect();

    for i in 1..args.len() {
        if (args[i] == "--config" || args[i] == "-c") && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }

    if args.len() > 1 && !args[1].starts_with('-') {
        return Some(args[1].clone());
    }

    if Path::new("disha.toml").exists() {
        return Some("disha.toml".to_string());
    }

    None
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("DishaSLAM v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = match parse_config_path() {
        Some(path) => {
            log::info!("using config: {path}");
            DishaConfig::load(Path::new(&path))?
        }
        None => {
            log::info!("using default configuration");
            DishaConfig::default()
        }
    };

    let running = shutdown_flag()?;

    // No hardware in this build target: drive the loop against the room
    // simulation. A serial-attached driver implements the same trait.
    let tick_dt = 1.0 / config.control.rate_hz;
    let samples =
        ((config.scanner.angle_max - config.scanner.angle_min) / config.scanner.angle_increment)
            .round() as usize;
    let geometry = SimScanGeometry {
        angle_min: config.scanner.angle_min,
        angle_increment: config.scanner.angle_increment,
        samples,
        range_min: config.scanner.range_min,
        range_max: config.scanner.range_max,
    };
    let driver = RoomSimDriver::new(8.0, 8.0, config.odometry.wheel_base, tick_dt)
        .with_geometry(geometry);
    let publisher = LogPublisher;

    let (mut control_loop, _override_tx) = ControlLoop::new(&config, driver, publisher);

    control_loop.run(&running)?;

    log::info!(
        "final pose estimate: ({:.2}, {:.2}, {:.2} rad), {} landmarks mapped",
        control_loop.pose().x,
        control_loop.pose().y,
        control_loop.pose().theta,
        control_loop.estimator().landmark_count()
    );
    log::info!("DishaSLAM stopped");
    Ok(())
}
