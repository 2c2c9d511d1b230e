//! Signal handling for graceful shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{DishaError, Result};

/// Install a Ctrl-C handler that clears the returned flag.
///
/// The control loop polls the flag each tick and runs its power-down path
/// once it reads false.
pub fn shutdown_flag() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })
    .map_err(|e| DishaError::Config(format!("failed to install signal handler: {e}")))?;
    Ok(running)
}
