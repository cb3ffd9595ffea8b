//! Signal handling for graceful shutdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{Error, Result};

/// Install a Ctrl-C / SIGTERM handler that clears `running`.
///
/// # Example
/// ```ignore
/// let running = Arc::new(AtomicBool::new(true));
/// install_shutdown_handler(Arc::clone(&running))?;
/// while running.load(Ordering::SeqCst) {
///     // ... do work ...
/// }
/// ```
pub fn install_shutdown_handler(running: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        log::info!("Shutdown signal received");
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|e| Error::Other(format!("cannot install signal handler: {}", e)))
}
