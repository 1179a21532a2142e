//! `watch` command: keep the catalog in sync with storage until Ctrl+C.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cartovault::ResourcesManager;

use crate::error::CliError;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Run the watch command.
pub fn run(manager: Arc<ResourcesManager>) -> Result<(), CliError> {
    if !manager.is_watching() {
        return Err(CliError::Config(
            "directory watching could not be started on this system".to_string(),
        ));
    }

    let config = manager.config();
    println!("Watching storage directories:");
    for dir in config.storage_dirs() {
        println!("  {}", dir.display());
    }
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    // Set up signal handler for graceful shutdown
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    ctrlc::set_handler(move || {
        println!();
        println!("Received shutdown signal, stopping...");
        shutdown_clone.store(true, Ordering::SeqCst);
    })
    .map_err(|e| CliError::Config(format!("Failed to set signal handler: {}", e)))?;

    let mut last_count = manager.get_local_resources().len();
    while !shutdown.load(Ordering::SeqCst) {
        thread::sleep(POLL_INTERVAL);
        let count = manager.get_local_resources().len();
        if count != last_count {
            println!("Local resources: {}", count);
            last_count = count;
        }
    }

    manager.teardown();
    Ok(())
}
