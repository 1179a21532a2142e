//! Directory watching for storage roots.
//!
//! Filesystem events are forwarded over a channel to a worker thread that
//! debounces bursts (a download or copy produces many events) and invokes
//! the change callback once per burst. The callback runs a synchronous,
//! lock-protected reconciliation; this module only decides *when*.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Default quiet period before a burst of events triggers a rescan.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// How often the worker checks for shutdown while idle.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Callback invoked after a debounced burst of changes.
pub type ChangeCallback = Arc<dyn Fn() + Send + Sync>;

/// Watches storage directories and reports debounced changes.
///
/// Dropping the watcher stops the worker thread.
pub struct DirectoryWatcher {
    watcher: Option<RecommendedWatcher>,
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
    watched: Vec<PathBuf>,
}

impl DirectoryWatcher {
    /// Start watching `paths` (recursively). Paths that do not exist are skipped.
    pub fn spawn(
        paths: &[PathBuf],
        debounce: Duration,
        on_change: ChangeCallback,
    ) -> Result<Self, notify::Error> {
        let (tx, rx) = mpsc::channel::<()>();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) if is_relevant(&event.kind) => {
                    let _ = tx.send(());
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %e, "Directory watch error"),
            }
        })?;

        let mut watched = Vec::new();
        for path in paths {
            if !path.is_dir() {
                tracing::debug!(path = %path.display(), "Not watching missing directory");
                continue;
            }
            watcher.watch(path, RecursiveMode::Recursive)?;
            watched.push(path.clone());
        }

        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("cartovault-watch".to_string())
            .spawn(move || run_worker(rx, debounce, on_change, worker_stop))
            .map_err(notify::Error::io)?;

        tracing::info!(paths = watched.len(), "Watching storage directories");

        Ok(Self {
            watcher: Some(watcher),
            handle: Some(handle),
            stop,
            watched,
        })
    }

    /// Directories actually being watched.
    pub fn watched_paths(&self) -> &[PathBuf] {
        &self.watched
    }

    /// Whether `path` lies under a watched directory.
    pub fn is_watching(&self, path: &Path) -> bool {
        self.watched.iter().any(|root| path.starts_with(root))
    }

    /// Stop watching and wait for the worker to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        self.watcher.take();
        if let Some(handle) = self.handle.take() {
            // The worker may end up dropping its own watcher via the callback.
            if handle.thread().id() != thread::current().id() {
                handle.join().ok();
            }
        }
    }
}

impl Drop for DirectoryWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn is_relevant(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Any
    )
}

fn run_worker(
    rx: Receiver<()>,
    debounce: Duration,
    on_change: ChangeCallback,
    stop: Arc<AtomicBool>,
) {
    while !stop.load(Ordering::SeqCst) {
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(()) => {
                // Drain the burst until things are quiet.
                loop {
                    match rx.recv_timeout(debounce) {
                        Ok(()) => continue,
                        Err(RecvTimeoutError::Timeout) => break,
                        Err(RecvTimeoutError::Disconnected) => return,
                    }
                }
                if stop.load(Ordering::SeqCst) {
                    return;
                }
                tracing::debug!("Storage changed; reconciling");
                on_change();
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
}
