//! Configuration for the resources manager.

use std::path::PathBuf;
use std::time::Duration;

use crate::repository::DEFAULT_TIMEOUT_SECS;
use crate::scanner::DEFAULT_DEBOUNCE;

/// Default repository listing URL.
pub const DEFAULT_REPOSITORY_URL: &str = "https://download.osmand.net/get_indexes?xml";

/// Default prefix for download URLs of listed resources.
pub const DEFAULT_DOWNLOAD_BASE_URL: &str = "https://download.osmand.net/download.php?file=";

/// Configuration for the resources manager.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Directory owned by the manager; installed resources live here.
    pub managed_dir: PathBuf,

    /// Externally supplied directories, indexed read-only.
    pub unmanaged_dirs: Vec<PathBuf>,

    /// Directory for the repository listing cache.
    ///
    /// `None` disables the cache.
    pub cache_dir: Option<PathBuf>,

    /// URL of the repository listing document.
    pub repository_url: String,

    /// Prefix for download URLs of entries without an explicit URL.
    pub download_base_url: String,

    /// HTTP request timeout.
    pub timeout: Duration,

    /// Whether to watch storage directories and reconcile on change.
    pub watch: bool,

    /// Quiet period before a burst of file events triggers a rescan.
    pub watch_debounce: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            managed_dir: PathBuf::from("."),
            unmanaged_dirs: Vec::new(),
            cache_dir: None,
            repository_url: DEFAULT_REPOSITORY_URL.to_string(),
            download_base_url: DEFAULT_DOWNLOAD_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            watch: false,
            watch_debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl ManagerConfig {
    /// Create a configuration with the given managed directory.
    pub fn new(managed_dir: impl Into<PathBuf>) -> Self {
        Self {
            managed_dir: managed_dir.into(),
            ..Default::default()
        }
    }

    /// Add an unmanaged directory.
    pub fn with_unmanaged_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.unmanaged_dirs.push(path.into());
        self
    }

    /// Set the listing cache directory.
    pub fn with_cache_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(path.into());
        self
    }

    /// Set the repository listing URL.
    pub fn with_repository_url(mut self, url: impl Into<String>) -> Self {
        self.repository_url = url.into();
        self
    }

    /// Set the download URL prefix.
    pub fn with_download_base_url(mut self, url: impl Into<String>) -> Self {
        self.download_base_url = url.into();
        self
    }

    /// Set the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable directory watching.
    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    /// Set the watch debounce period.
    pub fn with_watch_debounce(mut self, debounce: Duration) -> Self {
        self.watch_debounce = debounce;
        self
    }

    /// Every directory scanned for local resources, managed first.
    pub fn storage_dirs(&self) -> Vec<PathBuf> {
        std::iter::once(self.managed_dir.clone())
            .chain(self.unmanaged_dirs.iter().cloned())
            .collect()
    }
}
