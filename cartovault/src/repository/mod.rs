//! Repository client: remote listing fetch, listing cache, downloads.
//!
//! The client itself holds no listing; the catalog owns the repository
//! index. The manager drives the client and commits results:
//!
//! ```text
//! update:   transport.fetch(listing_url) ─► parse_listing ─► catalog.replace_repository
//!                                                         └► ListingCache::save
//! startup:  ListingCache::load ─────────────────────────────► catalog.replace_repository
//! download: transport.download(entry.download_url, staging) ─► size check
//! ```

mod cache;
mod parser;
mod transport;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{ResourceError, ResourceResult};
use crate::resource::ResourceInRepository;

pub use cache::{cache_path, ListingCache, CACHE_FILE_NAME};
pub use parser::parse_listing;
pub use transport::{HttpTransport, Transport, TransferProgress, DEFAULT_TIMEOUT_SECS};

/// Client for the remote resource repository.
pub struct RepositoryClient {
    transport: Arc<dyn Transport>,
    listing_url: String,
    download_base_url: String,
    cache_path: Option<PathBuf>,
}

impl RepositoryClient {
    /// Create a client without a listing cache.
    pub fn new(
        transport: Arc<dyn Transport>,
        listing_url: impl Into<String>,
        download_base_url: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            listing_url: listing_url.into(),
            download_base_url: download_base_url.into(),
            cache_path: None,
        }
    }

    /// Persist listings under the given cache directory.
    pub fn with_cache_dir(mut self, cache_dir: impl AsRef<Path>) -> Self {
        self.cache_path = Some(cache_path(cache_dir.as_ref()));
        self
    }

    pub fn listing_url(&self) -> &str {
        &self.listing_url
    }

    pub fn cache_path(&self) -> Option<&Path> {
        self.cache_path.as_deref()
    }

    /// Read the cached listing, if any.
    ///
    /// A missing or corrupt cache yields `None`; it is never fatal.
    pub fn load_cached_listing(&self) -> Option<Vec<ResourceInRepository>> {
        let path = self.cache_path.as_ref()?;
        match ListingCache::load(path) {
            Ok(cache) => {
                info!(
                    entries = cache.resources.len(),
                    age = %cache.age_human(),
                    "Loaded repository listing from cache"
                );
                Some(cache.resources)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No repository cache");
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable repository cache");
                None
            }
        }
    }

    /// Fetch and fully parse the remote listing.
    pub fn fetch_listing(&self) -> ResourceResult<Vec<ResourceInRepository>> {
        debug!(url = %self.listing_url, "Fetching repository listing");
        let bytes = self.transport.fetch(&self.listing_url)?;
        parse_listing(&bytes, &self.listing_url, &self.download_base_url)
    }

    /// Persist a listing to the cache. Failures are logged, not returned.
    pub fn store_listing(&self, resources: &[ResourceInRepository]) {
        let Some(path) = self.cache_path.as_ref() else {
            return;
        };
        let cache = ListingCache::new(self.listing_url.clone(), resources.to_vec());
        if let Err(e) = cache.save(path) {
            warn!(path = %path.display(), error = %e, "Failed to write repository cache");
        }
    }

    /// Download a listed resource to `dest`.
    ///
    /// Progress passed to `progress` never decreases. On transport failure or
    /// when the byte count differs from the advertised size, no file is left
    /// at `dest`.
    pub fn download(
        &self,
        entry: &ResourceInRepository,
        dest: &Path,
        progress: TransferProgress<'_>,
    ) -> ResourceResult<u64> {
        let high_water = AtomicU64::new(0);
        let advertised = entry.size;
        let monotonic = |transferred: u64, total: Option<u64>| {
            let previous = high_water.fetch_max(transferred, Ordering::SeqCst);
            if transferred >= previous {
                progress(transferred, total.or(Some(advertised)));
            }
        };

        info!(id = %entry.id, url = %entry.download_url, size = entry.size, "Downloading");
        let result = self
            .transport
            .download(&entry.download_url, dest, &monotonic)
            .and_then(|written| {
                let on_disk = fs::metadata(dest)
                    .map(|m| m.len())
                    .map_err(|e| ResourceError::io(dest, e))?;
                if written != entry.size || on_disk != entry.size {
                    return Err(ResourceError::transfer(
                        &entry.download_url,
                        format!(
                            "size mismatch: expected {} bytes, received {}",
                            entry.size, on_disk
                        ),
                    ));
                }
                Ok(written)
            });

        if result.is_err() && dest.exists() {
            fs::remove_file(dest).ok();
        }
        result
    }
}
