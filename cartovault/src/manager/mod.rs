//! Resources manager: the catalog together with its scanning, repository
//! and install/update/uninstall machinery.
//!
//! # Overview
//!
//! ```text
//!                    ┌────────────────────────────────┐
//!  DirectoryWatcher ─►         ResourcesManager       │
//!   (debounced)      │  ┌──────────────────────────┐  │
//!                    │  │      ResourceCatalog     │◄─┼── views (read-only)
//!  LocalScanner ─────►  │ builtin / local / repo   │  │
//!                    │  └──────────────────────────┘  │
//!  RepositoryClient ─►  install / update / uninstall  │
//!                    └────────────────────────────────┘
//! ```
//!
//! # Lifecycle
//!
//! ```ignore
//! use std::sync::Arc;
//! use cartovault::manager::{ManagerConfig, ResourcesManager};
//!
//! let manager = Arc::new(ResourcesManager::with_defaults(ManagerConfig::new("/data/maps"))?);
//! manager.initialize()?;
//!
//! manager.update_repository()?;
//! for id in manager.get_outdated_installed_resources() {
//!     manager.update_from_repository(&id, &|done, total| println!("{done}/{total:?}"))?;
//! }
//!
//! manager.teardown();
//! ```
//!
//! # Locking
//!
//! Reconciliation passes scan outside the catalog locks and then apply the
//! result under the local write lock. A `mutation` mutex serializes each
//! scan-and-apply with the commit step of install/update/uninstall, so a pass
//! never applies a scan taken before a concurrent install landed. Order:
//! `mutation` → local → repository. Readers never take `mutation`.
//!
//! A separate `repository_update` mutex serializes listing refreshes, so the
//! in-memory swap and the cache write of one refresh never interleave with
//! another's. It is taken before the repository lock and never while
//! `mutation` or the local lock is held.
//!
//! # States
//!
//! Per id the manager only moves between `Absent` and `Installed`. Builtin
//! and unmanaged resources are never transitioned; mutating them fails with
//! [`ResourceError::NotManaged`].

mod config;
mod installer;
mod staging;

use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::catalog::{LocalIndex, RepositoryIndex, ResourceCatalog};
use crate::container::{ContainerInspector, FileInspector};
use crate::error::{ResourceError, ResourceResult};
use crate::repository::{HttpTransport, RepositoryClient, Transport};
use crate::resource::{
    BuiltinResource, LocalKind, LocalResource, Resource, ResourceInRepository,
};
use crate::scanner::{
    reconcile, ChangeCallback, DirectoryWatcher, LocalScanner, ReconcileReport, ReconcileScope,
    ScanDiagnostic,
};
use crate::views::{MapStylesCollection, ObfsCollection, OnlineTileSources};

pub use config::{ManagerConfig, DEFAULT_DOWNLOAD_BASE_URL, DEFAULT_REPOSITORY_URL};
pub use staging::STAGING_DIR;

/// Summary of [`ResourcesManager::initialize`].
#[derive(Debug, Default)]
pub struct InitReport {
    /// Result of the initial storage scan.
    pub scan: ReconcileReport,
    /// Files skipped by the initial scan.
    pub diagnostics: Vec<ScanDiagnostic>,
    /// Whether a cached repository listing was loaded.
    pub repository_from_cache: bool,
    /// Whether the directory watcher is running.
    pub watching: bool,
}

/// Owner of the resource catalog and every operation that mutates it.
pub struct ResourcesManager {
    config: ManagerConfig,
    catalog: Arc<ResourceCatalog>,
    inspector: Arc<dyn ContainerInspector>,
    scanner: LocalScanner,
    repository: RepositoryClient,
    watcher: Mutex<Option<DirectoryWatcher>>,
    mutation: Mutex<()>,
    repository_update: Mutex<()>,
    initialized: AtomicBool,
}

impl ResourcesManager {
    /// Create a manager with injected collaborators.
    ///
    /// Nothing touches the filesystem or network until [`initialize`](Self::initialize).
    pub fn new(
        config: ManagerConfig,
        transport: Arc<dyn Transport>,
        inspector: Arc<dyn ContainerInspector>,
    ) -> Self {
        let mut repository = RepositoryClient::new(
            transport,
            config.repository_url.clone(),
            config.download_base_url.clone(),
        );
        if let Some(cache_dir) = &config.cache_dir {
            repository = repository.with_cache_dir(cache_dir);
        }

        Self {
            scanner: LocalScanner::new(Arc::clone(&inspector)),
            catalog: Arc::new(ResourceCatalog::new()),
            inspector,
            repository,
            watcher: Mutex::new(None),
            mutation: Mutex::new(()),
            repository_update: Mutex::new(()),
            initialized: AtomicBool::new(false),
            config,
        }
    }

    /// Create a manager using HTTP and the default file inspector.
    pub fn with_defaults(config: ManagerConfig) -> ResourceResult<Self> {
        let transport = HttpTransport::with_timeout(config.timeout)?;
        Ok(Self::new(
            config,
            Arc::new(transport),
            Arc::new(FileInspector::new()),
        ))
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// The underlying catalog, for read-only projection views.
    pub fn catalog(&self) -> &ResourceCatalog {
        &self.catalog
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Scan storage, load the cached listing and start watching if configured.
    ///
    /// Calling this again rescans and keeps an existing watcher.
    pub fn initialize(self: &Arc<Self>) -> ResourceResult<InitReport> {
        let managed = &self.config.managed_dir;
        fs::create_dir_all(managed).map_err(|e| ResourceError::io(managed, e))?;

        let (scan, diagnostics) = self.reconcile_with_diagnostics();
        let repository_from_cache = self.load_repository_from_cache();

        let watching = if self.config.watch {
            self.start_watching()
        } else {
            false
        };

        self.initialized.store(true, Ordering::SeqCst);
        info!(
            local = self.catalog.get_local_resources().len(),
            builtin = self.catalog.get_builtin_resources().len(),
            repository = repository_from_cache,
            watching,
            "Resources manager initialized"
        );

        Ok(InitReport {
            scan,
            diagnostics,
            repository_from_cache,
            watching,
        })
    }

    /// Stop background watching. The catalog stays readable.
    pub fn teardown(&self) {
        if let Some(watcher) = self.watcher.lock().take() {
            watcher.stop();
            debug!("Directory watcher stopped");
        }
        self.initialized.store(false, Ordering::SeqCst);
    }

    /// Whether the directory watcher is running.
    pub fn is_watching(&self) -> bool {
        self.watcher.lock().is_some()
    }

    fn start_watching(self: &Arc<Self>) -> bool {
        let mut slot = self.watcher.lock();
        if slot.is_some() {
            return true;
        }

        let weak: Weak<Self> = Arc::downgrade(self);
        let on_change: ChangeCallback = Arc::new(move || {
            if let Some(manager) = weak.upgrade() {
                manager.reconcile();
            }
        });

        match DirectoryWatcher::spawn(
            &self.config.storage_dirs(),
            self.config.watch_debounce,
            on_change,
        ) {
            Ok(watcher) => {
                *slot = Some(watcher);
                true
            }
            Err(e) => {
                warn!(error = %e, "Directory watching unavailable; changes need a manual rescan");
                false
            }
        }
    }

    /// Rescan managed and unmanaged storage and reconcile the local index.
    ///
    /// Pending removals are retried on every pass.
    pub fn reconcile(&self) -> ReconcileReport {
        self.reconcile_with_diagnostics().0
    }

    /// Rescan unmanaged storage only. Installed entries are left alone.
    pub fn rescan_unmanaged_storage_paths(&self) -> ReconcileReport {
        let _serial = self.mutation.lock();
        let outcome = self.scanner.scan_unmanaged(&self.config.unmanaged_dirs);
        log_diagnostics(&outcome.diagnostics);
        self.apply_scan(outcome.candidates, ReconcileScope::Kind(LocalKind::Unmanaged))
    }

    fn reconcile_with_diagnostics(&self) -> (ReconcileReport, Vec<ScanDiagnostic>) {
        let _serial = self.mutation.lock();
        let outcome = self
            .scanner
            .scan_all(&self.config.managed_dir, &self.config.unmanaged_dirs);
        log_diagnostics(&outcome.diagnostics);
        let report = self.apply_scan(outcome.candidates, ReconcileScope::All);
        (report, outcome.diagnostics)
    }

    fn apply_scan(&self, candidates: LocalIndex, scope: ReconcileScope) -> ReconcileReport {
        let report = {
            let mut local = self.catalog.local_write();
            reconcile(&mut local, candidates, scope)
        };
        if report.changed_index() {
            info!(
                added = report.added.len(),
                updated = report.updated.len(),
                removed = report.removed.len(),
                deferred = report.deferred.len(),
                "Local resources reconciled"
            );
        } else if !report.deferred.is_empty() {
            debug!(deferred = ?report.deferred, "Reconciliation deferred in-use resources");
        }
        report
    }

    /// Load the cached repository listing. Returns whether one was loaded.
    pub fn load_repository_from_cache(&self) -> bool {
        let _serial = self.repository_update.lock();
        match self.repository.load_cached_listing() {
            Some(entries) => {
                self.catalog
                    .replace_repository(RepositoryIndex::from_entries(entries));
                true
            }
            None => false,
        }
    }

    /// Fetch the remote listing and replace the repository index wholesale.
    ///
    /// On any failure the previous listing stays in place. Returns the
    /// number of entries now listed. Concurrent refreshes run one at a time,
    /// so the cache file always holds the listing currently in memory.
    pub fn update_repository(&self) -> ResourceResult<usize> {
        let _serial = self.repository_update.lock();
        let entries = self.repository.fetch_listing().map_err(|e| {
            warn!(url = %self.repository.listing_url(), error = %e, "Repository update failed");
            e
        })?;

        let index = RepositoryIndex::from_entries(entries.clone());
        let count = index.len();
        self.catalog.replace_repository(index);
        self.repository.store_listing(&entries);

        info!(entries = count, "Repository listing updated");
        Ok(count)
    }

    pub fn get_resource(&self, id: &str) -> Option<Resource> {
        self.catalog.get_resource(id)
    }

    pub fn get_builtin_resources(&self) -> std::collections::HashMap<String, Arc<BuiltinResource>> {
        self.catalog.get_builtin_resources()
    }

    pub fn get_builtin_resource(&self, id: &str) -> Option<Arc<BuiltinResource>> {
        self.catalog.get_builtin_resource(id)
    }

    pub fn is_builtin_resource(&self, id: &str) -> bool {
        self.catalog.is_builtin_resource(id)
    }

    pub fn get_local_resources(&self) -> LocalIndex {
        self.catalog.get_local_resources()
    }

    pub fn get_local_resource(&self, id: &str) -> Option<Arc<LocalResource>> {
        self.catalog.get_local_resource(id)
    }

    pub fn is_local_resource(&self, id: &str) -> bool {
        self.catalog.is_local_resource(id)
    }

    pub fn is_resource_installed(&self, id: &str) -> bool {
        self.catalog.is_resource_installed(id)
    }

    pub fn is_repository_available(&self) -> bool {
        self.catalog.is_repository_available()
    }

    pub fn get_resources_in_repository(&self) -> Vec<Arc<ResourceInRepository>> {
        self.catalog.get_resources_in_repository()
    }

    pub fn get_resource_in_repository(&self, id: &str) -> Option<Arc<ResourceInRepository>> {
        self.catalog.get_resource_in_repository(id)
    }

    pub fn is_resource_in_repository(&self, id: &str) -> bool {
        self.catalog.is_resource_in_repository(id)
    }

    pub fn is_installed_resource_outdated(&self, id: &str) -> bool {
        self.catalog.is_installed_resource_outdated(id)
    }

    pub fn get_outdated_installed_resources(&self) -> Vec<String> {
        self.catalog.get_outdated_installed_resources()
    }

    pub fn obfs_collection(&self) -> ObfsCollection {
        ObfsCollection::new(Arc::clone(&self.catalog))
    }

    pub fn online_tile_sources(&self) -> OnlineTileSources {
        OnlineTileSources::new(Arc::clone(&self.catalog))
    }

    pub fn map_styles_collection(&self) -> MapStylesCollection {
        MapStylesCollection::new(Arc::clone(&self.catalog))
    }
}

impl Drop for ResourcesManager {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn log_diagnostics(diagnostics: &[ScanDiagnostic]) {
    if !diagnostics.is_empty() {
        warn!(skipped = diagnostics.len(), "Some resource files were excluded from the scan");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::encode_header;
    use crate::resource::{ObfMetadata, ResourceOrigin, ResourceType};
    use std::path::Path;
    use tempfile::TempDir;

    struct NoNetwork;

    impl Transport for NoNetwork {
        fn fetch(&self, url: &str) -> ResourceResult<Vec<u8>> {
            Err(ResourceError::transfer(url, "offline"))
        }

        fn download(
            &self,
            url: &str,
            _dest: &Path,
            _progress: crate::repository::TransferProgress<'_>,
        ) -> ResourceResult<u64> {
            Err(ResourceError::transfer(url, "offline"))
        }
    }

    fn write_region(dir: &Path, name: &str, timestamp: u64) {
        fs::create_dir_all(dir).unwrap();
        let header = encode_header(&ObfMetadata {
            version: 2,
            timestamp,
        });
        fs::write(dir.join(name), header).unwrap();
    }

    fn manager(temp: &TempDir) -> Arc<ResourcesManager> {
        let config = ManagerConfig::new(temp.path().join("managed"))
            .with_unmanaged_dir(temp.path().join("sd"))
            .with_cache_dir(temp.path().join("cache"));
        Arc::new(ResourcesManager::new(
            config,
            Arc::new(NoNetwork),
            Arc::new(FileInspector::new()),
        ))
    }

    #[test]
    fn test_initialize_scans_storage() {
        let temp = TempDir::new().unwrap();
        write_region(&temp.path().join("managed/regions"), "andorra.map.obf", 1);
        write_region(&temp.path().join("sd"), "Monaco.map.obf", 1);

        let manager = manager(&temp);
        let report = manager.initialize().unwrap();

        assert!(manager.is_initialized());
        assert_eq!(report.scan.added, vec!["andorra", "monaco"]);
        assert!(!report.repository_from_cache);
        assert!(!report.watching);
        assert_eq!(
            manager.get_local_resource("andorra").unwrap().origin(),
            ResourceOrigin::Installed
        );
        assert_eq!(
            manager.get_local_resource("monaco").unwrap().origin(),
            ResourceOrigin::Unmanaged
        );
    }

    #[test]
    fn test_initialize_creates_managed_dir() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp);
        manager.initialize().unwrap();
        assert!(temp.path().join("managed").is_dir());
        assert!(manager.get_local_resources().is_empty());
    }

    #[test]
    fn test_builtins_visible_without_storage() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp);
        assert!(manager.is_builtin_resource(crate::catalog::DEFAULT_MAP_STYLE_ID));
        assert!(matches!(
            manager.get_resource(crate::catalog::DEFAULT_MAP_STYLE_ID),
            Some(Resource::Builtin(_))
        ));
    }

    #[test]
    fn test_update_repository_failure_keeps_state() {
        let temp = TempDir::new().unwrap();
        let manager = manager(&temp);
        manager.initialize().unwrap();

        let err = manager.update_repository().unwrap_err();
        assert!(matches!(err, ResourceError::TransferFailed { .. }));
        assert!(!manager.is_repository_available());
        assert!(manager.get_outdated_installed_resources().is_empty());
    }

    #[test]
    fn test_rescan_unmanaged_only_touches_unmanaged() {
        let temp = TempDir::new().unwrap();
        write_region(&temp.path().join("managed/regions"), "andorra.map.obf", 1);
        let manager = manager(&temp);
        manager.initialize().unwrap();

        fs::remove_file(temp.path().join("managed/regions/andorra.map.obf")).unwrap();
        write_region(&temp.path().join("sd"), "monaco.map.obf", 1);

        let report = manager.rescan_unmanaged_storage_paths();
        assert_eq!(report.added, vec!["monaco"]);
        assert!(report.removed.is_empty());
        // Installed entry is only dropped by a full pass.
        assert!(manager.is_resource_installed("andorra"));
        assert_eq!(manager.reconcile().removed, vec!["andorra"]);
        assert_eq!(
            manager.get_local_resource("monaco").unwrap().resource_type,
            ResourceType::MapRegion
        );
    }

    #[test]
    fn test_teardown_stops_watcher() {
        let temp = TempDir::new().unwrap();
        let config = ManagerConfig::new(temp.path().join("managed")).with_watch(true);
        let manager = Arc::new(ResourcesManager::new(
            config,
            Arc::new(NoNetwork),
            Arc::new(FileInspector::new()),
        ));
        let report = manager.initialize().unwrap();
        assert_eq!(report.watching, manager.is_watching());

        manager.teardown();
        assert!(!manager.is_watching());
        assert!(!manager.is_initialized());
    }
}
