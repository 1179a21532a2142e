//! The resource catalog and its accessors.
//!
//! # Indices
//!
//! ```text
//! ResourceCatalog
//! ├── builtin     HashMap               read-only after construction, no lock
//! ├── local       RwLock<HashMap>       installed + unmanaged, keyed by id
//! └── repository  RwLock<RepositoryIndex>  listing + loaded flag
//! ```
//!
//! Accessors returning collections copy the index into an independent
//! snapshot and release the lock before returning, so callers never iterate
//! while holding a lock a writer needs.
//!
//! Id arguments are normalized with [`naming::normalize_id`] before lookup,
//! so `"Monaco"` and `"monaco"` name the same resource.
//!
//! When an operation needs both mutable indices it locks `local` before
//! `repository`. Writers follow the same order.

mod builtin;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::resource::naming;
use crate::resource::{BuiltinResource, LocalResource, Resource, ResourceInRepository};

pub use builtin::{inflate_builtin_resources, DEFAULT_MAP_STYLE_ID, DEFAULT_TILE_SOURCES_ID};

/// Local index: id → local resource.
pub type LocalIndex = HashMap<String, Arc<LocalResource>>;

/// Repository listing held by the catalog.
///
/// Replaced wholesale on every successful refresh; never edited in place.
#[derive(Debug, Default)]
pub struct RepositoryIndex {
    loaded: bool,
    entries: Vec<Arc<ResourceInRepository>>,
    by_id: HashMap<String, usize>,
}

impl RepositoryIndex {
    /// Build a loaded index from a listing. Later duplicates of an id are dropped.
    pub fn from_entries(entries: Vec<ResourceInRepository>) -> Self {
        let mut index = Self {
            loaded: true,
            entries: Vec::with_capacity(entries.len()),
            by_id: HashMap::with_capacity(entries.len()),
        };
        for entry in entries {
            if index.by_id.contains_key(&entry.id) {
                tracing::debug!(id = %entry.id, "Duplicate repository entry dropped");
                continue;
            }
            index.by_id.insert(entry.id.clone(), index.entries.len());
            index.entries.push(Arc::new(entry));
        }
        index
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn get(&self, id: &str) -> Option<&Arc<ResourceInRepository>> {
        self.by_id.get(id).map(|&i| &self.entries[i])
    }

    pub fn entries(&self) -> &[Arc<ResourceInRepository>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Catalog of every resource known to the manager, by origin.
pub struct ResourceCatalog {
    builtin: HashMap<String, Arc<BuiltinResource>>,
    local: RwLock<LocalIndex>,
    repository: RwLock<RepositoryIndex>,
}

impl Default for ResourceCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceCatalog {
    /// Create a catalog holding the embedded builtin resources.
    pub fn new() -> Self {
        Self::with_builtins(inflate_builtin_resources())
    }

    /// Create a catalog with an explicit builtin set.
    pub fn with_builtins(builtin: HashMap<String, Arc<BuiltinResource>>) -> Self {
        Self {
            builtin,
            local: RwLock::new(HashMap::new()),
            repository: RwLock::new(RepositoryIndex::default()),
        }
    }

    /// Resolve an id with precedence Local > Builtin.
    ///
    /// The repository is not consulted: it describes remote availability,
    /// not a usable resource.
    pub fn get_resource(&self, id: &str) -> Option<Resource> {
        let id = naming::normalize_id(id);
        if let Some(local) = self.get_local_resource(&id) {
            return Some(Resource::Local(local));
        }
        self.get_builtin_resource(&id).map(Resource::Builtin)
    }

    pub fn get_builtin_resources(&self) -> HashMap<String, Arc<BuiltinResource>> {
        self.builtin.clone()
    }

    pub fn get_builtin_resource(&self, id: &str) -> Option<Arc<BuiltinResource>> {
        self.builtin.get(&naming::normalize_id(id)).cloned()
    }

    pub fn is_builtin_resource(&self, id: &str) -> bool {
        self.builtin.contains_key(&naming::normalize_id(id))
    }

    /// Snapshot of the local index.
    pub fn get_local_resources(&self) -> LocalIndex {
        self.local.read().clone()
    }

    pub fn get_local_resource(&self, id: &str) -> Option<Arc<LocalResource>> {
        self.local.read().get(&naming::normalize_id(id)).cloned()
    }

    pub fn is_local_resource(&self, id: &str) -> bool {
        self.local.read().contains_key(&naming::normalize_id(id))
    }

    /// Whether an installed (managed) resource with this id exists.
    pub fn is_resource_installed(&self, id: &str) -> bool {
        self.local
            .read()
            .get(&naming::normalize_id(id))
            .is_some_and(|r| r.is_installed())
    }

    pub(crate) fn local_read(&self) -> RwLockReadGuard<'_, LocalIndex> {
        self.local.read()
    }

    pub(crate) fn local_write(&self) -> RwLockWriteGuard<'_, LocalIndex> {
        self.local.write()
    }

    /// Whether a listing has been loaded, regardless of freshness.
    pub fn is_repository_available(&self) -> bool {
        self.repository.read().is_loaded()
    }

    /// Snapshot of the repository listing, in listing order.
    pub fn get_resources_in_repository(&self) -> Vec<Arc<ResourceInRepository>> {
        self.repository.read().entries().to_vec()
    }

    pub fn get_resource_in_repository(&self, id: &str) -> Option<Arc<ResourceInRepository>> {
        self.repository.read().get(&naming::normalize_id(id)).cloned()
    }

    pub fn is_resource_in_repository(&self, id: &str) -> bool {
        self.repository.read().get(&naming::normalize_id(id)).is_some()
    }

    /// Atomically replace the repository listing.
    pub(crate) fn replace_repository(&self, index: RepositoryIndex) {
        *self.repository.write() = index;
    }

    /// True iff the id is installed, listed, and the listing is strictly newer.
    pub fn is_installed_resource_outdated(&self, id: &str) -> bool {
        let id = naming::normalize_id(id);
        let local = self.local.read();
        let repository = self.repository.read();
        is_outdated(local.get(&id), repository.get(&id))
    }

    /// Ids of every outdated installed resource, sorted.
    ///
    /// Returns an empty list when no repository listing is loaded.
    pub fn get_outdated_installed_resources(&self) -> Vec<String> {
        let local = self.local.read();
        let repository = self.repository.read();
        if !repository.is_loaded() {
            return Vec::new();
        }

        let mut outdated: Vec<String> = local
            .iter()
            .filter(|(id, res)| is_outdated(Some(*res), repository.get(id)))
            .map(|(id, _)| id.clone())
            .collect();
        outdated.sort();
        outdated
    }
}

fn is_outdated(
    local: Option<&Arc<LocalResource>>,
    remote: Option<&Arc<ResourceInRepository>>,
) -> bool {
    match (local, remote) {
        (Some(local), Some(remote)) => {
            local.is_installed()
                && local.resource_type == remote.resource_type
                && remote.is_newer_than(local.timestamp())
        }
        _ => false,
    }
}
