//! Map-data files available to the rendering side.

use std::fs::File;
use std::sync::Arc;

use crate::catalog::ResourceCatalog;
use crate::error::{ResourceError, ResourceResult};
use crate::resource::{LocalResource, ObfFile, ResourceType};

/// Installed and unmanaged map regions, recomputed on every call.
#[derive(Clone)]
pub struct ObfsCollection {
    catalog: Arc<ResourceCatalog>,
}

impl ObfsCollection {
    pub fn new(catalog: Arc<ResourceCatalog>) -> Self {
        Self { catalog }
    }

    /// Every usable map-data file, sorted by id.
    ///
    /// Resources whose file vanished while in use are left out.
    pub fn get_obf_files(&self) -> Vec<Arc<ObfFile>> {
        let mut files: Vec<_> = self
            .catalog
            .get_local_resources()
            .values()
            .filter(|r| is_usable_region(r))
            .filter_map(|r| r.obf_file())
            .collect();
        files.sort_by(|a, b| a.id.cmp(&b.id));
        files
    }

    /// Lock every usable map region and return a handle over them.
    ///
    /// Locks are taken under the local read lock, so an uninstall or update
    /// either completes before the handle exists or sees it and fails with
    /// `InUse`.
    pub fn obtain_data_interface(&self) -> DataInterface {
        let local = self.catalog.local_read();
        let mut resources: Vec<Arc<LocalResource>> = local
            .values()
            .filter(|r| is_usable_region(r))
            .cloned()
            .collect();
        for resource in &resources {
            resource.lock();
        }
        drop(local);

        resources.sort_by(|a, b| a.id.cmp(&b.id));
        let files = resources.iter().filter_map(|r| r.obf_file()).collect();
        tracing::trace!(count = resources.len(), "Data interface obtained");
        DataInterface { resources, files }
    }
}

fn is_usable_region(resource: &LocalResource) -> bool {
    resource.resource_type == ResourceType::MapRegion && !resource.is_pending_removal()
}

/// Read access to a fixed set of map-data files.
///
/// Holding a handle keeps every contributing resource locked: none of them
/// can be updated or uninstalled until the handle is dropped.
pub struct DataInterface {
    resources: Vec<Arc<LocalResource>>,
    files: Vec<Arc<ObfFile>>,
}

impl DataInterface {
    /// Files covered by this handle, sorted by id.
    pub fn obf_files(&self) -> &[Arc<ObfFile>] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.files.iter().any(|f| f.id == id)
    }

    /// Open the file of one covered region.
    pub fn open(&self, id: &str) -> ResourceResult<File> {
        let file = self
            .files
            .iter()
            .find(|f| f.id == id)
            .ok_or_else(|| ResourceError::not_found(id))?;
        file.open().map_err(|e| ResourceError::io(file.path(), e))
    }
}

impl Drop for DataInterface {
    fn drop(&mut self) {
        for resource in &self.resources {
            resource.unlock();
        }
        tracing::trace!(count = self.resources.len(), "Data interface released");
    }
}

impl std::fmt::Debug for DataInterface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataInterface")
            .field("files", &self.files.iter().map(|f| &f.id).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{
        LocalKind, ObfMetadata, ResourceMetadata, ResourcePayload,
    };

    fn region(id: &str, kind: LocalKind) -> Arc<LocalResource> {
        Arc::new(LocalResource::new(
            id,
            kind,
            format!("/storage/{}.map.obf", id),
            ResourceMetadata {
                size: 16,
                timestamp: 1,
                payload: ResourcePayload::MapRegion(ObfMetadata {
                    version: 2,
                    timestamp: 1,
                }),
            },
        ))
    }

    fn voice(id: &str) -> Arc<LocalResource> {
        Arc::new(LocalResource::new(
            id,
            LocalKind::Installed,
            format!("/storage/{}.voice", id),
            ResourceMetadata {
                size: 16,
                timestamp: 1,
                payload: ResourcePayload::VoicePack,
            },
        ))
    }

    fn catalog_with(resources: &[Arc<LocalResource>]) -> Arc<ResourceCatalog> {
        let catalog = Arc::new(ResourceCatalog::new());
        {
            let mut local = catalog.local_write();
            for r in resources {
                local.insert(r.id.clone(), Arc::clone(r));
            }
        }
        catalog
    }

    #[test]
    fn test_obf_files_include_installed_and_unmanaged() {
        let catalog = catalog_with(&[
            region("monaco", LocalKind::Unmanaged),
            region("andorra", LocalKind::Installed),
            voice("en"),
        ]);
        let collection = ObfsCollection::new(catalog);
        let ids: Vec<_> = collection
            .get_obf_files()
            .iter()
            .map(|f| f.id.clone())
            .collect();
        assert_eq!(ids, vec!["andorra", "monaco"]);
    }

    #[test]
    fn test_data_interface_locks_until_dropped() {
        let andorra = region("andorra", LocalKind::Installed);
        let monaco = region("monaco", LocalKind::Unmanaged);
        let collection = ObfsCollection::new(catalog_with(&[andorra.clone(), monaco.clone()]));

        let first = collection.obtain_data_interface();
        let second = collection.obtain_data_interface();
        assert_eq!(first.len(), 2);
        assert!(first.contains("andorra"));
        assert_eq!(andorra.lock_count(), 2);
        assert_eq!(monaco.lock_count(), 2);

        drop(first);
        assert_eq!(andorra.lock_count(), 1);
        drop(second);
        assert_eq!(andorra.lock_count(), 0);
        assert_eq!(monaco.lock_count(), 0);
    }

    #[test]
    fn test_pending_removal_excluded() {
        let gone = region("gone", LocalKind::Installed);
        gone.set_pending_removal(true);
        let collection = ObfsCollection::new(catalog_with(&[gone.clone()]));

        assert!(collection.get_obf_files().is_empty());
        let handle = collection.obtain_data_interface();
        assert!(handle.is_empty());
        assert_eq!(gone.lock_count(), 0);
    }

    #[test]
    fn test_open_unknown_region() {
        let collection = ObfsCollection::new(catalog_with(&[]));
        let handle = collection.obtain_data_interface();
        assert!(matches!(handle.open("nowhere"), Err(ResourceError::NotFound { .. })));
    }
}
