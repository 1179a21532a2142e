//! Local resources living on disk.
//!
//! A [`LocalResource`] is either installed under managed storage or found in
//! an unmanaged directory. Both carry a lock count tracking consumers that
//! hold the resource's file open through the data-file projection view.

use std::fmt;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use super::metadata::{ObfFile, ResourceMetadata};
use super::types::{ResourceOrigin, ResourceType};
use super::ResourceIdentity;

/// Which local storage a resource was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalKind {
    /// Lives under managed storage; eligible for update and uninstall.
    Installed,
    /// Lives in an unmanaged directory; read-only to the catalog.
    Unmanaged,
}

impl LocalKind {
    pub fn origin(&self) -> ResourceOrigin {
        match self {
            Self::Installed => ResourceOrigin::Installed,
            Self::Unmanaged => ResourceOrigin::Unmanaged,
        }
    }
}

/// A resource file on local storage.
///
/// Instances are shared through `Arc` between the local index, snapshots and
/// data handles. The identity, path and metadata never change after
/// construction; a file change produces a new instance.
pub struct LocalResource {
    identity: ResourceIdentity,
    kind: LocalKind,
    path: PathBuf,
    metadata: ResourceMetadata,
    lock_count: AtomicUsize,
    pending_removal: AtomicBool,
    obf_file: OnceLock<Arc<ObfFile>>,
}

impl LocalResource {
    /// Create a local resource from inspected metadata.
    pub fn new(
        id: impl Into<String>,
        kind: LocalKind,
        path: impl Into<PathBuf>,
        metadata: ResourceMetadata,
    ) -> Self {
        let resource_type = metadata.resource_type();
        Self {
            identity: ResourceIdentity::new(id, resource_type),
            kind,
            path: path.into(),
            metadata,
            lock_count: AtomicUsize::new(0),
            pending_removal: AtomicBool::new(false),
            obf_file: OnceLock::new(),
        }
    }

    pub fn kind(&self) -> LocalKind {
        self.kind
    }

    pub fn origin(&self) -> ResourceOrigin {
        self.kind.origin()
    }

    pub fn is_installed(&self) -> bool {
        self.kind == LocalKind::Installed
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.metadata.size
    }

    pub fn timestamp(&self) -> u64 {
        self.metadata.timestamp
    }

    pub fn metadata(&self) -> &ResourceMetadata {
        &self.metadata
    }

    /// Number of consumers currently holding this resource open.
    pub fn lock_count(&self) -> usize {
        self.lock_count.load(Ordering::SeqCst)
    }

    pub fn is_locked(&self) -> bool {
        self.lock_count() > 0
    }

    pub(crate) fn lock(&self) {
        self.lock_count.fetch_add(1, Ordering::SeqCst);
    }

    /// Decrement the lock count, saturating at zero.
    pub(crate) fn unlock(&self) {
        let _ = self
            .lock_count
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    /// Whether the file vanished while the resource was locked.
    pub fn is_pending_removal(&self) -> bool {
        self.pending_removal.load(Ordering::SeqCst)
    }

    pub(crate) fn set_pending_removal(&self, pending: bool) {
        self.pending_removal.store(pending, Ordering::SeqCst);
    }

    /// Opened map-data container, created on first access.
    ///
    /// Returns `None` for resources that are not map regions.
    pub fn obf_file(&self) -> Option<Arc<ObfFile>> {
        let header = *self.metadata.obf()?;
        Some(Arc::clone(self.obf_file.get_or_init(|| {
            Arc::new(ObfFile {
                id: self.identity.id.clone(),
                path: self.path.clone(),
                size: self.metadata.size,
                metadata: header,
            })
        })))
    }

    /// Whether two scans of the same id describe the same file contents.
    pub fn same_file_as(&self, other: &LocalResource) -> bool {
        self.kind == other.kind
            && self.path == other.path
            && self.metadata.size == other.metadata.size
            && self.metadata.timestamp == other.metadata.timestamp
            && self.identity.resource_type == other.identity.resource_type
    }
}

impl Deref for LocalResource {
    type Target = ResourceIdentity;

    fn deref(&self) -> &Self::Target {
        &self.identity
    }
}

impl fmt::Debug for LocalResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalResource")
            .field("id", &self.identity.id)
            .field("type", &self.identity.resource_type)
            .field("kind", &self.kind)
            .field("path", &self.path)
            .field("size", &self.metadata.size)
            .field("timestamp", &self.metadata.timestamp)
            .field("lock_count", &self.lock_count())
            .field("pending_removal", &self.is_pending_removal())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ObfMetadata, ResourcePayload};

    fn region(timestamp: u64) -> LocalResource {
        LocalResource::new(
            "andorra",
            LocalKind::Installed,
            "/data/regions/andorra.map.obf",
            ResourceMetadata {
                size: 128,
                timestamp,
                payload: ResourcePayload::MapRegion(ObfMetadata {
                    version: 2,
                    timestamp,
                }),
            },
        )
    }

    #[test]
    fn test_deref_identity() {
        let res = region(1);
        assert_eq!(res.id, "andorra");
        assert_eq!(res.resource_type, ResourceType::MapRegion);
        assert_eq!(res.origin(), ResourceOrigin::Installed);
    }

    #[test]
    fn test_lock_unlock() {
        let res = region(1);
        assert!(!res.is_locked());
        res.lock();
        res.lock();
        assert_eq!(res.lock_count(), 2);
        res.unlock();
        res.unlock();
        assert_eq!(res.lock_count(), 0);
    }

    #[test]
    fn test_unlock_saturates_at_zero() {
        let res = region(1);
        res.unlock();
        assert_eq!(res.lock_count(), 0);
    }

    #[test]
    fn test_obf_file_is_cached() {
        let res = region(7);
        let a = res.obf_file().unwrap();
        let b = res.obf_file().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.metadata.timestamp, 7);
    }

    #[test]
    fn test_same_file_as() {
        assert!(region(1).same_file_as(&region(1)));
        assert!(!region(1).same_file_as(&region(2)));
    }
}
