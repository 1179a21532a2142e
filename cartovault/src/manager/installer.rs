//! Install, update and uninstall.
//!
//! Every mutation follows the same sequence:
//!
//! 1. Pre-check the catalog (fail fast before copying or downloading)
//! 2. Stage the new file under `.staging/` and inspect it
//! 3. Take the mutation and local write locks, re-check, rename into place,
//!    swap the entry
//!
//! Nothing becomes visible before step 3, and a failure at any step drops
//! the staged file, so the catalog and managed storage keep their pre-call
//! state. Lock counts are only trusted under the write lock: data handles
//! increment them under the read lock, so no handle can appear between the
//! check and the file swap.

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::catalog::LocalIndex;
use crate::error::{ResourceError, ResourceResult};
use crate::repository::TransferProgress;
use crate::resource::naming::{self, managed_path};
use crate::resource::{LocalKind, LocalResource, ResourceInRepository, ResourceType};

use super::staging::StagedFile;
use super::ResourcesManager;

impl ResourcesManager {
    /// Install a resource from a local file.
    ///
    /// Without an explicit `id` the id is derived from the file name. The
    /// source file is copied, never moved.
    pub fn install_from_file(
        &self,
        id: Option<&str>,
        path: &Path,
        resource_type: ResourceType,
    ) -> ResourceResult<Arc<LocalResource>> {
        let id = resolve_id(id, path, resource_type)?;
        ensure_source_file(path, resource_type)?;
        self.ensure_absent(&id)?;

        let staged = StagedFile::new(&self.config.managed_dir, &id, resource_type)?;
        staged.fill_from(path)?;
        self.commit_install(&id, resource_type, staged)
    }

    /// Download a listed resource and install it.
    pub fn install_from_repository(
        &self,
        id: &str,
        progress: TransferProgress<'_>,
    ) -> ResourceResult<Arc<LocalResource>> {
        let entry = self.repository_entry(id)?;
        self.ensure_absent(&entry.id)?;

        let staged = self.download_to_staging(&entry, progress)?;
        self.commit_install(&entry.id, entry.resource_type, staged)
    }

    /// Replace an installed resource with a local file.
    ///
    /// Without an explicit `id` both id and type are derived from the file name.
    pub fn update_from_file(
        &self,
        id: Option<&str>,
        path: &Path,
    ) -> ResourceResult<Arc<LocalResource>> {
        let (id, derived_type) = match id {
            Some(id) => (normalize_id(id, path, None)?, None),
            None => {
                let (id, ty) = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .and_then(naming::split_file_name)
                    .ok_or_else(|| {
                        ResourceError::untyped_validation(
                            path,
                            "cannot derive a resource id from the file name",
                        )
                    })?;
                (id, Some(ty))
            }
        };

        let existing = self.check_installed(&self.catalog.local_read(), &id)?;
        let resource_type = existing.resource_type;
        if let Some(derived) = derived_type.filter(|ty| *ty != resource_type) {
            return Err(ResourceError::validation(
                path,
                resource_type,
                format!("file is a {}, installed resource is a {}", derived, resource_type),
            ));
        }
        ensure_source_file(path, resource_type)?;

        let staged = StagedFile::new(&self.config.managed_dir, &id, resource_type)?;
        staged.fill_from(path)?;
        self.commit_update(&id, resource_type, staged)
    }

    /// Download the listed version of an installed resource and swap it in.
    pub fn update_from_repository(
        &self,
        id: &str,
        progress: TransferProgress<'_>,
    ) -> ResourceResult<Arc<LocalResource>> {
        let entry = self.repository_entry(id)?;
        let existing = self.check_installed(&self.catalog.local_read(), &entry.id)?;
        if existing.resource_type != entry.resource_type {
            return Err(ResourceError::validation(
                existing.path(),
                existing.resource_type,
                format!("repository lists '{}' as a {}", entry.id, entry.resource_type),
            ));
        }

        let staged = self.download_to_staging(&entry, progress)?;
        self.commit_update(&entry.id, entry.resource_type, staged)
    }

    /// Delete an installed resource's file and drop it from the catalog.
    ///
    /// Fails immediately with `InUse` while data handles reference it.
    pub fn uninstall_resource(&self, id: &str) -> ResourceResult<()> {
        let id = naming::normalize_id(id);
        let _serial = self.mutation.lock();
        let mut local = self.catalog.local_write();
        let existing = self.check_installed(&local, &id)?;

        match fs::remove_file(existing.path()) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(id = %id, path = %existing.path().display(), "Managed file already gone");
            }
            Err(e) => return Err(ResourceError::io(existing.path(), e)),
        }
        local.remove(&id);
        drop(local);

        info!(id = %id, "Resource uninstalled");
        Ok(())
    }

    fn commit_install(
        &self,
        id: &str,
        resource_type: ResourceType,
        staged: StagedFile,
    ) -> ResourceResult<Arc<LocalResource>> {
        let metadata = self.inspector.inspect(staged.path(), resource_type)?;
        let dest = managed_path(&self.config.managed_dir, id, resource_type);
        let resource = Arc::new(LocalResource::new(id, LocalKind::Installed, &dest, metadata));

        let _serial = self.mutation.lock();
        let mut local = self.catalog.local_write();
        if local.contains_key(id) {
            return Err(ResourceError::AlreadyExists { id: id.to_string() });
        }
        staged.commit(&dest)?;
        local.insert(id.to_string(), Arc::clone(&resource));
        drop(local);

        info!(
            id = %id,
            resource_type = %resource_type,
            size = resource.size(),
            timestamp = resource.timestamp(),
            "Resource installed"
        );
        Ok(resource)
    }

    fn commit_update(
        &self,
        id: &str,
        resource_type: ResourceType,
        staged: StagedFile,
    ) -> ResourceResult<Arc<LocalResource>> {
        let metadata = self.inspector.inspect(staged.path(), resource_type)?;

        let _serial = self.mutation.lock();
        let mut local = self.catalog.local_write();
        let existing = self.check_installed(&local, id)?;
        let dest = existing.path().to_path_buf();
        let resource = Arc::new(LocalResource::new(id, LocalKind::Installed, &dest, metadata));

        staged.commit(&dest)?;
        local.insert(id.to_string(), Arc::clone(&resource));
        drop(local);

        info!(
            id = %id,
            previous = existing.timestamp(),
            timestamp = resource.timestamp(),
            "Resource updated"
        );
        Ok(resource)
    }

    fn download_to_staging(
        &self,
        entry: &ResourceInRepository,
        progress: TransferProgress<'_>,
    ) -> ResourceResult<StagedFile> {
        let staged = StagedFile::new(&self.config.managed_dir, &entry.id, entry.resource_type)?;
        self.repository.download(entry, staged.path(), progress)?;
        Ok(staged)
    }

    fn repository_entry(&self, id: &str) -> ResourceResult<Arc<ResourceInRepository>> {
        let id = naming::normalize_id(id);
        self.catalog.get_resource_in_repository(&id).ok_or_else(|| {
            if self.catalog.is_repository_available() {
                ResourceError::not_found(id)
            } else {
                ResourceError::RepositoryUnavailable
            }
        })
    }

    fn ensure_absent(&self, id: &str) -> ResourceResult<()> {
        if self.catalog.is_local_resource(id) {
            return Err(ResourceError::AlreadyExists { id: id.to_string() });
        }
        Ok(())
    }

    /// The installed entry for `id`, provided nothing holds it open.
    fn check_installed(&self, local: &LocalIndex, id: &str) -> ResourceResult<Arc<LocalResource>> {
        match local.get(id) {
            Some(res) if !res.is_installed() => Err(ResourceError::NotManaged { id: id.to_string() }),
            Some(res) if res.is_locked() => Err(ResourceError::InUse {
                id: id.to_string(),
                lock_count: res.lock_count(),
            }),
            Some(res) => Ok(Arc::clone(res)),
            None if self.catalog.is_builtin_resource(id) => {
                Err(ResourceError::NotManaged { id: id.to_string() })
            }
            None => Err(ResourceError::not_found(id)),
        }
    }
}

fn resolve_id(
    id: Option<&str>,
    path: &Path,
    resource_type: ResourceType,
) -> ResourceResult<String> {
    match id {
        Some(id) => normalize_id(id, path, Some(resource_type)),
        None => naming::id_from_path(path, resource_type).ok_or_else(|| {
            ResourceError::validation(
                path,
                resource_type,
                format!(
                    "cannot derive a resource id: file name must end in '{}'",
                    resource_type.extension()
                ),
            )
        }),
    }
}

/// Normalize an explicit id and reject ones that cannot be file names.
fn normalize_id(
    id: &str,
    path: &Path,
    resource_type: Option<ResourceType>,
) -> ResourceResult<String> {
    let id = naming::normalize_id(id);
    if id.is_empty() || id.starts_with('.') || id.contains(['/', '\\']) {
        return Err(ResourceError::ValidationFailed {
            path: path.to_path_buf(),
            resource_type,
            reason: format!("'{}' is not a valid resource id", id),
        });
    }
    Ok(id)
}

fn ensure_source_file(path: &Path, resource_type: ResourceType) -> ResourceResult<()> {
    if !path.is_file() {
        return Err(ResourceError::validation(
            path,
            resource_type,
            "source is not a regular file",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{encode_header, FileInspector};
    use crate::manager::{ManagerConfig, STAGING_DIR};
    use crate::repository::Transport;
    use crate::resource::{ObfMetadata, ResourceOrigin};
    use std::path::PathBuf;
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
            _progress: TransferProgress<'_>,
        ) -> ResourceResult<u64> {
            Err(ResourceError::transfer(url, "offline"))
        }
    }

    struct Fixture {
        temp: TempDir,
        manager: Arc<ResourcesManager>,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let config = ManagerConfig::new(temp.path().join("managed"))
                .with_unmanaged_dir(temp.path().join("sd"));
            let manager = Arc::new(ResourcesManager::new(
                config,
                Arc::new(NoNetwork),
                Arc::new(FileInspector::new()),
            ));
            manager.initialize().unwrap();
            Self { temp, manager }
        }

        fn region_file(&self, name: &str, timestamp: u64) -> PathBuf {
            let dir = self.temp.path().join("incoming");
            fs::create_dir_all(&dir).unwrap();
            let path = dir.join(name);
            fs::write(
                &path,
                encode_header(&ObfMetadata {
                    version: 2,
                    timestamp,
                }),
            )
            .unwrap();
            path
        }

        fn staging_is_empty(&self) -> bool {
            let dir = self.temp.path().join("managed").join(STAGING_DIR);
            fs::read_dir(dir).map(|mut d| d.next().is_none()).unwrap_or(true)
        }
    }

    #[test]
    fn test_install_from_file_derives_id() {
        let fx = Fixture::new();
        let source = fx.region_file("Andorra_Europe.map.obf", 7);

        let installed = fx
            .manager
            .install_from_file(None, &source, ResourceType::MapRegion)
            .unwrap();

        assert_eq!(installed.id, "andorra_europe");
        assert_eq!(installed.origin(), ResourceOrigin::Installed);
        assert_eq!(installed.timestamp(), 7);
        assert!(installed.path().ends_with("regions/andorra_europe.map.obf"));
        assert!(installed.path().exists());
        assert!(source.exists(), "source is copied, not moved");
        assert!(fx.staging_is_empty());
    }

    #[test]
    fn test_install_with_explicit_id() {
        let fx = Fixture::new();
        let source = fx.region_file("download.map.obf", 1);
        let installed = fx
            .manager
            .install_from_file(Some("Monaco"), &source, ResourceType::MapRegion)
            .unwrap();
        assert_eq!(installed.id, "monaco");
        assert!(fx.manager.is_resource_installed("monaco"));
        assert!(fx.manager.is_resource_installed("Monaco"));
        assert!(fx.manager.is_local_resource(" MONACO "));
        assert_eq!(fx.manager.get_local_resource("Monaco").unwrap().id, "monaco");
    }

    #[test]
    fn test_install_twice_fails() {
        let fx = Fixture::new();
        let source = fx.region_file("andorra.map.obf", 1);
        fx.manager
            .install_from_file(None, &source, ResourceType::MapRegion)
            .unwrap();

        let err = fx
            .manager
            .install_from_file(None, &source, ResourceType::MapRegion)
            .unwrap_err();
        assert!(matches!(err, ResourceError::AlreadyExists { .. }));
    }

    #[test]
    fn test_install_invalid_file_leaves_nothing() {
        let fx = Fixture::new();
        let source = fx.temp.path().join("broken.map.obf");
        fs::write(&source, b"\xff\xff\xff").unwrap();

        let err = fx
            .manager
            .install_from_file(None, &source, ResourceType::MapRegion)
            .unwrap_err();
        assert!(matches!(err, ResourceError::ValidationFailed { .. }));
        assert!(!fx.manager.is_local_resource("broken"));
        assert!(!fx
            .temp
            .path()
            .join("managed/regions/broken.map.obf")
            .exists());
        assert!(fx.staging_is_empty());
    }

    #[test]
    fn test_install_rejects_bad_ids() {
        let fx = Fixture::new();
        let source = fx.region_file("andorra.map.obf", 1);
        for bad in ["", "../escape", ".hidden"] {
            let err = fx
                .manager
                .install_from_file(Some(bad), &source, ResourceType::MapRegion)
                .unwrap_err();
            assert!(matches!(err, ResourceError::ValidationFailed { .. }), "{bad}");
        }
    }

    #[test]
    fn test_bad_id_reports_requested_type() {
        let fx = Fixture::new();
        let source = fx.temp.path().join("en.voice");
        fs::write(&source, b"voice").unwrap();

        let err = fx
            .manager
            .install_from_file(Some("../en"), &source, ResourceType::VoicePack)
            .unwrap_err();
        assert!(matches!(
            err,
            ResourceError::ValidationFailed {
                resource_type: Some(ResourceType::VoicePack),
                ..
            }
        ));
    }

    #[test]
    fn test_update_with_underivable_name_has_no_type() {
        let fx = Fixture::new();
        let source = fx.temp.path().join("readme.txt");
        fs::write(&source, b"not a resource").unwrap();

        let err = fx.manager.update_from_file(None, &source).unwrap_err();
        assert!(matches!(
            err,
            ResourceError::ValidationFailed {
                resource_type: None,
                ..
            }
        ));
        assert!(!err.to_string().contains("map region"));
    }

    #[test]
    fn test_update_from_file_replaces() {
        let fx = Fixture::new();
        let v1 = fx.region_file("andorra.map.obf", 1);
        fx.manager
            .install_from_file(None, &v1, ResourceType::MapRegion)
            .unwrap();

        let v2 = fx.region_file("andorra_v2.map.obf", 2);
        let updated = fx.manager.update_from_file(Some("andorra"), &v2).unwrap();
        assert_eq!(updated.timestamp(), 2);
        assert_eq!(fx.manager.get_local_resource("andorra").unwrap().timestamp(), 2);
        assert!(updated.path().ends_with("regions/andorra.map.obf"));
    }

    #[test]
    fn test_failed_update_keeps_previous() {
        let fx = Fixture::new();
        let v1 = fx.region_file("andorra.map.obf", 1);
        fx.manager
            .install_from_file(None, &v1, ResourceType::MapRegion)
            .unwrap();

        let bad = fx.temp.path().join("andorra.map.obf.bad");
        fs::write(&bad, b"not a map").unwrap();
        assert!(fx.manager.update_from_file(Some("andorra"), &bad).is_err());

        let current = fx.manager.get_local_resource("andorra").unwrap();
        assert_eq!(current.timestamp(), 1);
        assert!(current.path().exists());
    }

    #[test]
    fn test_update_requires_installed() {
        let fx = Fixture::new();
        let source = fx.region_file("andorra.map.obf", 1);
        let err = fx.manager.update_from_file(None, &source).unwrap_err();
        assert!(matches!(err, ResourceError::NotFound { .. }));
    }

    #[test]
    fn test_mutating_unmanaged_or_builtin_fails() {
        let fx = Fixture::new();
        let sd = fx.temp.path().join("sd");
        fs::create_dir_all(&sd).unwrap();
        fs::copy(fx.region_file("monaco.map.obf", 1), sd.join("monaco.map.obf")).unwrap();
        fx.manager.reconcile();
        assert!(fx.manager.is_local_resource("monaco"));

        assert!(matches!(
            fx.manager.uninstall_resource("monaco"),
            Err(ResourceError::NotManaged { .. })
        ));
        assert!(matches!(
            fx.manager.uninstall_resource(crate::catalog::DEFAULT_MAP_STYLE_ID),
            Err(ResourceError::NotManaged { .. })
        ));
        assert!(matches!(
            fx.manager.uninstall_resource("nowhere"),
            Err(ResourceError::NotFound { .. })
        ));
    }

    #[test]
    fn test_uninstall_removes_file_and_entry() {
        let fx = Fixture::new();
        let source = fx.region_file("andorra.map.obf", 1);
        let installed = fx
            .manager
            .install_from_file(None, &source, ResourceType::MapRegion)
            .unwrap();
        let path = installed.path().to_path_buf();

        fx.manager.uninstall_resource("andorra").unwrap();
        assert!(fx.manager.get_local_resource("andorra").is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_locked_resource_cannot_change() {
        let fx = Fixture::new();
        let source = fx.region_file("andorra.map.obf", 1);
        let installed = fx
            .manager
            .install_from_file(None, &source, ResourceType::MapRegion)
            .unwrap();

        installed.lock();
        let err = fx.manager.uninstall_resource("andorra").unwrap_err();
        assert!(err.is_in_use());
        let v2 = fx.region_file("andorra_v2.map.obf", 2);
        assert!(fx
            .manager
            .update_from_file(Some("andorra"), &v2)
            .unwrap_err()
            .is_in_use());

        installed.unlock();
        fx.manager.uninstall_resource("andorra").unwrap();
    }

    #[test]
    fn test_repository_ops_need_listing() {
        let fx = Fixture::new();
        let err = fx
            .manager
            .install_from_repository("andorra", &|_, _| {})
            .unwrap_err();
        assert!(matches!(err, ResourceError::RepositoryUnavailable));
    }

    #[test]
    fn test_install_map_style_shadows_builtin() {
        let fx = Fixture::new();
        let source = fx.temp.path().join("default.render.xml");
        fs::write(
            &source,
            r#"<renderingStyle name="default" title="Custom"></renderingStyle>"#,
        )
        .unwrap();

        fx.manager
            .install_from_file(None, &source, ResourceType::MapStyle)
            .unwrap();
        assert!(matches!(
            fx.manager.get_resource("default"),
            Some(crate::resource::Resource::Local(_))
        ));
    }
}
