//! Local storage scanning and reconciliation.
//!
//! A scan walks the storage roots and produces a candidate index of
//! `id → LocalResource`. Reconciliation then brings the live local index in
//! line with the candidates under the catalog's write lock.
//!
//! # Storage layout
//!
//! ```text
//! managed_root/                    unmanaged_root/ (any depth)
//! ├── regions/<id>.map.obf         ├── Europe/andorra.map.obf
//! ├── voice/<id>.voice             ├── styles/touring.render.xml
//! ├── styles/<id>.render.xml       └── ...
//! └── tile_sources/<id>.tilesources.xml
//! ```
//!
//! Files that fail inspection are excluded and reported as diagnostics; the
//! scan itself never fails.

mod reconcile;
mod watch;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;

use crate::catalog::LocalIndex;
use crate::container::ContainerInspector;
use crate::resource::{naming, LocalKind, LocalResource, ResourceType};

pub use reconcile::{reconcile, ReconcileReport, ReconcileScope};
pub use watch::{ChangeCallback, DirectoryWatcher, DEFAULT_DEBOUNCE};

/// Maximum directory depth followed inside unmanaged roots.
const MAX_UNMANAGED_DEPTH: usize = 8;

/// A file excluded from a scan, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanDiagnostic {
    pub path: PathBuf,
    pub reason: String,
}

/// Result of scanning one or more storage roots.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Valid resources found, keyed by id.
    pub candidates: LocalIndex,
    /// Files that were skipped.
    pub diagnostics: Vec<ScanDiagnostic>,
}

impl ScanOutcome {
    /// Merge another outcome; entries already present win on id collision.
    fn absorb(&mut self, other: ScanOutcome) {
        for (id, res) in other.candidates {
            if let Some(existing) = self.candidates.get(&id) {
                self.diagnostics.push(ScanDiagnostic {
                    path: res.path().to_path_buf(),
                    reason: format!(
                        "id '{}' already provided by {}",
                        id,
                        existing.path().display()
                    ),
                });
                continue;
            }
            self.candidates.insert(id, res);
        }
        self.diagnostics.extend(other.diagnostics);
    }
}

/// A file found on disk that still has to be inspected.
struct Candidate {
    path: PathBuf,
    id: String,
    resource_type: ResourceType,
}

/// Scans storage roots into candidate indices.
#[derive(Clone)]
pub struct LocalScanner {
    inspector: Arc<dyn ContainerInspector>,
}

impl LocalScanner {
    pub fn new(inspector: Arc<dyn ContainerInspector>) -> Self {
        Self { inspector }
    }

    /// Scan managed storage and every unmanaged root.
    ///
    /// Installed resources take precedence over unmanaged ones with the same id.
    pub fn scan_all(&self, managed_root: &Path, unmanaged_roots: &[PathBuf]) -> ScanOutcome {
        let mut outcome = self.scan_managed(managed_root);
        outcome.absorb(self.scan_unmanaged(unmanaged_roots));
        outcome
    }

    /// Scan the managed storage root using the per-type subdirectory layout.
    pub fn scan_managed(&self, root: &Path) -> ScanOutcome {
        let mut found = Vec::new();

        for resource_type in ResourceType::ALL {
            let dir = root.join(resource_type.subdirectory());
            let entries = match fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                match naming::id_from_path(&path, resource_type) {
                    Some(id) => found.push(Candidate {
                        path,
                        id,
                        resource_type,
                    }),
                    None => {
                        tracing::debug!(path = %path.display(), "Ignoring foreign file in managed storage");
                    }
                }
            }
        }

        self.inspect_all(found, LocalKind::Installed)
    }

    /// Scan unmanaged roots recursively; types come from file extensions.
    pub fn scan_unmanaged(&self, roots: &[PathBuf]) -> ScanOutcome {
        let mut found = Vec::new();
        for root in roots {
            if !root.is_dir() {
                tracing::debug!(root = %root.display(), "Unmanaged storage path does not exist");
                continue;
            }
            collect_unmanaged(root, 0, &mut found);
        }
        self.inspect_all(found, LocalKind::Unmanaged)
    }

    /// Inspect candidates in parallel, then index them in path order.
    fn inspect_all(&self, mut found: Vec<Candidate>, kind: LocalKind) -> ScanOutcome {
        found.sort_by(|a, b| a.path.cmp(&b.path));

        let inspected: Vec<_> = found
            .into_par_iter()
            .map(|c| {
                let result = self.inspector.inspect(&c.path, c.resource_type);
                (c, result)
            })
            .collect();

        let mut outcome = ScanOutcome::default();
        let mut seen: HashMap<String, PathBuf> = HashMap::new();
        for (candidate, result) in inspected {
            match result {
                Ok(metadata) => {
                    if let Some(first) = seen.get(&candidate.id) {
                        outcome.diagnostics.push(ScanDiagnostic {
                            path: candidate.path,
                            reason: format!(
                                "id '{}' already provided by {}",
                                candidate.id,
                                first.display()
                            ),
                        });
                        continue;
                    }
                    tracing::debug!(
                        id = %candidate.id,
                        path = %candidate.path.display(),
                        "Found local resource"
                    );
                    seen.insert(candidate.id.clone(), candidate.path.clone());
                    let resource =
                        LocalResource::new(candidate.id.clone(), kind, candidate.path, metadata);
                    outcome.candidates.insert(candidate.id, Arc::new(resource));
                }
                Err(e) => {
                    tracing::warn!(
                        path = %candidate.path.display(),
                        error = %e,
                        "Skipping unreadable resource file"
                    );
                    outcome.diagnostics.push(ScanDiagnostic {
                        path: candidate.path,
                        reason: e.to_string(),
                    });
                }
            }
        }
        outcome
    }
}

fn collect_unmanaged(dir: &Path, depth: usize, found: &mut Vec<Candidate>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "Cannot read unmanaged directory");
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if depth + 1 < MAX_UNMANAGED_DEPTH {
                collect_unmanaged(&path, depth + 1, found);
            }
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if let Some((id, resource_type)) = naming::split_file_name(name) {
            found.push(Candidate {
                path,
                id,
                resource_type,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{encode_header, FileInspector};
    use crate::resource::ObfMetadata;
    use tempfile::TempDir;

    fn scanner() -> LocalScanner {
        LocalScanner::new(Arc::new(FileInspector::new()))
    }

    fn write_region(path: &Path, timestamp: u64) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            path,
            encode_header(&ObfMetadata {
                version: 2,
                timestamp,
            }),
        )
        .unwrap();
    }

    #[test]
    fn test_scan_managed_layout() {
        let temp = TempDir::new().unwrap();
        write_region(&temp.path().join("regions/andorra.map.obf"), 10);
        fs::create_dir_all(temp.path().join("voice")).unwrap();
        fs::write(temp.path().join("voice/en.voice"), "voice").unwrap();
        // Wrong subdirectory for the extension: ignored.
        fs::write(temp.path().join("voice/stray.map.obf"), "x").unwrap();

        let outcome = scanner().scan_managed(temp.path());
        assert_eq!(outcome.candidates.len(), 2);
        assert!(outcome.candidates["andorra"].is_installed());
        assert_eq!(outcome.candidates["andorra"].timestamp(), 10);
        assert_eq!(
            outcome.candidates["en"].resource_type,
            ResourceType::VoicePack
        );
    }

    #[test]
    fn test_scan_excludes_corrupt_files() {
        let temp = TempDir::new().unwrap();
        write_region(&temp.path().join("regions/good.map.obf"), 1);
        fs::write(temp.path().join("regions/bad.map.obf"), "not a container").unwrap();

        let outcome = scanner().scan_managed(temp.path());
        assert_eq!(outcome.candidates.len(), 1);
        assert!(outcome.candidates.contains_key("good"));
        assert_eq!(outcome.diagnostics.len(), 1);
        assert!(outcome.diagnostics[0].path.ends_with("bad.map.obf"));
    }

    #[test]
    fn test_scan_unmanaged_recursive() {
        let temp = TempDir::new().unwrap();
        write_region(&temp.path().join("europe/west/andorra.map.obf"), 3);
        fs::write(
            temp.path().join("touring.render.xml"),
            "<renderingStyle name=\"touring\"/>",
        )
        .unwrap();
        fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

        let outcome = scanner().scan_unmanaged(&[temp.path().to_path_buf()]);
        assert_eq!(outcome.candidates.len(), 2);
        assert_eq!(
            outcome.candidates["andorra"].kind(),
            LocalKind::Unmanaged
        );
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn test_scan_all_prefers_managed() {
        let managed = TempDir::new().unwrap();
        let unmanaged = TempDir::new().unwrap();
        write_region(&managed.path().join("regions/andorra.map.obf"), 5);
        write_region(&unmanaged.path().join("andorra.map.obf"), 9);

        let outcome = scanner().scan_all(managed.path(), &[unmanaged.path().to_path_buf()]);
        assert_eq!(outcome.candidates.len(), 1);
        assert!(outcome.candidates["andorra"].is_installed());
        assert_eq!(outcome.diagnostics.len(), 1);
    }

    #[test]
    fn test_scan_missing_roots_is_empty() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing");
        let outcome = scanner().scan_all(&missing, &[missing.clone()]);
        assert!(outcome.candidates.is_empty());
        assert!(outcome.diagnostics.is_empty());
    }
}
