//! Staging area for files on their way into managed storage.
//!
//! New files are written and validated under `<managed>/.staging/<ticket>/`
//! and only renamed into place once they pass inspection. The rename stays
//! on one filesystem, so the managed file is either the old one or the new
//! one, never a partial copy.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{ResourceError, ResourceResult};
use crate::resource::naming::managed_file_name;
use crate::resource::ResourceType;

/// Staging directory name inside the managed root. Scans never look here.
pub const STAGING_DIR: &str = ".staging";

static NEXT_TICKET: AtomicU64 = AtomicU64::new(0);

/// A file being prepared for managed storage.
///
/// Dropping an uncommitted file deletes it together with its ticket directory.
#[derive(Debug)]
pub(crate) struct StagedFile {
    dir: PathBuf,
    path: PathBuf,
    committed: bool,
}

impl StagedFile {
    /// Reserve a staging slot named like the final managed file.
    pub fn new(managed_root: &Path, id: &str, resource_type: ResourceType) -> ResourceResult<Self> {
        let ticket = NEXT_TICKET.fetch_add(1, Ordering::SeqCst);
        let dir = managed_root
            .join(STAGING_DIR)
            .join(format!("{}-{}", std::process::id(), ticket));
        fs::create_dir_all(&dir).map_err(|e| ResourceError::io(&dir, e))?;
        let path = dir.join(managed_file_name(id, resource_type));
        Ok(Self {
            dir,
            path,
            committed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy `source` into the slot, keeping its modification time.
    pub fn fill_from(&self, source: &Path) -> ResourceResult<u64> {
        copy_preserving_mtime(source, &self.path).map_err(|e| ResourceError::io(source, e))
    }

    /// Move the staged file to `dest`, replacing any file already there.
    pub fn commit(mut self, dest: &Path) -> ResourceResult<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| ResourceError::io(parent, e))?;
        }
        fs::rename(&self.path, dest).map_err(|e| ResourceError::io(dest, e))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            fs::remove_file(&self.path).ok();
        }
        fs::remove_dir_all(&self.dir).ok();
    }
}

fn copy_preserving_mtime(source: &Path, dest: &Path) -> io::Result<u64> {
    let copied = fs::copy(source, dest)?;
    let modified = fs::metadata(source)?.modified()?;
    fs::OpenOptions::new()
        .write(true)
        .open(dest)?
        .set_modified(modified)?;
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::FileTime;
    use tempfile::TempDir;

    #[test]
    fn test_drop_removes_uncommitted() {
        let temp = TempDir::new().unwrap();
        let staged = StagedFile::new(temp.path(), "andorra", ResourceType::MapRegion).unwrap();
        fs::write(staged.path(), b"partial").unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.ends_with("andorra.map.obf"));

        drop(staged);
        assert!(!path.exists());
        assert!(!path.parent().unwrap().exists());
    }

    #[test]
    fn test_commit_moves_file() {
        let temp = TempDir::new().unwrap();
        let dest = temp.path().join("regions").join("andorra.map.obf");
        let staged = StagedFile::new(temp.path(), "andorra", ResourceType::MapRegion).unwrap();
        fs::write(staged.path(), b"complete").unwrap();
        let staged_path = staged.path().to_path_buf();

        staged.commit(&dest).unwrap();
        assert_eq!(fs::read(&dest).unwrap(), b"complete");
        assert!(!staged_path.exists());
    }

    #[test]
    fn test_fill_preserves_mtime() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("en.voice");
        fs::write(&source, b"voice").unwrap();
        filetime::set_file_mtime(&source, FileTime::from_unix_time(1_600_000_000, 0)).unwrap();

        let staged = StagedFile::new(temp.path(), "en", ResourceType::VoicePack).unwrap();
        assert_eq!(staged.fill_from(&source).unwrap(), 5);
        let mtime = FileTime::from_last_modification_time(&fs::metadata(staged.path()).unwrap());
        assert_eq!(mtime.unix_seconds(), 1_600_000_000);
    }

    #[test]
    fn test_tickets_are_distinct() {
        let temp = TempDir::new().unwrap();
        let a = StagedFile::new(temp.path(), "r1", ResourceType::MapRegion).unwrap();
        let b = StagedFile::new(temp.path(), "r1", ResourceType::MapRegion).unwrap();
        assert_ne!(a.path(), b.path());
    }
}
