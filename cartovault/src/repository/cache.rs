//! On-disk snapshot of the last successfully fetched repository listing.
//!
//! Lets the catalog answer "what is available / outdated" at startup
//! without a network round trip.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::resource::ResourceInRepository;

/// File name of the listing snapshot inside the cache directory.
pub const CACHE_FILE_NAME: &str = "repository.json";

/// Serialized listing snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingCache {
    /// Crate version that wrote the snapshot.
    pub version: String,
    /// When the listing was fetched (ms since UNIX_EPOCH).
    pub fetched_at_ms: i64,
    /// URL the listing was fetched from.
    pub source_url: String,
    /// Parsed entries.
    pub resources: Vec<ResourceInRepository>,
}

impl ListingCache {
    /// Create a snapshot stamped with the current time.
    pub fn new(source_url: impl Into<String>, resources: Vec<ResourceInRepository>) -> Self {
        Self {
            version: crate::VERSION.to_string(),
            fetched_at_ms: Utc::now().timestamp_millis(),
            source_url: source_url.into(),
            resources,
        }
    }

    /// Load a snapshot from file.
    pub fn load(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        serde_json::from_reader(reader).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Failed to deserialize repository cache: {}", e),
            )
        })
    }

    /// Save the snapshot, replacing any previous one atomically.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("json.tmp");
        let result = (|| {
            let file = File::create(&temp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, self).map_err(|e| {
                io::Error::other(format!("Failed to serialize repository cache: {}", e))
            })?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
            fs::rename(&temp_path, path)
        })();

        if result.is_err() {
            fs::remove_file(&temp_path).ok();
        }
        result
    }

    /// Age of the snapshot in seconds.
    pub fn age_secs(&self) -> i64 {
        ((Utc::now().timestamp_millis() - self.fetched_at_ms) / 1000).max(0)
    }

    /// Human-readable age.
    pub fn age_human(&self) -> String {
        let secs = self.age_secs();

        if secs < 60 {
            format!("{}s ago", secs)
        } else if secs < 3600 {
            format!("{}m ago", secs / 60)
        } else if secs < 86400 {
            format!("{}h ago", secs / 3600)
        } else {
            format!("{}d ago", secs / 86400)
        }
    }
}

/// Snapshot path inside a cache directory.
pub fn cache_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(CACHE_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceType;
    use tempfile::TempDir;

    fn entry(id: &str, timestamp: u64) -> ResourceInRepository {
        ResourceInRepository {
            id: id.to_string(),
            resource_type: ResourceType::MapRegion,
            name: format!("{}.map.obf", id),
            size: 42,
            content_size: 42,
            timestamp,
            download_url: format!("http://repo/{}.map.obf", id),
        }
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let path = cache_path(&temp.path().join("cache"));

        let cache = ListingCache::new("http://repo/list", vec![entry("r1", 2), entry("r2", 5)]);
        cache.save(&path).unwrap();

        let loaded = ListingCache::load(&path).unwrap();
        assert_eq!(loaded.source_url, "http://repo/list");
        assert_eq!(loaded.resources, cache.resources);
        assert_eq!(loaded.version, crate::VERSION);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_load_corrupted() {
        let temp = TempDir::new().unwrap();
        let path = cache_path(temp.path());
        fs::write(&path, b"{ not json").unwrap();

        let err = ListingCache::load(&path).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_load_missing() {
        let temp = TempDir::new().unwrap();
        let err = ListingCache::load(&cache_path(temp.path())).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_age_human() {
        let mut cache = ListingCache::new("u", Vec::new());
        assert!(cache.age_human().ends_with("s ago"));
        cache.fetched_at_ms -= 2 * 3600 * 1000;
        assert_eq!(cache.age_human(), "2h ago");
    }
}
