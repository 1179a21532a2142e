//! Resources listed in the remote repository.

use serde::{Deserialize, Serialize};

use super::types::ResourceType;

/// Descriptor of a resource available for download from the repository.
///
/// This is remote availability information, not a file on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceInRepository {
    /// Resource id, matching the id a local install would get.
    pub id: String,
    /// Resource type.
    pub resource_type: ResourceType,
    /// File name as listed by the repository.
    pub name: String,
    /// Size of the downloaded file in bytes.
    pub size: u64,
    /// Uncompressed content size advertised by the repository.
    #[serde(default)]
    pub content_size: u64,
    /// Version timestamp in milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// URL the resource is downloaded from.
    pub download_url: String,
}

impl ResourceInRepository {
    /// Whether this entry is strictly newer than an installed timestamp.
    pub fn is_newer_than(&self, installed_timestamp: u64) -> bool {
        self.timestamp > installed_timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_newer_than_is_strict() {
        let entry = ResourceInRepository {
            id: "r1".to_string(),
            resource_type: ResourceType::MapRegion,
            name: "r1.map.obf".to_string(),
            size: 10,
            content_size: 10,
            timestamp: 2,
            download_url: "http://example.com/r1.map.obf".to_string(),
        };
        assert!(entry.is_newer_than(1));
        assert!(!entry.is_newer_than(2));
        assert!(!entry.is_newer_than(3));
    }
}
