//! Naming conventions for resource files.
//!
//! Ids are derived from file names by lowercasing and stripping the
//! type-specific extension:
//!
//! ```text
//! Andorra_Europe.map.obf      → ("andorra_europe", MapRegion)
//! en.voice                    → ("en", VoicePack)
//! Andorra_europe.map.obf.zip  → "andorra_europe"   (repository listing name)
//! ```

use std::path::{Path, PathBuf};

use super::types::ResourceType;

/// Suffix carried by repository listing names for archived downloads.
const ARCHIVE_SUFFIX: &str = ".zip";

/// Canonical form of a caller-supplied id: trimmed and lowercased.
///
/// Every id stored in the catalog is in this form, so lookups must apply it
/// before comparing.
pub fn normalize_id(id: &str) -> String {
    id.trim().to_lowercase()
}

/// Split a file name into a resource id and type.
///
/// Returns `None` if the name has no recognized extension or the id would be empty.
pub fn split_file_name(file_name: &str) -> Option<(String, ResourceType)> {
    let lower = file_name.to_lowercase();
    ResourceType::ALL.iter().find_map(|ty| {
        lower
            .strip_suffix(ty.extension())
            .filter(|id| !id.is_empty())
            .map(|id| (id.to_string(), *ty))
    })
}

/// Derive the resource id for a file expected to be of the given type.
pub fn id_from_path(path: &Path, resource_type: ResourceType) -> Option<String> {
    let name = path.file_name()?.to_str()?.to_lowercase();
    name.strip_suffix(resource_type.extension())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Derive the resource id from a repository listing name.
pub fn id_from_repository_name(name: &str, resource_type: ResourceType) -> Option<String> {
    let lower = name.to_lowercase();
    let base = lower.strip_suffix(ARCHIVE_SUFFIX).unwrap_or(&lower);
    base.strip_suffix(resource_type.extension())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// File name of a resource inside managed storage.
pub fn managed_file_name(id: &str, resource_type: ResourceType) -> String {
    format!("{}{}", id.to_lowercase(), resource_type.extension())
}

/// Full path of a resource inside managed storage.
pub fn managed_path(root: &Path, id: &str, resource_type: ResourceType) -> PathBuf {
    root.join(resource_type.subdirectory())
        .join(managed_file_name(id, resource_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_id() {
        assert_eq!(normalize_id("Monaco"), "monaco");
        assert_eq!(normalize_id("  Andorra_Europe \n"), "andorra_europe");
        assert_eq!(normalize_id("en"), "en");
    }

    #[test]
    fn test_split_file_name() {
        assert_eq!(
            split_file_name("Andorra_Europe.map.obf"),
            Some(("andorra_europe".to_string(), ResourceType::MapRegion))
        );
        assert_eq!(
            split_file_name("default.render.xml"),
            Some(("default".to_string(), ResourceType::MapStyle))
        );
        assert_eq!(
            split_file_name("osm.tilesources.xml"),
            Some(("osm".to_string(), ResourceType::OnlineTileSources))
        );
        assert_eq!(split_file_name("readme.txt"), None);
        assert_eq!(split_file_name(".map.obf"), None);
    }

    #[test]
    fn test_id_from_path_requires_matching_type() {
        let path = Path::new("/tmp/Andorra.map.obf");
        assert_eq!(
            id_from_path(path, ResourceType::MapRegion),
            Some("andorra".to_string())
        );
        assert_eq!(id_from_path(path, ResourceType::VoicePack), None);
    }

    #[test]
    fn test_id_from_repository_name() {
        assert_eq!(
            id_from_repository_name("Andorra_europe.map.obf.zip", ResourceType::MapRegion),
            Some("andorra_europe".to_string())
        );
        assert_eq!(
            id_from_repository_name("en.voice", ResourceType::VoicePack),
            Some("en".to_string())
        );
        assert_eq!(
            id_from_repository_name("en.voice.zip", ResourceType::MapRegion),
            None
        );
    }

    #[test]
    fn test_managed_path() {
        let path = managed_path(Path::new("/data"), "Andorra", ResourceType::MapRegion);
        assert_eq!(path, PathBuf::from("/data/regions/andorra.map.obf"));
    }
}
