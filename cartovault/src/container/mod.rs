//! Resource file inspection.
//!
//! The catalog never parses map data itself. It asks a [`ContainerInspector`]
//! whether a file is a valid resource of the expected type and for the
//! metadata it needs (size, version timestamp, type-specific descriptor).
//!
//! [`FileInspector`] is the default implementation:
//!
//! | Type | Check | Timestamp |
//! |---|---|---|
//! | MapRegion | container header probe ([`obf`]) | header creation date |
//! | VoicePack | non-empty regular file | file modification time |
//! | MapStyle | `<renderingStyle>` root ([`style`]) | file modification time |
//! | OnlineTileSources | `<tile_sources>` document ([`tile_sources`]) | file modification time |

pub mod obf;
pub mod style;
pub mod tile_sources;
pub(crate) mod xml;

use std::fs::{self, File};
use std::io::BufReader;
use std::path::Path;
use std::time::UNIX_EPOCH;

use crate::error::{ResourceError, ResourceResult};
use crate::resource::{naming, ResourceMetadata, ResourcePayload, ResourceType};

pub use obf::{encode_header, read_header};
pub use style::parse_map_style;
pub use tile_sources::parse_tile_sources;

/// Validates resource files and extracts their metadata.
///
/// Implementations must be safe to call from several scan threads at once.
pub trait ContainerInspector: Send + Sync {
    /// Inspect `path`, expecting a resource of `resource_type`.
    ///
    /// Fails with `ValidationFailed` if the file is not a valid resource of
    /// that type, or `ParseFailed` if it cannot be read.
    fn inspect(&self, path: &Path, resource_type: ResourceType)
        -> ResourceResult<ResourceMetadata>;
}

/// Default filesystem-backed inspector.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileInspector;

impl FileInspector {
    pub fn new() -> Self {
        Self
    }
}

impl ContainerInspector for FileInspector {
    fn inspect(
        &self,
        path: &Path,
        resource_type: ResourceType,
    ) -> ResourceResult<ResourceMetadata> {
        let fs_meta = fs::metadata(path)
            .map_err(|e| ResourceError::parse(path.display().to_string(), e.to_string()))?;
        if !fs_meta.is_file() {
            return Err(ResourceError::validation(
                path,
                resource_type,
                "not a regular file",
            ));
        }
        let size = fs_meta.len();
        if size == 0 {
            return Err(ResourceError::validation(path, resource_type, "file is empty"));
        }
        let modified_ms = fs_meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        let (timestamp, payload) = match resource_type {
            ResourceType::MapRegion => {
                let file = File::open(path)
                    .map_err(|e| ResourceError::parse(path.display().to_string(), e.to_string()))?;
                let header = read_header(&mut BufReader::new(file))
                    .map_err(|reason| ResourceError::validation(path, resource_type, reason))?;
                (header.timestamp, ResourcePayload::MapRegion(header))
            }
            ResourceType::VoicePack => (modified_ms, ResourcePayload::VoicePack),
            ResourceType::MapStyle => {
                let text = read_text(path, resource_type)?;
                let fallback = naming::id_from_path(path, resource_type).unwrap_or_default();
                let style = parse_map_style(&text, &fallback)
                    .map_err(|reason| ResourceError::validation(path, resource_type, reason))?;
                (modified_ms, ResourcePayload::MapStyle(style))
            }
            ResourceType::OnlineTileSources => {
                let text = read_text(path, resource_type)?;
                let sources = parse_tile_sources(&text)
                    .map_err(|reason| ResourceError::validation(path, resource_type, reason))?;
                (modified_ms, ResourcePayload::OnlineTileSources(sources))
            }
        };

        Ok(ResourceMetadata {
            size,
            timestamp,
            payload,
        })
    }
}

fn read_text(path: &Path, resource_type: ResourceType) -> ResourceResult<String> {
    let bytes =
        fs::read(path).map_err(|e| ResourceError::parse(path.display().to_string(), e.to_string()))?;
    String::from_utf8(bytes)
        .map_err(|_| ResourceError::validation(path, resource_type, "document is not UTF-8"))
}
