//! Per-type metadata extracted from resource files.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use super::types::ResourceType;

/// Header values of a binary map-data container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObfMetadata {
    /// Container format version.
    pub version: u32,
    /// Creation timestamp in milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// Descriptor of a map rendering style document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapStyleMetadata {
    /// Style name used by "obtain baked style by name".
    pub name: String,
    /// Optional human-readable title.
    pub title: Option<String>,
    /// Name of the parent style this one extends.
    pub depends: Option<String>,
}

/// A single online tile source definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSource {
    /// Unique source name.
    pub name: String,
    /// URL template with `{0}` zoom, `{1}` x and `{2}` y placeholders.
    pub url_template: String,
    /// Minimum zoom level served.
    pub min_zoom: u8,
    /// Maximum zoom level served.
    pub max_zoom: u8,
    /// Tile edge length in pixels.
    pub tile_size: u32,
    /// Image file extension including the dot (e.g. ".png").
    pub ext: String,
}

/// Tile sources declared by one tile-sources document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OnlineTileSourcesMetadata {
    /// Sources in document order.
    pub sources: Vec<TileSource>,
}

impl OnlineTileSourcesMetadata {
    /// Look up a source by name.
    pub fn source(&self, name: &str) -> Option<&TileSource> {
        self.sources.iter().find(|s| s.name == name)
    }
}

/// Type-specific payload of a resource's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourcePayload {
    MapRegion(ObfMetadata),
    VoicePack,
    MapStyle(MapStyleMetadata),
    OnlineTileSources(OnlineTileSourcesMetadata),
}

impl ResourcePayload {
    /// The resource type this payload belongs to.
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Self::MapRegion(_) => ResourceType::MapRegion,
            Self::VoicePack => ResourceType::VoicePack,
            Self::MapStyle(_) => ResourceType::MapStyle,
            Self::OnlineTileSources(_) => ResourceType::OnlineTileSources,
        }
    }
}

/// Metadata obtained by inspecting a resource file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMetadata {
    /// File size in bytes.
    pub size: u64,
    /// Version timestamp in milliseconds, used for outdated comparison.
    pub timestamp: u64,
    /// Type-specific details.
    pub payload: ResourcePayload,
}

impl ResourceMetadata {
    pub fn resource_type(&self) -> ResourceType {
        self.payload.resource_type()
    }

    /// Map-data header, if this is a map region.
    pub fn obf(&self) -> Option<&ObfMetadata> {
        match &self.payload {
            ResourcePayload::MapRegion(obf) => Some(obf),
            _ => None,
        }
    }

    /// Style descriptor, if this is a map style.
    pub fn map_style(&self) -> Option<&MapStyleMetadata> {
        match &self.payload {
            ResourcePayload::MapStyle(style) => Some(style),
            _ => None,
        }
    }

    /// Tile-source definitions, if this is a tile-sources document.
    pub fn tile_sources(&self) -> Option<&OnlineTileSourcesMetadata> {
        match &self.payload {
            ResourcePayload::OnlineTileSources(sources) => Some(sources),
            _ => None,
        }
    }
}

/// Opened representation of a map-data container.
///
/// Handed to consumers through the data-file projection view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObfFile {
    /// Resource id the container belongs to.
    pub id: String,
    /// Path of the container on disk.
    pub path: PathBuf,
    /// File size in bytes.
    pub size: u64,
    /// Parsed header.
    pub metadata: ObfMetadata,
}

impl ObfFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the container for reading.
    pub fn open(&self) -> io::Result<File> {
        File::open(&self.path)
    }
}
