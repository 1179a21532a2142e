//! Resource type and origin enumerations.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of map-data artifact tracked by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// Binary map-data container for a geographic region.
    MapRegion,
    /// Voice guidance pack.
    VoicePack,
    /// Map rendering style document.
    MapStyle,
    /// Online tile-source definitions document.
    OnlineTileSources,
}

impl ResourceType {
    /// All resource types, in managed-layout order.
    pub const ALL: [ResourceType; 4] = [
        Self::MapRegion,
        Self::VoicePack,
        Self::MapStyle,
        Self::OnlineTileSources,
    ];

    /// File extension used for this type, including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::MapRegion => ".map.obf",
            Self::VoicePack => ".voice",
            Self::MapStyle => ".render.xml",
            Self::OnlineTileSources => ".tilesources.xml",
        }
    }

    /// Subdirectory of the managed storage root holding this type.
    pub fn subdirectory(&self) -> &'static str {
        match self {
            Self::MapRegion => "regions",
            Self::VoicePack => "voice",
            Self::MapStyle => "styles",
            Self::OnlineTileSources => "tile_sources",
        }
    }

    /// Code used for this type in repository listings, if it is listed there.
    pub fn repository_code(&self) -> Option<&'static str> {
        match self {
            Self::MapRegion => Some("map"),
            Self::VoicePack => Some("voice"),
            Self::MapStyle | Self::OnlineTileSources => None,
        }
    }

    /// Parse a repository listing type code.
    ///
    /// Returns `None` for codes this catalog does not track.
    pub fn from_repository_code(code: &str) -> Option<Self> {
        match code {
            "map" => Some(Self::MapRegion),
            "voice" => Some(Self::VoicePack),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MapRegion => "map region",
            Self::VoicePack => "voice pack",
            Self::MapStyle => "map style",
            Self::OnlineTileSources => "online tile sources",
        };
        f.write_str(name)
    }
}

impl FromStr for ResourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "map_region" | "region" | "map" => Ok(Self::MapRegion),
            "voice_pack" | "voice" => Ok(Self::VoicePack),
            "map_style" | "style" => Ok(Self::MapStyle),
            "online_tile_sources" | "tile_sources" => Ok(Self::OnlineTileSources),
            other => Err(format!("unknown resource type: {}", other)),
        }
    }
}

/// Where a resource comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceOrigin {
    /// Compiled into the binary.
    Builtin,
    /// Installed under managed storage.
    Installed,
    /// Found in an unmanaged storage directory.
    Unmanaged,
    /// Listed in the remote repository only.
    InRepository,
}

impl fmt::Display for ResourceOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Builtin => "builtin",
            Self::Installed => "installed",
            Self::Unmanaged => "unmanaged",
            Self::InRepository => "repository",
        };
        f.write_str(name)
    }
}
