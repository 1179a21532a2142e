//! Resources compiled into the binary.

use std::collections::HashMap;
use std::sync::Arc;

use crate::container::{parse_map_style, parse_tile_sources};
use crate::resource::{BuiltinResource, ResourceMetadata, ResourcePayload};

/// Id of the embedded default map style.
pub const DEFAULT_MAP_STYLE_ID: &str = "default";

/// Id of the embedded default online tile-sources document.
pub const DEFAULT_TILE_SOURCES_ID: &str = "default_tile_sources";

const DEFAULT_MAP_STYLE: &str = include_str!("../../resources/default.render.xml");
const DEFAULT_TILE_SOURCES: &str = include_str!("../../resources/default.tilesources.xml");

/// Build the builtin index from the embedded documents.
///
/// A document that fails to parse is logged and left out; the catalog still
/// works without it.
pub fn inflate_builtin_resources() -> HashMap<String, Arc<BuiltinResource>> {
    let mut builtins = HashMap::new();

    match parse_map_style(DEFAULT_MAP_STYLE, DEFAULT_MAP_STYLE_ID) {
        Ok(style) => {
            let metadata = ResourceMetadata {
                size: DEFAULT_MAP_STYLE.len() as u64,
                timestamp: 0,
                payload: ResourcePayload::MapStyle(style),
            };
            builtins.insert(
                DEFAULT_MAP_STYLE_ID.to_string(),
                Arc::new(BuiltinResource::new(
                    DEFAULT_MAP_STYLE_ID,
                    metadata,
                    DEFAULT_MAP_STYLE,
                )),
            );
        }
        Err(e) => tracing::error!(error = %e, "Embedded map style is invalid"),
    }

    match parse_tile_sources(DEFAULT_TILE_SOURCES) {
        Ok(sources) => {
            let metadata = ResourceMetadata {
                size: DEFAULT_TILE_SOURCES.len() as u64,
                timestamp: 0,
                payload: ResourcePayload::OnlineTileSources(sources),
            };
            builtins.insert(
                DEFAULT_TILE_SOURCES_ID.to_string(),
                Arc::new(BuiltinResource::new(
                    DEFAULT_TILE_SOURCES_ID,
                    metadata,
                    DEFAULT_TILE_SOURCES,
                )),
            );
        }
        Err(e) => tracing::error!(error = %e, "Embedded tile sources are invalid"),
    }

    builtins
}
