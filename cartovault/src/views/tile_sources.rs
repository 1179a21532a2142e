//! Online tile sources declared by builtin and installed documents.

use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::ResourceCatalog;
use crate::resource::{OnlineTileSourcesMetadata, ResourceType, TileSource};

/// Keyed view over every tile source.
///
/// Documents are layered: builtin first, then installed. An installed
/// document shadows a builtin one with the same id, and a source defined
/// in an installed document shadows a builtin source with the same name.
#[derive(Clone)]
pub struct OnlineTileSources {
    catalog: Arc<ResourceCatalog>,
}

impl OnlineTileSources {
    pub fn new(catalog: Arc<ResourceCatalog>) -> Self {
        Self { catalog }
    }

    /// All sources by name.
    pub fn get_collection(&self) -> HashMap<String, TileSource> {
        let mut collection = HashMap::new();
        for (_, document) in self.layered_documents() {
            for source in document.sources {
                collection.insert(source.name.clone(), source);
            }
        }
        collection
    }

    /// Look up one source by name.
    pub fn get_source_by_name(&self, name: &str) -> Option<TileSource> {
        self.layered_documents()
            .into_iter()
            .rev()
            .find_map(|(_, document)| document.source(name).cloned())
    }

    /// Tile-source documents by id, lowest precedence first.
    fn layered_documents(&self) -> Vec<(String, OnlineTileSourcesMetadata)> {
        let mut builtin: Vec<_> = self
            .catalog
            .get_builtin_resources()
            .into_values()
            .filter_map(|r| {
                r.metadata()
                    .tile_sources()
                    .map(|m| (r.id.clone(), m.clone()))
            })
            .collect();
        let mut installed: Vec<_> = self
            .catalog
            .get_local_resources()
            .into_values()
            .filter(|r| r.is_installed() && r.resource_type == ResourceType::OnlineTileSources)
            .filter_map(|r| {
                r.metadata()
                    .tile_sources()
                    .map(|m| (r.id.clone(), m.clone()))
            })
            .collect();

        builtin.retain(|(id, _)| !installed.iter().any(|(other, _)| other == id));
        builtin.sort_by(|a, b| a.0.cmp(&b.0));
        installed.sort_by(|a, b| a.0.cmp(&b.0));
        builtin.extend(installed);
        builtin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DEFAULT_TILE_SOURCES_ID;
    use crate::resource::{LocalKind, LocalResource, ResourceMetadata, ResourcePayload, TileSource};

    fn source(name: &str, url: &str) -> TileSource {
        TileSource {
            name: name.to_string(),
            url_template: url.to_string(),
            min_zoom: 1,
            max_zoom: 17,
            tile_size: 256,
            ext: ".png".to_string(),
        }
    }

    fn tile_doc(id: &str, kind: LocalKind, sources: Vec<TileSource>) -> Arc<LocalResource> {
        Arc::new(LocalResource::new(
            id,
            kind,
            format!("/storage/{}.tilesources.xml", id),
            ResourceMetadata {
                size: 10,
                timestamp: 1,
                payload: ResourcePayload::OnlineTileSources(OnlineTileSourcesMetadata { sources }),
            },
        ))
    }

    fn view(local: &[Arc<LocalResource>]) -> OnlineTileSources {
        let catalog = Arc::new(ResourceCatalog::new());
        {
            let mut index = catalog.local_write();
            for r in local {
                index.insert(r.id.clone(), Arc::clone(r));
            }
        }
        OnlineTileSources::new(catalog)
    }

    #[test]
    fn test_builtin_sources_available() {
        let view = view(&[]);
        let collection = view.get_collection();
        assert!(collection.contains_key("Mapnik"));
        assert!(view.get_source_by_name("Mapnik").is_some());
        assert!(view.get_source_by_name("missing").is_none());
    }

    #[test]
    fn test_installed_shadows_builtin_by_id() {
        let replacement = tile_doc(
            DEFAULT_TILE_SOURCES_ID,
            LocalKind::Installed,
            vec![source("Satellite", "https://sat/{0}/{1}/{2}")],
        );
        let view = view(&[replacement]);

        let collection = view.get_collection();
        assert_eq!(collection.len(), 1);
        assert!(view.get_source_by_name("Mapnik").is_none());
        assert!(view.get_source_by_name("Satellite").is_some());
    }

    #[test]
    fn test_installed_source_shadows_builtin_source_name() {
        let extra = tile_doc(
            "custom",
            LocalKind::Installed,
            vec![source("Mapnik", "https://my-mapnik/{0}/{1}/{2}")],
        );
        let view = view(&[extra]);
        assert_eq!(
            view.get_source_by_name("Mapnik").unwrap().url_template,
            "https://my-mapnik/{0}/{1}/{2}"
        );
        assert_eq!(
            view.get_collection()["Mapnik"].url_template,
            "https://my-mapnik/{0}/{1}/{2}"
        );
        assert!(view.get_source_by_name("OpenTopoMap").is_some());
    }

    #[test]
    fn test_unmanaged_documents_ignored() {
        let unmanaged = tile_doc(
            "sd_sources",
            LocalKind::Unmanaged,
            vec![source("Private", "https://private/{0}/{1}/{2}")],
        );
        let view = view(&[unmanaged]);
        assert!(view.get_source_by_name("Private").is_none());
    }
}
