//! Map styles from builtin and installed documents.
//!
//! A style may extend a parent through its `depends` attribute. Baking a
//! style resolves that chain by name, so the interpreter receives every
//! document it needs:
//!
//! ```text
//! touring ──depends──► default          baked chain: [touring, default]
//! ```

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::catalog::ResourceCatalog;
use crate::error::{ResourceError, ResourceResult};
use crate::resource::{MapStyleMetadata, ResourceOrigin, ResourceType};

#[derive(Debug, Clone)]
enum StyleSource {
    Embedded(&'static str),
    File(PathBuf),
}

/// One map style document.
#[derive(Debug, Clone)]
pub struct MapStyle {
    id: String,
    origin: ResourceOrigin,
    metadata: MapStyleMetadata,
    source: StyleSource,
}

impl MapStyle {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata.title.as_deref()
    }

    /// Name of the parent style, if any.
    pub fn depends(&self) -> Option<&str> {
        self.metadata.depends.as_deref()
    }

    pub fn origin(&self) -> ResourceOrigin {
        self.origin
    }

    /// File backing an installed style; `None` for builtins.
    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            StyleSource::Embedded(_) => None,
            StyleSource::File(path) => Some(path),
        }
    }

    /// Read the style document.
    pub fn load_document(&self) -> ResourceResult<Cow<'static, str>> {
        match &self.source {
            StyleSource::Embedded(doc) => Ok(Cow::Borrowed(*doc)),
            StyleSource::File(path) => fs::read_to_string(path)
                .map(Cow::Owned)
                .map_err(|e| ResourceError::io(path, e)),
        }
    }
}

/// A style together with its resolved parents.
#[derive(Debug, Clone)]
pub struct BakedMapStyle {
    style: Arc<MapStyle>,
    parents: Vec<Arc<MapStyle>>,
}

impl BakedMapStyle {
    pub fn style(&self) -> &Arc<MapStyle> {
        &self.style
    }

    pub fn name(&self) -> &str {
        self.style.name()
    }

    /// Ancestors, nearest first.
    pub fn parents(&self) -> &[Arc<MapStyle>] {
        &self.parents
    }

    /// Style names from the style itself up to the root.
    pub fn chain_names(&self) -> Vec<&str> {
        std::iter::once(&self.style)
            .chain(self.parents.iter())
            .map(|s| s.name())
            .collect()
    }

    /// Documents in application order: root ancestor first, the style last.
    pub fn load_documents(&self) -> ResourceResult<Vec<Cow<'static, str>>> {
        self.parents
            .iter()
            .rev()
            .chain(std::iter::once(&self.style))
            .map(|s| s.load_document())
            .collect()
    }
}

/// Styles available for rendering, recomputed on every call.
#[derive(Clone)]
pub struct MapStylesCollection {
    catalog: Arc<ResourceCatalog>,
}

impl MapStylesCollection {
    pub fn new(catalog: Arc<ResourceCatalog>) -> Self {
        Self { catalog }
    }

    /// Every style, sorted by name. Installed styles shadow builtin ones
    /// with the same name.
    pub fn get_collection(&self) -> Vec<Arc<MapStyle>> {
        let mut styles: Vec<_> = self.styles_by_name().into_values().collect();
        styles.sort_by(|a, b| a.name().cmp(b.name()));
        styles
    }

    /// Look up one style by name, installed before builtin.
    pub fn get_style_by_name(&self, name: &str) -> Option<Arc<MapStyle>> {
        self.styles_by_name().remove(&name.to_lowercase())
    }

    /// Resolve a style and its `depends` chain.
    pub fn obtain_baked_style(&self, name: &str) -> ResourceResult<BakedMapStyle> {
        let styles = self.styles_by_name();
        let lookup = |name: &str| {
            styles
                .get(&name.to_lowercase())
                .cloned()
                .ok_or_else(|| ResourceError::not_found(name))
        };

        let style = lookup(name)?;
        let mut parents = Vec::new();
        let mut visited = HashSet::from([style.name().to_lowercase()]);
        let mut next = style.depends().map(str::to_string);

        while let Some(parent_name) = next {
            if !visited.insert(parent_name.to_lowercase()) {
                return Err(ResourceError::parse(
                    name,
                    format!("style dependency cycle through '{}'", parent_name),
                ));
            }
            let parent = lookup(&parent_name)?;
            next = parent.depends().map(str::to_string);
            parents.push(parent);
        }

        Ok(BakedMapStyle { style, parents })
    }

    /// Builtin styles overlaid with installed ones, keyed by lowercase name.
    fn styles_by_name(&self) -> HashMap<String, Arc<MapStyle>> {
        let mut styles = HashMap::new();

        for builtin in self.catalog.get_builtin_resources().into_values() {
            if let Some(meta) = builtin.metadata().map_style() {
                let style = MapStyle {
                    id: builtin.id.clone(),
                    origin: ResourceOrigin::Builtin,
                    metadata: meta.clone(),
                    source: StyleSource::Embedded(builtin.document()),
                };
                styles.insert(meta.name.to_lowercase(), Arc::new(style));
            }
        }

        let mut installed: Vec<_> = self
            .catalog
            .get_local_resources()
            .into_values()
            .filter(|r| r.is_installed() && r.resource_type == ResourceType::MapStyle)
            .collect();
        installed.sort_by(|a, b| a.id.cmp(&b.id));

        for local in installed {
            if let Some(meta) = local.metadata().map_style() {
                let style = MapStyle {
                    id: local.id.clone(),
                    origin: ResourceOrigin::Installed,
                    metadata: meta.clone(),
                    source: StyleSource::File(local.path().to_path_buf()),
                };
                styles.insert(meta.name.to_lowercase(), Arc::new(style));
            }
        }

        styles
    }
}
