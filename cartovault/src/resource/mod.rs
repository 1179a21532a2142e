//! Resource model: identities, origins and per-origin variants.
//!
//! # Overview
//!
//! A logical resource (a map region, a voice pack, a style or a tile-source
//! document) can be known to the catalog through up to three independent
//! facts at once:
//!
//! - **Builtin**: compiled into the binary ([`BuiltinResource`])
//! - **Local**: a file on disk, installed or unmanaged ([`LocalResource`])
//! - **InRepository**: listed for download ([`ResourceInRepository`])
//!
//! # Type Hierarchy
//!
//! ```text
//! ResourceIdentity (base)          Resource (sum type)
//! ├── id: String                   ├── Builtin(Arc<BuiltinResource>)
//! └── resource_type: ResourceType  ├── Local(Arc<LocalResource>)
//!                                  └── InRepository(Arc<ResourceInRepository>)
//! ```
//!
//! `BuiltinResource` and `LocalResource` compose a `ResourceIdentity` and
//! `Deref` to it, so `resource.id` works on either.

mod local;
mod metadata;
pub mod naming;
mod repository;
mod types;

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

pub use local::{LocalKind, LocalResource};
pub use metadata::{
    MapStyleMetadata, ObfFile, ObfMetadata, OnlineTileSourcesMetadata, ResourceMetadata,
    ResourcePayload, TileSource,
};
pub use repository::ResourceInRepository;
pub use types::{ResourceOrigin, ResourceType};

/// Identity shared by every resource variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceIdentity {
    /// Globally unique resource id (lowercase).
    pub id: String,
    /// Resource type.
    pub resource_type: ResourceType,
}

impl ResourceIdentity {
    /// Create an identity. The id is normalized to lowercase.
    pub fn new(id: impl Into<String>, resource_type: ResourceType) -> Self {
        Self {
            id: id.into().to_lowercase(),
            resource_type,
        }
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.id, self.resource_type)
    }
}

/// A resource embedded at build time.
#[derive(Debug)]
pub struct BuiltinResource {
    identity: ResourceIdentity,
    metadata: ResourceMetadata,
    document: &'static str,
}

impl BuiltinResource {
    pub fn new(id: &str, metadata: ResourceMetadata, document: &'static str) -> Self {
        Self {
            identity: ResourceIdentity::new(id, metadata.resource_type()),
            metadata,
            document,
        }
    }

    pub fn metadata(&self) -> &ResourceMetadata {
        &self.metadata
    }

    /// Embedded source document.
    pub fn document(&self) -> &'static str {
        self.document
    }
}

impl Deref for BuiltinResource {
    type Target = ResourceIdentity;

    fn deref(&self) -> &Self::Target {
        &self.identity
    }
}

/// Any resource known to the catalog, tagged by origin.
#[derive(Debug, Clone)]
pub enum Resource {
    Builtin(Arc<BuiltinResource>),
    Local(Arc<LocalResource>),
    InRepository(Arc<ResourceInRepository>),
}

impl Resource {
    pub fn id(&self) -> &str {
        match self {
            Self::Builtin(r) => &r.id,
            Self::Local(r) => &r.id,
            Self::InRepository(r) => &r.id,
        }
    }

    pub fn resource_type(&self) -> ResourceType {
        match self {
            Self::Builtin(r) => r.resource_type,
            Self::Local(r) => r.resource_type,
            Self::InRepository(r) => r.resource_type,
        }
    }

    pub fn origin(&self) -> ResourceOrigin {
        match self {
            Self::Builtin(_) => ResourceOrigin::Builtin,
            Self::Local(r) => r.origin(),
            Self::InRepository(_) => ResourceOrigin::InRepository,
        }
    }

    /// The local resource, if this is one.
    pub fn as_local(&self) -> Option<&Arc<LocalResource>> {
        match self {
            Self::Local(r) => Some(r),
            _ => None,
        }
    }
}
