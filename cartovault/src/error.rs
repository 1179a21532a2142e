//! Error types for resource catalog operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::resource::ResourceType;

/// Result type for resource operations.
pub type ResourceResult<T> = Result<T, ResourceError>;

/// Errors surfaced by catalog, repository and install/update/uninstall operations.
///
/// Every variant is a definite failure: the operation that produced it left
/// the catalog in its pre-call state, so callers may retry.
#[derive(Debug, Error)]
pub enum ResourceError {
    /// No resource with this id exists for the requested origin.
    #[error("resource not found: {id}")]
    NotFound { id: String },

    /// Install requested but a local resource with this id already exists.
    #[error("resource already exists: {id}")]
    AlreadyExists { id: String },

    /// Mutation refused because consumers hold the resource open.
    #[error("resource {id} is in use ({lock_count} open handles)")]
    InUse { id: String, lock_count: usize },

    /// The resource is builtin or unmanaged and cannot be mutated.
    #[error("resource {id} is not managed by this catalog")]
    NotManaged { id: String },

    /// The file does not match the expected format for its type.
    ///
    /// `resource_type` is `None` when the failure happens before a type is
    /// known, such as an id that cannot be derived from a file name.
    #[error("validation failed for {}{}: {reason}", path.display(), type_suffix(resource_type))]
    ValidationFailed {
        path: PathBuf,
        resource_type: Option<ResourceType>,
        reason: String,
    },

    /// Network or transport failure, including a size mismatch.
    #[error("transfer from {url} failed: {reason}")]
    TransferFailed { url: String, reason: String },

    /// No repository listing has been loaded.
    #[error("repository listing is not available")]
    RepositoryUnavailable,

    /// A repository document or resource file could not be parsed.
    #[error("failed to parse {source_name}: {reason}")]
    ParseFailed { source_name: String, reason: String },

    /// Filesystem failure while mutating storage.
    #[error("I/O error on {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

impl ResourceError {
    pub(crate) fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn validation(
        path: impl Into<PathBuf>,
        resource_type: ResourceType,
        reason: impl Into<String>,
    ) -> Self {
        Self::ValidationFailed {
            path: path.into(),
            resource_type: Some(resource_type),
            reason: reason.into(),
        }
    }

    pub(crate) fn untyped_validation(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ValidationFailed {
            path: path.into(),
            resource_type: None,
            reason: reason.into(),
        }
    }

    pub(crate) fn transfer(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TransferFailed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn parse(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ParseFailed {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if retrying after consumers release their handles may succeed.
    pub fn is_in_use(&self) -> bool {
        matches!(self, Self::InUse { .. })
    }
}

fn type_suffix(resource_type: &Option<ResourceType>) -> String {
    match resource_type {
        Some(t) => format!(" ({})", t),
        None => String::new(),
    }
}
