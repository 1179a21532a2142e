//! Cartovault - Offline map resource catalog
//!
//! This library tracks the map data, voice packs, rendering styles and
//! tile-source documents an offline map renderer depends on. It knows what is
//! compiled in, what is on disk and what a remote repository offers, and it
//! installs, updates and removes resources without ever leaving storage in a
//! half-written state.
//!
//! # Modules
//!
//! - [`resource`]: resource model, types and file naming
//! - [`container`]: validation and metadata extraction for resource files
//! - [`catalog`]: the three indices and their snapshot accessors
//! - [`scanner`]: storage scanning, reconciliation and directory watching
//! - [`repository`]: listing download, parsing and caching
//! - [`manager`]: lifecycle plus install/update/uninstall
//! - [`views`]: read-only projections for the rendering side
//! - [`config`]: INI configuration file
//! - [`logging`]: tracing setup for binaries

pub mod catalog;
pub mod config;
pub mod container;
pub mod error;
pub mod logging;
pub mod manager;
pub mod repository;
pub mod resource;
pub mod scanner;
pub mod views;

pub use error::{ResourceError, ResourceResult};
pub use manager::{InitReport, ManagerConfig, ResourcesManager};
pub use resource::{Resource, ResourceOrigin, ResourceType};

/// Library version, also sent as part of the HTTP user agent.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
