//! Read-only projection views handed to the rendering side.
//!
//! Views hold the catalog, never a snapshot: each call recomputes its
//! result from the current indices. Consumers never touch the indices
//! directly.
//!
//! - [`ObfsCollection`]: installed and unmanaged map-data files, plus the
//!   [`DataInterface`] handle that keeps them locked while in use
//! - [`OnlineTileSources`]: tile sources by name
//! - [`MapStylesCollection`]: styles by name and baked style chains

mod obfs;
mod styles;
mod tile_sources;

pub use obfs::{DataInterface, ObfsCollection};
pub use styles::{BakedMapStyle, MapStyle, MapStylesCollection};
pub use tile_sources::OnlineTileSources;
