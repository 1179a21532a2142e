//! CLI command implementations.

pub mod common;
pub mod config;
pub mod list;
pub mod repository;
pub mod resources;
pub mod watch;
