//! Common types and utilities shared across CLI commands.

use std::path::Path;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use clap::ValueEnum;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use cartovault::config::ConfigFile;
use cartovault::{ResourceType, ResourcesManager};

use crate::error::CliError;

/// Resource type selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ResourceKind {
    /// Binary map data for a region (.map.obf)
    Region,
    /// Voice guidance pack (.voice)
    Voice,
    /// Map rendering style (.render.xml)
    Style,
    /// Online tile-source definitions (.tilesources.xml)
    TileSources,
}

impl From<ResourceKind> for ResourceType {
    fn from(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Region => ResourceType::MapRegion,
            ResourceKind::Voice => ResourceType::VoicePack,
            ResourceKind::Style => ResourceType::MapStyle,
            ResourceKind::TileSources => ResourceType::OnlineTileSources,
        }
    }
}

/// Load the configuration file, from `path` if given.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    match path {
        Some(path) => Ok(ConfigFile::load_from(path)?),
        None => Ok(ConfigFile::load()?),
    }
}

/// Build and initialize a manager from the configuration.
///
/// Watching is only enabled when `watch` is set, regardless of the file.
pub fn open_manager(config: &ConfigFile, watch: bool) -> Result<Arc<ResourcesManager>, CliError> {
    let manager_config = config.to_manager_config().with_watch(watch);
    let manager = Arc::new(ResourcesManager::with_defaults(manager_config)?);
    let report = manager.initialize()?;

    for diagnostic in &report.diagnostics {
        eprintln!(
            "{} skipped {}: {}",
            style("warning:").yellow().bold(),
            diagnostic.path.display(),
            diagnostic.reason
        );
    }

    Ok(manager)
}

/// Create a byte progress bar for a download.
pub fn download_bar(id: &str) -> ProgressBar {
    let bar = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{prefix:>12} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        .map(|s| s.progress_chars("█▓░"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar.set_prefix(id.to_string());
    bar
}

/// Feed a transfer progress report into a bar.
pub fn report_progress(bar: &ProgressBar, done: u64, total: Option<u64>) {
    if let Some(total) = total {
        if bar.length() != Some(total) {
            bar.set_length(total);
        }
    }
    bar.set_position(done);
}

/// Format a byte count for display.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format a millisecond version timestamp as a UTC date.
pub fn format_timestamp(ms: u64) -> String {
    i64::try_from(ms)
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}
