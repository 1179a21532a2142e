//! Configuration management CLI commands.

use std::path::Path;

use clap::Subcommand;
use cartovault::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Write a default configuration file if none exists
    Init,

    /// Print the effective configuration
    Show,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config_path: Option<&Path>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init => run_init(config_path),
        ConfigCommands::Show => run_show(config_path),
        ConfigCommands::Path => {
            println!("{}", resolve_path(config_path).display());
            Ok(())
        }
    }
}

fn resolve_path(config_path: Option<&Path>) -> std::path::PathBuf {
    config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(config_file_path)
}

fn run_init(config_path: Option<&Path>) -> Result<(), CliError> {
    let path = resolve_path(config_path);
    if path.exists() {
        println!("Configuration already exists: {}", path.display());
        return Ok(());
    }
    ConfigFile::default().save_to(&path)?;
    println!("Wrote default configuration: {}", path.display());
    Ok(())
}

fn run_show(config_path: Option<&Path>) -> Result<(), CliError> {
    let config = ConfigFile::load_from(&resolve_path(config_path))?;

    println!("[storage]");
    println!("  managed_dir    = {}", config.storage.managed_dir.display());
    if config.storage.unmanaged_dirs.is_empty() {
        println!("  unmanaged_dirs = (not set)");
    }
    for dir in &config.storage.unmanaged_dirs {
        println!("  unmanaged_dirs = {}", dir.display());
    }
    println!("  cache_dir      = {}", config.storage.cache_dir.display());
    println!();
    println!("[repository]");
    println!("  url               = {}", config.repository.url);
    println!("  download_base_url = {}", config.repository.download_base_url);
    println!("  timeout           = {}", config.repository.timeout);
    println!();
    println!("[watch]");
    println!("  enabled     = {}", config.watch.enabled);
    println!("  debounce_ms = {}", config.watch.debounce_ms);
    println!();
    println!("[logging]");
    println!("  directory = {}", config.logging.directory.display());
    println!("  file      = {}", config.logging.file);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_writes_default_file_once() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");

        run_init(Some(&path)).unwrap();
        assert!(path.exists());
        let written = std::fs::read_to_string(&path).unwrap();

        run_init(Some(&path)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), written);
    }

    #[test]
    fn test_resolve_path_prefers_argument() {
        let path = Path::new("/tmp/custom.ini");
        assert_eq!(resolve_path(Some(path)), path.to_path_buf());
        assert_eq!(resolve_path(None), config_file_path());
    }
}
