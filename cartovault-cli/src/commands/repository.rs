//! `refresh` and `outdated` commands.

use cartovault::ResourcesManager;

use super::common::format_timestamp;
use crate::error::CliError;

/// Download the repository listing and replace the cached copy.
pub fn run_refresh(manager: &ResourcesManager) -> Result<(), CliError> {
    println!("Fetching {}", manager.config().repository_url);
    let count = manager.update_repository().map_err(CliError::Repository)?;
    println!("Repository lists {} resources", count);

    let outdated = manager.get_outdated_installed_resources();
    if !outdated.is_empty() {
        println!(
            "{} installed resources have updates. Run: cartovault outdated",
            outdated.len()
        );
    }
    Ok(())
}

/// Print installed resources with a newer repository version.
pub fn run_outdated(manager: &ResourcesManager) -> Result<(), CliError> {
    if !manager.is_repository_available() {
        return Err(CliError::Resource(
            cartovault::ResourceError::RepositoryUnavailable,
        ));
    }

    let outdated = manager.get_outdated_installed_resources();
    if outdated.is_empty() {
        println!("Everything is up to date.");
        return Ok(());
    }

    for id in &outdated {
        let installed = manager.get_local_resource(id).map(|r| r.timestamp());
        let listed = manager.get_resource_in_repository(id).map(|r| r.timestamp);
        println!(
            "  {:<32} {} -> {}",
            id,
            installed.map_or_else(|| "-".to_string(), format_timestamp),
            listed.map_or_else(|| "-".to_string(), format_timestamp)
        );
    }
    println!();
    println!("Run 'cartovault update' to update all of them.");
    Ok(())
}
