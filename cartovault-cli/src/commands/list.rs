//! `list` command: show builtin, local and repository resources.

use std::sync::Arc;

use clap::Args;
use console::style;

use cartovault::resource::{LocalResource, ResourceInRepository};
use cartovault::{ResourceType, ResourcesManager};

use super::common::{format_size, format_timestamp, ResourceKind};
use crate::error::CliError;

/// Arguments for `list`.
#[derive(Debug, Args)]
pub struct ListArgs {
    /// Show resources available in the repository instead of local ones
    #[arg(long)]
    pub repository: bool,

    /// Only show resources of this type
    #[arg(long = "type", value_enum)]
    pub kind: Option<ResourceKind>,
}

/// Run the list command.
pub fn run(manager: &ResourcesManager, args: ListArgs) -> Result<(), CliError> {
    let filter = args.kind.map(ResourceType::from);
    if args.repository {
        list_repository(manager, filter)
    } else {
        list_local(manager, filter);
        Ok(())
    }
}

fn matches(filter: Option<ResourceType>, ty: ResourceType) -> bool {
    filter.map_or(true, |f| f == ty)
}

fn list_local(manager: &ResourcesManager, filter: Option<ResourceType>) {
    let mut builtin: Vec<_> = manager
        .get_builtin_resources()
        .into_values()
        .filter(|r| matches(filter, r.resource_type))
        .collect();
    builtin.sort_by(|a, b| a.id.cmp(&b.id));

    let mut local: Vec<Arc<LocalResource>> = manager
        .get_local_resources()
        .into_values()
        .filter(|r| matches(filter, r.resource_type))
        .collect();
    local.sort_by(|a, b| a.id.cmp(&b.id));

    println!("{}", style("Builtin").bold().underlined());
    for resource in &builtin {
        println!("  {:<32} {}", resource.id, resource.resource_type);
    }
    println!();

    println!("{}", style("Local").bold().underlined());
    if local.is_empty() {
        println!("  (none)");
    }
    for resource in &local {
        let outdated = manager.is_installed_resource_outdated(&resource.id);
        let marker = if outdated {
            style("outdated").yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "  {:<32} {:<20} {:<10} {:>10}  {}  {}",
            resource.id,
            resource.resource_type.to_string(),
            resource.origin().to_string(),
            format_size(resource.size()),
            format_timestamp(resource.timestamp()),
            marker
        );
    }
}

fn list_repository(manager: &ResourcesManager, filter: Option<ResourceType>) -> Result<(), CliError> {
    if !manager.is_repository_available() {
        return Err(CliError::Resource(
            cartovault::ResourceError::RepositoryUnavailable,
        ));
    }

    let entries: Vec<Arc<ResourceInRepository>> = manager
        .get_resources_in_repository()
        .into_iter()
        .filter(|e| matches(filter, e.resource_type))
        .collect();

    println!(
        "{} ({} entries)",
        style("Repository").bold().underlined(),
        entries.len()
    );
    for entry in &entries {
        let status = if manager.is_resource_installed(&entry.id) {
            style("installed").green().to_string()
        } else {
            String::new()
        };
        println!(
            "  {:<32} {:<12} {:>10}  {}  {}",
            entry.id,
            entry.resource_type.to_string(),
            format_size(entry.size),
            format_timestamp(entry.timestamp),
            status
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_filter() {
        assert!(matches(None, ResourceType::VoicePack));
        assert!(matches(Some(ResourceType::VoicePack), ResourceType::VoicePack));
        assert!(!matches(Some(ResourceType::MapRegion), ResourceType::VoicePack));
    }
}
