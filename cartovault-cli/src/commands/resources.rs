//! `install`, `update` and `uninstall` commands.

use std::path::PathBuf;

use clap::Args;

use cartovault::resource::LocalResource;
use cartovault::{ResourceError, ResourcesManager};

use super::common::{download_bar, format_size, format_timestamp, report_progress, ResourceKind};
use crate::error::CliError;

/// Arguments for `install`.
#[derive(Debug, Args)]
pub struct InstallArgs {
    /// Repository id to download, or the id to install a file under
    pub id: Option<String>,

    /// Install from a local file instead of the repository
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Resource type of the file (required with --file)
    #[arg(long = "type", value_enum, requires = "file")]
    pub kind: Option<ResourceKind>,
}

/// Arguments for `update`.
#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Installed resource id; omit to update everything outdated
    pub id: Option<String>,

    /// Replace with a local file instead of the repository version
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}

/// Arguments for `uninstall`.
#[derive(Debug, Args)]
pub struct UninstallArgs {
    /// Installed resource id
    pub id: String,
}

/// Run the install command.
pub fn run_install(manager: &ResourcesManager, args: InstallArgs) -> Result<(), CliError> {
    let resource = match (args.file, args.id) {
        (Some(path), id) => {
            let kind = args.kind.ok_or_else(|| {
                CliError::Config("--type is required when installing from a file".to_string())
            })?;
            manager.install_from_file(id.as_deref(), &path, kind.into())?
        }
        (None, Some(id)) => {
            let bar = download_bar(&id);
            let result = manager
                .install_from_repository(&id, &|done, total| report_progress(&bar, done, total));
            bar.finish_and_clear();
            result?
        }
        (None, None) => {
            return Err(CliError::Config(
                "an id or --file is required".to_string(),
            ))
        }
    };

    print_resource("Installed", &resource);
    Ok(())
}

/// Run the update command.
pub fn run_update(manager: &ResourcesManager, args: UpdateArgs) -> Result<(), CliError> {
    if let Some(path) = args.file {
        let resource = manager.update_from_file(args.id.as_deref(), &path)?;
        print_resource("Updated", &resource);
        return Ok(());
    }

    let ids = match args.id {
        Some(id) => vec![id],
        None => manager.get_outdated_installed_resources(),
    };
    if ids.is_empty() {
        println!("Everything is up to date.");
        return Ok(());
    }

    let single = ids.len() == 1;
    let mut first_error = None;
    for id in &ids {
        let bar = download_bar(id);
        let result =
            manager.update_from_repository(id, &|done, total| report_progress(&bar, done, total));
        bar.finish_and_clear();
        match result {
            Ok(resource) => print_resource("Updated", &resource),
            Err(e) if single => return Err(e.into()),
            Err(e) => {
                eprintln!("Failed to update {}: {}", id, e);
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

/// Run the uninstall command.
pub fn run_uninstall(manager: &ResourcesManager, args: UninstallArgs) -> Result<(), CliError> {
    match manager.uninstall_resource(&args.id) {
        Ok(()) => {
            println!("Uninstalled {}", args.id);
            Ok(())
        }
        Err(ResourceError::NotManaged { id }) => Err(CliError::Config(format!(
            "'{}' is builtin or lives in an unmanaged directory and cannot be uninstalled",
            id
        ))),
        Err(e) => Err(e.into()),
    }
}

fn print_resource(action: &str, resource: &LocalResource) {
    println!(
        "{} {} ({}, {}, version {})",
        action,
        resource.id,
        resource.resource_type,
        format_size(resource.size()),
        format_timestamp(resource.timestamp())
    );
}
