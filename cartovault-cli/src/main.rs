//! Cartovault CLI - Command-line interface
//!
//! This binary drives the cartovault library: it lists, installs, updates
//! and removes offline map resources and keeps the repository listing fresh.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use cartovault::logging::{init_logging, LoggingGuard};

use commands::common::{load_config, open_manager};
use commands::config::ConfigCommands;
use commands::list::ListArgs;
use commands::resources::{InstallArgs, UninstallArgs, UpdateArgs};
use error::CliError;

#[derive(Parser)]
#[command(name = "cartovault")]
#[command(version = cartovault::VERSION)]
#[command(about = "Manage offline map regions, voice packs, styles and tile sources", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.cartovault/config.ini)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List builtin and local resources, or the repository listing
    List(ListArgs),

    /// Install a resource from the repository or a local file
    Install(InstallArgs),

    /// Update installed resources from the repository or a local file
    Update(UpdateArgs),

    /// Remove an installed resource
    Uninstall(UninstallArgs),

    /// Show installed resources that have a newer repository version
    Outdated,

    /// Download the latest repository listing
    Refresh,

    /// Watch storage directories and keep the catalog in sync
    Watch,

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_deref();

    if let Commands::Config(command) = cli.command {
        return commands::config::run(command, config_path);
    }

    let config = load_config(config_path)?;
    let _logging = start_logging(&config)?;
    tracing::debug!(version = cartovault::VERSION, "cartovault starting");

    let watch = matches!(cli.command, Commands::Watch);
    let manager = open_manager(&config, watch)?;

    match cli.command {
        Commands::List(args) => commands::list::run(&manager, args),
        Commands::Install(args) => commands::resources::run_install(&manager, args),
        Commands::Update(args) => commands::resources::run_update(&manager, args),
        Commands::Uninstall(args) => commands::resources::run_uninstall(&manager, args),
        Commands::Outdated => commands::repository::run_outdated(&manager),
        Commands::Refresh => commands::repository::run_refresh(&manager),
        Commands::Watch => commands::watch::run(manager),
        Commands::Config(_) => Ok(()),
    }
}

fn start_logging(config: &cartovault::config::ConfigFile) -> Result<LoggingGuard, CliError> {
    init_logging(&config.logging.directory, &config.logging.file)
        .map_err(|e| CliError::LoggingInit(e.to_string()))
}
