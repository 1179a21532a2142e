//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use cartovault::config::ConfigFileError;
use cartovault::ResourceError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Resource catalog operation failed
    Resource(ResourceError),
    /// Repository listing could not be refreshed
    Repository(ResourceError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::Resource(ResourceError::InUse { .. }) => {
                eprintln!();
                eprintln!("The resource is open in another application.");
                eprintln!("Close it and try again.");
            }
            CliError::Resource(ResourceError::RepositoryUnavailable) => {
                eprintln!();
                eprintln!("No repository listing is loaded. Run: cartovault refresh");
            }
            CliError::Repository(_) => {
                eprintln!();
                eprintln!("Check your network connection and the [repository] url in:");
                eprintln!("  {}", cartovault::config::config_file_path().display());
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Resource(e) => write!(f, "{}", e),
            CliError::Repository(e) => write!(f, "Failed to refresh repository: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Resource(e) | CliError::Repository(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ResourceError> for CliError {
    fn from(e: ResourceError) -> Self {
        CliError::Resource(e)
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_wraps_resource_error() {
        let err = CliError::from(ResourceError::NotFound {
            id: "andorra".to_string(),
        });
        assert_eq!(err.to_string(), "resource not found: andorra");
    }

    #[test]
    fn test_repository_error_has_source() {
        use std::error::Error;
        let err = CliError::Repository(ResourceError::RepositoryUnavailable);
        assert!(err.source().is_some());
        assert!(err.to_string().starts_with("Failed to refresh repository"));
    }
}
