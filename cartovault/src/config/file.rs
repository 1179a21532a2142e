//! Configuration file loading and saving.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::manager::{ManagerConfig, DEFAULT_DOWNLOAD_BASE_URL, DEFAULT_REPOSITORY_URL};
use crate::repository::DEFAULT_TIMEOUT_SECS;

/// Default watch debounce in milliseconds.
pub const DEFAULT_DEBOUNCE_MS: u64 = 250;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

/// `[storage]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    pub managed_dir: PathBuf,
    pub unmanaged_dirs: Vec<PathBuf>,
    pub cache_dir: PathBuf,
}

/// `[repository]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySettings {
    pub url: String,
    pub download_base_url: String,
    /// HTTP timeout in seconds.
    pub timeout: u64,
}

/// `[watch]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchSettings {
    pub enabled: bool,
    pub debounce_ms: u64,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub file: String,
}

/// Parsed configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub storage: StorageSettings,
    pub repository: RepositorySettings,
    pub watch: WatchSettings,
    pub logging: LoggingSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        let base = config_directory();
        Self {
            storage: StorageSettings {
                managed_dir: base.join("resources"),
                unmanaged_dirs: Vec::new(),
                cache_dir: base.join("cache"),
            },
            repository: RepositorySettings {
                url: DEFAULT_REPOSITORY_URL.to_string(),
                download_base_url: DEFAULT_DOWNLOAD_BASE_URL.to_string(),
                timeout: DEFAULT_TIMEOUT_SECS,
            },
            watch: WatchSettings {
                enabled: true,
                debounce_ms: DEFAULT_DEBOUNCE_MS,
            },
            logging: LoggingSettings {
                directory: base.join("logs"),
                file: crate::logging::default_log_file().to_string(),
            },
        }
    }
}

impl ConfigFile {
    /// Load configuration from the default path (~/.cartovault/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<(), ConfigFileError> {
        self.save_to(&config_file_path())
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let content = super::writer::to_config_string(self);
        std::fs::write(path, content).map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Create the default config file if it doesn't exist.
    ///
    /// Returns the path to the config file.
    pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
        let path = config_file_path();
        if !path.exists() {
            Self::default().save_to(&path)?;
        }
        Ok(path)
    }

    /// Manager configuration described by this file.
    pub fn to_manager_config(&self) -> ManagerConfig {
        let mut config = ManagerConfig::new(&self.storage.managed_dir)
            .with_cache_dir(&self.storage.cache_dir)
            .with_repository_url(&self.repository.url)
            .with_download_base_url(&self.repository.download_base_url)
            .with_timeout(Duration::from_secs(self.repository.timeout))
            .with_watch(self.watch.enabled)
            .with_watch_debounce(Duration::from_millis(self.watch.debounce_ms));
        for dir in &self.storage.unmanaged_dirs {
            config = config.with_unmanaged_dir(dir);
        }
        config
    }
}

/// Get the path to the config directory (~/.cartovault).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cartovault")
}

/// Get the path to the config file (~/.cartovault/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
