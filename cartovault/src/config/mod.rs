//! User configuration stored in `~/.cartovault/config.ini`.
//!
//! ```ini
//! [storage]
//! managed_dir = ~/.cartovault/resources
//! unmanaged_dirs = /media/maps, /opt/maps
//! cache_dir = ~/.cartovault/cache
//!
//! [repository]
//! url = https://download.osmand.net/get_indexes?xml
//! download_base_url = https://download.osmand.net/download.php?file=
//! timeout = 300
//!
//! [watch]
//! enabled = true
//! debounce_ms = 250
//!
//! [logging]
//! directory = ~/.cartovault/logs
//! file = cartovault.log
//! ```

mod file;
mod parser;
mod writer;

pub use file::{
    config_directory, config_file_path, ConfigFile, ConfigFileError, LoggingSettings,
    RepositorySettings, StorageSettings, WatchSettings,
};
