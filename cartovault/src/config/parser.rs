//! INI parsing: `Ini` → `ConfigFile`.
//!
//! Starts from defaults and overlays every key present in the file.

use std::path::PathBuf;

use ini::Ini;

use super::file::{ConfigFile, ConfigFileError};

pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [storage] section
    if let Some(section) = ini.section(Some("storage")) {
        if let Some(v) = non_empty(section.get("managed_dir")) {
            config.storage.managed_dir = expand_tilde(v);
        }
        if let Some(v) = section.get("unmanaged_dirs") {
            config.storage.unmanaged_dirs = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(expand_tilde)
                .collect();
        }
        if let Some(v) = non_empty(section.get("cache_dir")) {
            config.storage.cache_dir = expand_tilde(v);
        }
    }

    // [repository] section
    if let Some(section) = ini.section(Some("repository")) {
        if let Some(v) = non_empty(section.get("url")) {
            config.repository.url = parse_url("repository", "url", v)?;
        }
        if let Some(v) = non_empty(section.get("download_base_url")) {
            config.repository.download_base_url =
                parse_url("repository", "download_base_url", v)?;
        }
        if let Some(v) = section.get("timeout") {
            config.repository.timeout = parse_positive("repository", "timeout", v)?;
        }
    }

    // [watch] section
    if let Some(section) = ini.section(Some("watch")) {
        if let Some(v) = section.get("enabled") {
            config.watch.enabled = parse_bool("watch", "enabled", v)?;
        }
        if let Some(v) = section.get("debounce_ms") {
            config.watch.debounce_ms = parse_positive("watch", "debounce_ms", v)?;
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = non_empty(section.get("directory")) {
            config.logging.directory = expand_tilde(v);
        }
        if let Some(v) = non_empty(section.get("file")) {
            config.logging.file = v.to_string();
        }
    }

    Ok(config)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_bool(section: &str, key: &str, value: &str) -> Result<bool, ConfigFileError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid(section, key, value, "expected true or false")),
    }
}

fn parse_positive(section: &str, key: &str, value: &str) -> Result<u64, ConfigFileError> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(invalid(section, key, value, "expected a positive integer")),
    }
}

fn parse_url(section: &str, key: &str, value: &str) -> Result<String, ConfigFileError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(value.to_string())
    } else {
        Err(invalid(section, key, value, "expected an http:// or https:// URL"))
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
