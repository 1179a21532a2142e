//! INI serialization: `ConfigFile` → commented INI text.

use std::path::Path;

use super::file::ConfigFile;

pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let unmanaged = config
        .storage
        .unmanaged_dirs
        .iter()
        .map(|p| path_to_string(p))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"; Cartovault configuration

[storage]
; Directory owned by cartovault; installed resources are written here
managed_dir = {managed_dir}
; Comma-separated directories indexed read-only
unmanaged_dirs = {unmanaged}
; Repository listing cache
cache_dir = {cache_dir}

[repository]
url = {url}
download_base_url = {download_base_url}
; HTTP timeout in seconds
timeout = {timeout}

[watch]
; Rescan storage automatically when files change
enabled = {enabled}
debounce_ms = {debounce_ms}

[logging]
directory = {log_dir}
file = {log_file}
"#,
        managed_dir = path_to_string(&config.storage.managed_dir),
        unmanaged = unmanaged,
        cache_dir = path_to_string(&config.storage.cache_dir),
        url = config.repository.url,
        download_base_url = config.repository.download_base_url,
        timeout = config.repository.timeout,
        enabled = config.watch.enabled,
        debounce_ms = config.watch.debounce_ms,
        log_dir = path_to_string(&config.logging.directory),
        log_file = config.logging.file,
    )
}

fn path_to_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_all_sections() {
        let text = to_config_string(&ConfigFile::default());
        for section in ["[storage]", "[repository]", "[watch]", "[logging]"] {
            assert!(text.contains(section), "missing {section}");
        }
        assert!(text.contains("enabled = true"));
    }
}
