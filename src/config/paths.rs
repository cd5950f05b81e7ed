use std::path::Path;

/// Returns the platform-specific path for the config file.
///
/// # Notes
/// - Uses platform-specific config directory (e.g., ~/.config on Linux)
/// - Falls back to current directory if config directory is unavailable
pub fn get_config_path() -> String {
    dirs::config_dir()
        .unwrap_or_else(|| Path::new(".").to_path_buf())
        .join("sports_cache")
        .join("config.toml")
        .to_string_lossy()
        .to_string()
}

/// Returns the platform-specific path for the log directory.
pub fn get_log_dir_path() -> String {
    dirs::config_dir()
        .unwrap_or_else(|| Path::new(".").to_path_buf())
        .join("sports_cache")
        .join("logs")
        .to_string_lossy()
        .to_string()
}

/// Returns the platform-specific directory for the file-backed durable store.
///
/// Uses the cache directory (e.g., ~/.cache on Linux) since entries can be
/// rebuilt from upstream at any time.
pub fn get_store_dir_path() -> String {
    dirs::cache_dir()
        .unwrap_or_else(|| Path::new(".").to_path_buf())
        .join("sports_cache")
        .join("store")
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_app_scoped() {
        assert!(get_config_path().ends_with("config.toml"));
        assert!(get_config_path().contains("sports_cache"));
        assert!(get_log_dir_path().ends_with("logs"));
        assert!(get_store_dir_path().contains("sports_cache"));
    }
}
