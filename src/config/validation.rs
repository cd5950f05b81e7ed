use super::Config;
use crate::error::AppError;
use std::path::Path;

/// Validates the configuration settings
///
/// # Validation Rules
/// - Namespace cannot be empty, contain whitespace or path separators
/// - Memory capacity must be at least 1
/// - HTTP timeout must be at least 1 second
/// - If a store directory is provided, it cannot be empty
/// - If log file path is provided, it cannot be empty
/// - Log file path parent directory must exist or be creatable
pub fn validate_config(config: &Config) -> Result<(), AppError> {
    validate_namespace(&config.namespace)?;

    if config.memory_capacity == 0 {
        return Err(AppError::config_error(
            "Memory capacity must be at least 1 entry",
        ));
    }

    if config.http_timeout_seconds == 0 {
        return Err(AppError::config_error(
            "HTTP timeout must be at least 1 second",
        ));
    }

    if let Some(store_dir) = &config.store_dir
        && store_dir.trim().is_empty()
    {
        return Err(AppError::config_error("Store directory cannot be empty"));
    }

    validate_log_file_path(&config.log_file_path)
}

fn validate_namespace(namespace: &str) -> Result<(), AppError> {
    if namespace.is_empty() {
        return Err(AppError::config_error("Namespace cannot be empty"));
    }

    if namespace
        .chars()
        .any(|c| c.is_whitespace() || c == '/' || c == '\\')
    {
        return Err(AppError::config_error(format!(
            "Namespace '{namespace}' must not contain whitespace or path separators"
        )));
    }

    Ok(())
}

fn validate_log_file_path(log_file_path: &Option<String>) -> Result<(), AppError> {
    if let Some(log_path) = log_file_path {
        if log_path.is_empty() {
            return Err(AppError::config_error("Log file path cannot be empty"));
        }

        // Check if parent directory exists or can be created
        if let Some(parent) = Path::new(log_path).parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::config_error(format!(
                    "Cannot create log directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_namespace_rules() {
        for namespace in ["", "sports cache_", "a/b", "a\\b"] {
            let config = Config {
                namespace: namespace.to_string(),
                ..Config::default()
            };
            assert!(
                matches!(validate_config(&config), Err(AppError::Config(_))),
                "namespace {namespace:?} should be rejected"
            );
        }

        let config = Config {
            namespace: "cs2-matches.".to_string(),
            ..Config::default()
        };
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_capacity_and_timeout() {
        let config = Config {
            memory_capacity: 0,
            ..Config::default()
        };
        assert!(validate_config(&config).is_err());

        let config = Config {
            http_timeout_seconds: 0,
            ..Config::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_paths() {
        let config = Config {
            store_dir: Some("  ".to_string()),
            ..Config::default()
        };
        assert!(validate_config(&config).is_err());

        let config = Config {
            log_file_path: Some(String::new()),
            ..Config::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_log_directory_is_created() {
        let temp_dir = tempdir().unwrap();
        let log_dir = temp_dir.path().join("logs");
        let config = Config {
            log_file_path: Some(log_dir.join("cache.log").to_string_lossy().to_string()),
            ..Config::default()
        };

        assert!(validate_config(&config).is_ok());
        assert!(log_dir.exists());
    }
}
