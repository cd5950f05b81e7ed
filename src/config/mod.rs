use crate::constants::{
    DEFAULT_HTTP_TIMEOUT_SECONDS, DEFAULT_MEMORY_CAPACITY, DEFAULT_NAMESPACE, env_vars,
};
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub mod paths;
pub mod validation;

use paths::{get_config_path, get_log_dir_path, get_store_dir_path};
use validation::validate_config;

/// Configuration structure for the application.
/// Handles loading, saving, and managing cache settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Prefix for every durable key written by the cache.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// Directory of the file-backed durable store. Defaults to the platform cache directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<String>,
    /// Maximum number of entries in the in-memory shadow.
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,
    /// Path to the log file. If not specified, logs will be written to a default location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file_path: Option<String>,
    /// HTTP timeout in seconds for fetches made by the CLI. Defaults to 30 seconds.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_memory_capacity() -> usize {
    DEFAULT_MEMORY_CAPACITY
}

/// Default HTTP timeout in seconds
fn default_http_timeout() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECONDS
}

impl Default for Config {
    fn default() -> Self {
        Config {
            namespace: default_namespace(),
            store_dir: None,
            memory_capacity: default_memory_capacity(),
            log_file_path: None,
            http_timeout_seconds: default_http_timeout(),
        }
    }
}

impl Config {
    /// Loads configuration from the default config file location.
    /// A missing config file yields the defaults.
    /// Environment variables can override config file values.
    ///
    /// # Environment Variables
    /// - `SPORTS_CACHE_NAMESPACE` - Override the durable key namespace
    /// - `SPORTS_CACHE_STORE_DIR` - Override the durable store directory
    /// - `SPORTS_CACHE_MEMORY_CAPACITY` - Override the memory shadow capacity
    /// - `SPORTS_CACHE_LOG_FILE` - Override log file path
    /// - `SPORTS_CACHE_HTTP_TIMEOUT` - Override HTTP timeout in seconds (default: 30)
    ///
    /// # Returns
    /// * `Ok(Config)` - Successfully loaded configuration
    /// * `Err(AppError)` - Error occurred during load or validation
    pub async fn load() -> Result<Self, AppError> {
        let config_path = get_config_path();

        let mut config = if Path::new(&config_path).exists() {
            Self::load_from_path(&config_path).await?
        } else {
            Config::default()
        };

        config.apply_env_overrides();

        // Validate configuration
        config.validate()?;

        Ok(config)
    }

    /// Applies `SPORTS_CACHE_*` environment overrides in place
    pub fn apply_env_overrides(&mut self) {
        if let Ok(namespace) = std::env::var(env_vars::NAMESPACE) {
            self.namespace = namespace;
        }

        if let Ok(store_dir) = std::env::var(env_vars::STORE_DIR) {
            self.store_dir = Some(store_dir);
        }

        if let Some(capacity) = std::env::var(env_vars::MEMORY_CAPACITY)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
        {
            self.memory_capacity = capacity;
        }

        if let Ok(log_file_path) = std::env::var(env_vars::LOG_FILE) {
            self.log_file_path = Some(log_file_path);
        }

        if let Some(timeout) = std::env::var(env_vars::HTTP_TIMEOUT)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            self.http_timeout_seconds = timeout;
        }
    }

    /// Validates the configuration settings
    ///
    /// # Returns
    /// * `Ok(())` - Configuration is valid
    /// * `Err(AppError)` - Configuration validation failed
    pub fn validate(&self) -> Result<(), AppError> {
        validate_config(self)
    }

    /// Directory of the durable store, falling back to the platform default
    pub fn resolved_store_dir(&self) -> String {
        self.store_dir.clone().unwrap_or_else(get_store_dir_path)
    }

    /// Returns the platform-specific path for the config file.
    pub fn get_config_path() -> String {
        paths::get_config_path()
    }

    /// Returns the platform-specific path for the log directory.
    pub fn get_log_dir_path() -> String {
        paths::get_log_dir_path()
    }

    /// Displays current configuration settings to stdout.
    ///
    /// # Notes
    /// - Shows config file location and current settings
    /// - Handles case when no config file exists
    pub async fn display() -> Result<(), AppError> {
        let config_path = get_config_path();
        let log_dir = get_log_dir_path();

        if !Path::new(&config_path).exists() {
            println!("\nNo configuration file found at:");
            println!("{config_path}");
            println!("(Using defaults)");
        }

        let config = Config::load().await?;
        println!("\nCurrent Configuration");
        println!("────────────────────────────────────");
        println!("Config Location:");
        println!("{config_path}");
        println!("────────────────────────────────────");
        println!("Namespace:");
        println!("{}", config.namespace);
        println!("────────────────────────────────────");
        println!("Store Directory:");
        println!("{}", config.resolved_store_dir());
        println!("────────────────────────────────────");
        println!("Memory Capacity:");
        println!("{} entries", config.memory_capacity);
        println!("────────────────────────────────────");
        println!("HTTP Timeout:");
        println!("{} seconds", config.http_timeout_seconds);
        println!("────────────────────────────────────");
        println!("Log File Location:");
        if let Some(custom_path) = &config.log_file_path {
            println!("{custom_path}");
        } else {
            println!("{log_dir}/sports_cache.log");
            println!("(Default location)");
        }

        Ok(())
    }

    /// Saves configuration to a custom file path.
    ///
    /// Creates the parent directory if it doesn't exist.
    ///
    /// # Errors
    /// * `AppError::Config` - If the provided path has no parent directory
    /// * `AppError::Io` - If there's an I/O error creating directories or writing the file
    /// * `AppError::TomlSerialize` - If there's an error serializing the configuration
    pub async fn save_to_path(&self, path: &str) -> Result<(), AppError> {
        let config_dir = Path::new(path).parent().ok_or_else(|| {
            AppError::config_error(format!("Path '{path}' has no parent directory"))
        })?;

        if !config_dir.exists() {
            fs::create_dir_all(config_dir).await?;
        }
        let content = toml::to_string_pretty(self)?;
        let mut file = fs::File::create(path).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Loads configuration from a custom file path without env overrides.
    pub async fn load_from_path(path: &str) -> Result<Self, AppError> {
        let content = fs::read_to_string(path).await?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    fn clear_env() {
        for var in [
            env_vars::NAMESPACE,
            env_vars::STORE_DIR,
            env_vars::MEMORY_CAPACITY,
            env_vars::LOG_FILE,
            env_vars::HTTP_TIMEOUT,
        ] {
            // SAFETY: env-mutating tests are serialized with #[serial]
            unsafe { std::env::remove_var(var) };
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.namespace, "sports_cache_");
        assert_eq!(config.memory_capacity, 500);
        assert_eq!(config.http_timeout_seconds, 30);
        assert!(config.store_dir.is_none());
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");
        let path = path.to_string_lossy().to_string();

        let config = Config {
            namespace: "nfl_cache_".to_string(),
            store_dir: Some("/tmp/nfl_store".to_string()),
            memory_capacity: 64,
            log_file_path: None,
            http_timeout_seconds: 10,
        };
        config.save_to_path(&path).await.unwrap();

        let loaded = Config::load_from_path(&path).await.unwrap();
        assert_eq!(loaded, config);
    }

    #[tokio::test]
    async fn test_missing_fields_use_defaults() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "memory_capacity = 12\n").unwrap();

        let loaded = Config::load_from_path(&path.to_string_lossy())
            .await
            .unwrap();
        assert_eq!(loaded.memory_capacity, 12);
        assert_eq!(loaded.namespace, DEFAULT_NAMESPACE);
        assert_eq!(loaded.http_timeout_seconds, DEFAULT_HTTP_TIMEOUT_SECONDS);
    }

    #[tokio::test]
    async fn test_invalid_toml_is_an_error() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "memory_capacity = \"lots\"\n").unwrap();

        let result = Config::load_from_path(&path.to_string_lossy()).await;
        assert!(matches!(result, Err(AppError::TomlDeserialize(_))));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        // SAFETY: env-mutating tests are serialized with #[serial]
        unsafe {
            std::env::set_var(env_vars::NAMESPACE, "espn_");
            std::env::set_var(env_vars::MEMORY_CAPACITY, "42");
            std::env::set_var(env_vars::HTTP_TIMEOUT, "not a number");
            std::env::set_var(env_vars::STORE_DIR, "/var/cache/sports");
        }

        let mut config = Config::default();
        config.apply_env_overrides();
        clear_env();

        assert_eq!(config.namespace, "espn_");
        assert_eq!(config.memory_capacity, 42);
        assert_eq!(config.http_timeout_seconds, DEFAULT_HTTP_TIMEOUT_SECONDS);
        assert_eq!(config.resolved_store_dir(), "/var/cache/sports");
    }

    #[test]
    fn test_resolved_store_dir_default() {
        let config = Config::default();
        assert!(config.resolved_store_dir().ends_with("store"));
    }
}
