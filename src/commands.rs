use crate::cli::Args;
use sports_cache::cache::{DataClassification, FileStore, TieredCache};
use sports_cache::config::Config;
use sports_cache::error::AppError;
use sports_cache::fetcher::{create_http_client_with_timeout, fetch_json};
use std::path::Path;
use tracing::{info, warn};

/// Validates command line argument combinations clap cannot express.
///
/// Returns an error if incompatible arguments are used together.
pub fn validate_args(args: &Args) -> Result<(), AppError> {
    let get_modifiers = args.url.is_some() || args.class.is_some() || args.live || args.classify;
    if args.get.is_none() && get_modifiers {
        return Err(AppError::config_error(
            "--url, --class, --live and --classify can only be used with --get",
        ));
    }

    if let Some(url) = &args.url
        && !url.starts_with("http://")
        && !url.starts_with("https://")
    {
        return Err(AppError::config_error(format!(
            "URL must start with http:// or https://, got '{url}'"
        )));
    }

    if let Some(key) = &args.get
        && key.is_empty()
    {
        return Err(AppError::config_error("Cache key cannot be empty"));
    }

    Ok(())
}

/// Resolves the `--class` tag, warning when it is not a known class
pub fn requested_classification(args: &Args) -> Option<DataClassification> {
    let tag = args.class.as_deref()?;
    let parsed = DataClassification::parse(tag);
    if parsed.is_none() {
        warn!("Unknown data class '{tag}', falling back to the live hint");
    }
    parsed
}

/// Opens the file-backed cache described by `config`
async fn open_cache(config: &Config) -> Result<TieredCache<FileStore>, AppError> {
    let store = FileStore::open(config.resolved_store_dir()).await?;
    Ok(TieredCache::from_config(store, config))
}

/// Handles the --version command.
pub fn handle_version_command() {
    println!("{} {}", sports_cache::NAME, sports_cache::VERSION);
}

/// Handles the --list-config command.
pub async fn handle_list_config_command() -> Result<(), AppError> {
    Config::display().await
}

/// Handles configuration update commands (--set-store-dir, --set-log-file, --clear-log-file).
///
/// Updates configuration based on the provided arguments and saves changes.
pub async fn handle_config_update_command(args: &Args) -> Result<(), AppError> {
    update_config_at(&Config::get_config_path(), args).await
}

/// Applies the config update flags to the file at `path`.
///
/// A missing file starts from defaults. An unreadable or invalid file is an
/// error and is left untouched. Environment overrides are never written back.
async fn update_config_at(path: &str, args: &Args) -> Result<(), AppError> {
    let mut config = if Path::new(path).exists() {
        Config::load_from_path(path).await?
    } else {
        Config::default()
    };

    if let Some(new_store_dir) = &args.new_store_dir {
        config.store_dir = Some(new_store_dir.clone());
    }

    if let Some(new_log_path) = &args.new_log_file_path {
        config.log_file_path = Some(new_log_path.clone());
    } else if args.clear_log_file_path {
        config.log_file_path = None;
        println!("Custom log file path cleared. Using default location.");
    }

    config.validate()?;
    config.save_to_path(path).await?;
    println!("Config updated successfully!");

    Ok(())
}

/// Handles the --get command.
///
/// Reads the key through the cache, fetching JSON from `--url` when needed,
/// and prints the payload to stdout.
pub async fn handle_get_command(args: &Args, config: &Config) -> Result<(), AppError> {
    let (Some(key), Some(url)) = (args.get.as_deref(), args.url.as_deref()) else {
        return Err(AppError::config_error("--get requires --url"));
    };

    let cache = open_cache(config).await?;
    let client = create_http_client_with_timeout(config.http_timeout_seconds)?;
    let fetch = || fetch_json(&client, url);

    let payload = if args.classify {
        cache.get_auto(key, fetch).await?
    } else {
        let classification = requested_classification(args);
        cache.get(key, fetch, args.live, classification).await?
    };

    info!(
        "Payload for '{}' classified as {}",
        key,
        cache.classify(&payload).label()
    );

    let rendered = serde_json::to_string_pretty(&payload).map_err(AppError::Render)?;
    println!("{rendered}");
    Ok(())
}

/// Handles the --invalidate command. An empty key clears the whole namespace.
pub async fn handle_invalidate_command(key: &str, config: &Config) -> Result<(), AppError> {
    let cache = open_cache(config).await?;
    let target = (!key.is_empty()).then_some(key);
    let removed = cache.invalidate(target).await;

    match target {
        Some(key) => println!("Invalidated '{key}' ({removed} durable entries)"),
        None => println!(
            "Cleared namespace '{}' ({removed} durable entries)",
            cache.namespace()
        ),
    }
    Ok(())
}

/// Handles the --stats command.
pub async fn handle_stats_command(config: &Config) -> Result<(), AppError> {
    let cache = open_cache(config).await?;
    let stats = cache.stats().await;

    println!("\nCache Statistics");
    println!("────────────────────────────────────");
    println!("Namespace:");
    println!("{}", cache.namespace());
    println!("────────────────────────────────────");
    println!("Durable Entries:");
    println!("{}", stats.durable_count);
    println!("────────────────────────────────────");
    println!("Memory Entries:");
    println!("{} / {}", stats.memory_count, stats.memory_capacity);
    if !stats.durable_keys.is_empty() {
        println!("────────────────────────────────────");
        println!("Keys:");
        for key in &stats.durable_keys {
            println!("{key}");
        }
    }

    Ok(())
}
