mod cli;
mod commands;
mod logging;

use clap::Parser;
use cli::{Args, is_config_update};
use commands::{
    handle_config_update_command, handle_get_command, handle_invalidate_command,
    handle_list_config_command, handle_stats_command, handle_version_command, validate_args,
};
use sports_cache::config::Config;
use sports_cache::error::AppError;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let args = Args::parse();

    validate_args(&args)?;

    // Keep the guard alive so buffered log lines are flushed on exit
    let (log_file_path, _guard) = logging::setup_logging(&args).await?;
    tracing::info!("Logs are being written to: {log_file_path}");

    if args.version {
        handle_version_command();
        return Ok(());
    }

    if args.list_config {
        return handle_list_config_command().await;
    }

    if is_config_update(&args) {
        return handle_config_update_command(&args).await;
    }

    let config = Config::load().await?;

    if args.get.is_some() {
        return handle_get_command(&args, &config).await;
    }

    if let Some(key) = &args.invalidate {
        return handle_invalidate_command(key, &config).await;
    }

    if args.stats {
        return handle_stats_command(&config).await;
    }

    println!("Nothing to do. Run with --help to see available commands.");
    Ok(())
}
