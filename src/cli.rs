use clap::Parser;
use clap::builder::styling::{AnsiColor, Effects, Styles};

fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
        .usage(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Yellow.on_default())
        .error(AnsiColor::Red.on_default().effects(Effects::BOLD))
        .valid(AnsiColor::Green.on_default())
        .invalid(AnsiColor::Red.on_default())
}

/// Returns true when the arguments only touch the config file
pub fn is_config_update(args: &Args) -> bool {
    args.new_store_dir.is_some() || args.new_log_file_path.is_some() || args.clear_log_file_path
}

/// Tiered sports response cache
///
/// Fetches JSON from sports APIs through a durable file-backed cache with an
/// in-memory shadow. Entries stay fresh for a window chosen by how volatile the
/// data is:
/// - live: 2 seconds
/// - scheduled: 10 seconds
/// - finished: 30 seconds
/// - static: 5 minutes
#[derive(Parser, Debug)]
#[command(author = "Niko Salonen", about, long_about = None)]
#[command(disable_version_flag = true)]
#[command(styles = get_styles())]
pub struct Args {
    /// Read KEY through the cache, fetching from --url on a miss.
    /// The payload is printed to stdout as JSON.
    #[arg(
        long = "get",
        value_name = "KEY",
        requires = "url",
        conflicts_with_all = ["invalidate", "stats"],
        help_heading = "Cache"
    )]
    pub get: Option<String>,

    /// URL to fetch JSON from when the cached entry is missing or stale.
    #[arg(long = "url", value_name = "URL", help_heading = "Cache")]
    pub url: Option<String>,

    /// Data class deciding the freshness window: live, scheduled, finished or static.
    /// Unrecognized values fall back to the --live hint.
    #[arg(long = "class", value_name = "TAG", help_heading = "Cache")]
    pub class: Option<String>,

    /// Treat the data as live when no --class is given.
    #[arg(long = "live", help_heading = "Cache")]
    pub live: bool,

    /// Choose the freshness window by classifying the cached payload.
    #[arg(
        long = "classify",
        conflicts_with_all = ["class", "live"],
        help_heading = "Cache"
    )]
    pub classify: bool,

    /// Remove one cached KEY, or every entry in the namespace when KEY is omitted.
    #[arg(
        long = "invalidate",
        value_name = "KEY",
        num_args = 0..=1,
        default_missing_value = "",
        conflicts_with = "stats",
        help_heading = "Cache"
    )]
    pub invalidate: Option<String>,

    /// Show entry counts for both cache tiers and the cached keys.
    #[arg(long = "stats", help_heading = "Cache")]
    pub stats: bool,

    /// Update the durable store directory in config.
    #[arg(long = "set-store-dir", value_name = "DIR", help_heading = "Configuration")]
    pub new_store_dir: Option<String>,

    /// Update log file path in config. This sets a persistent custom log file location.
    #[arg(long = "set-log-file", help_heading = "Configuration")]
    pub new_log_file_path: Option<String>,

    /// Clear the custom log file path from config. This reverts to using the default log location.
    #[arg(long = "clear-log-file", help_heading = "Configuration")]
    pub clear_log_file_path: bool,

    /// List current configuration settings
    #[arg(long = "list-config", short = 'l', help_heading = "Configuration")]
    pub list_config: bool,

    /// Show version information
    #[arg(short = 'V', long = "version", help_heading = "Info")]
    pub version: bool,

    /// Mirror log output to the terminal in addition to the log file.
    #[arg(long = "debug", help_heading = "Debug")]
    pub debug: bool,

    /// Specify a custom log file path. If not provided, logs will be written to the default location.
    #[arg(long = "log-file", help_heading = "Debug")]
    pub log_file: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_requires_url() {
        assert!(Args::try_parse_from(["sports_cache", "--get", "match_42"]).is_err());

        let args = Args::try_parse_from([
            "sports_cache",
            "--get",
            "match_42",
            "--url",
            "http://localhost/m/42",
            "--class",
            "finished",
        ])
        .unwrap();
        assert_eq!(args.get.as_deref(), Some("match_42"));
        assert_eq!(args.class.as_deref(), Some("finished"));
    }

    #[test]
    fn test_cache_commands_are_exclusive() {
        assert!(
            Args::try_parse_from([
                "sports_cache",
                "--get",
                "k",
                "--url",
                "http://x",
                "--stats"
            ])
            .is_err()
        );
        assert!(Args::try_parse_from(["sports_cache", "--invalidate", "--stats"]).is_err());
        assert!(
            Args::try_parse_from([
                "sports_cache",
                "--get",
                "k",
                "--url",
                "http://x",
                "--classify",
                "--live"
            ])
            .is_err()
        );
    }

    #[test]
    fn test_invalidate_optional_key() {
        let args = Args::try_parse_from(["sports_cache", "--invalidate"]).unwrap();
        assert_eq!(args.invalidate.as_deref(), Some(""));

        let args = Args::try_parse_from(["sports_cache", "--invalidate", "match_42"]).unwrap();
        assert_eq!(args.invalidate.as_deref(), Some("match_42"));
    }

    #[test]
    fn test_config_update_detection() {
        let args = Args::try_parse_from(["sports_cache", "--set-store-dir", "/tmp/s"]).unwrap();
        assert!(is_config_update(&args));

        let args = Args::try_parse_from(["sports_cache", "--stats"]).unwrap();
        assert!(!is_config_update(&args));
    }
}
