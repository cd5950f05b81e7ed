//! Application-wide constants and configuration values
//!
//! Freshness windows, namespace and sizing defaults live here so the cache,
//! the config layer and the CLI agree on them.

/// Default timeout for HTTP requests in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;

/// Maximum number of connections per host in the HTTP client pool
pub const HTTP_POOL_MAX_IDLE_PER_HOST: usize = 100;

/// Prefix applied to every durable key written by the cache
pub const DEFAULT_NAMESPACE: &str = "sports_cache_";

/// Default number of entries kept in the in-memory shadow
pub const DEFAULT_MEMORY_CAPACITY: usize = 500;

/// Freshness windows in milliseconds, selected by data classification
pub mod freshness {
    /// Games or matches in progress
    pub const LIVE_MS: i64 = 2_000;

    /// Upcoming events; also the fallback when no classification is given
    pub const SCHEDULED_MS: i64 = 10_000;

    /// Completed events
    pub const FINISHED_MS: i64 = 30_000;

    /// Standings, rosters, team and player data (5 minutes)
    pub const STATIC_MS: i64 = 300_000;
}

/// Retry behaviour for the HTTP fetcher
pub mod retry {
    /// Number of retries after the first attempt
    pub const MAX_RETRIES: u32 = 3;

    /// Initial backoff, doubled after every retry
    pub const INITIAL_BACKOFF_MS: u64 = 250;
}

/// Request headers for upstream sports APIs
pub mod http {
    pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
}

/// Environment variable names recognised by the config loader
pub mod env_vars {
    pub const NAMESPACE: &str = "SPORTS_CACHE_NAMESPACE";
    pub const STORE_DIR: &str = "SPORTS_CACHE_STORE_DIR";
    pub const MEMORY_CAPACITY: &str = "SPORTS_CACHE_MEMORY_CAPACITY";
    pub const LOG_FILE: &str = "SPORTS_CACHE_LOG_FILE";
    pub const HTTP_TIMEOUT: &str = "SPORTS_CACHE_HTTP_TIMEOUT";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freshness_windows_are_ordered() {
        assert!(freshness::LIVE_MS < freshness::SCHEDULED_MS);
        assert!(freshness::SCHEDULED_MS < freshness::FINISHED_MS);
        assert!(freshness::FINISHED_MS < freshness::STATIC_MS);
        assert_eq!(freshness::STATIC_MS, 5 * 60 * 1000);
    }

    #[test]
    fn test_namespace_and_capacity_defaults() {
        assert!(DEFAULT_NAMESPACE.ends_with('_'));
        assert!(DEFAULT_MEMORY_CAPACITY > 0);
        assert!(DEFAULT_HTTP_TIMEOUT_SECONDS > 0);
    }

    #[test]
    fn test_retry_defaults() {
        assert!(retry::MAX_RETRIES > 0);
        assert!(retry::INITIAL_BACKOFF_MS > 0);
    }
}
