//! Tiered response cache for sports data APIs
//!
//! Responses are kept in a durable key-value store and shadowed in memory.
//! Each lookup picks a freshness window from how volatile the data is
//! (live, scheduled, finished or static), and falls back to the memory
//! shadow and finally a direct fetch when the durable store misbehaves.
//!
//! # Examples
//!
//! ```rust,no_run
//! use sports_cache::cache::{DataClassification, FileStore, TieredCache};
//! use sports_cache::error::AppError;
//! use sports_cache::fetcher::{create_http_client_with_timeout, fetch_json};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), AppError> {
//!     let store = FileStore::open("/tmp/sports_cache").await?;
//!     let cache = TieredCache::new(store);
//!     let client = create_http_client_with_timeout(30)?;
//!     let url = "https://example.com/api/matches/42";
//!
//!     let payload = cache
//!         .get(
//!             "match_42",
//!             || fetch_json(&client, url),
//!             false,
//!             Some(DataClassification::Finished),
//!         )
//!         .await?;
//!     println!("{payload}");
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod fetcher;
pub mod testing_utils;

// Re-export commonly used types for convenience
pub use cache::{
    CacheEntry, CacheStats, Classifier, DataClassification, DurableStore, FileStore,
    InMemoryStore, TieredCache,
};
pub use config::Config;
pub use error::{AppError, StoreError};
pub use fetcher::fetch_json;

/// Current version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
