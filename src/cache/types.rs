//! Cache data structures and freshness policy

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::freshness;

/// Volatility class of a cached payload, used to pick its freshness window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataClassification {
    Live,
    Scheduled,
    Finished,
    Static,
}

impl DataClassification {
    /// Parses a classification tag. Unknown tags yield `None` so that the
    /// caller's live hint decides the window instead.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "live" => Some(Self::Live),
            "scheduled" => Some(Self::Scheduled),
            "finished" => Some(Self::Finished),
            "static" => Some(Self::Static),
            _ => None,
        }
    }

    /// Picks the effective classification for a lookup.
    ///
    /// An explicit classification always wins; without one the live hint
    /// selects `Live`, otherwise `Scheduled`.
    pub fn resolve(explicit: Option<Self>, is_live_hint: bool) -> Self {
        match explicit {
            Some(classification) => classification,
            None if is_live_hint => Self::Live,
            None => Self::Scheduled,
        }
    }

    /// Freshness window in milliseconds
    pub fn window_ms(self) -> i64 {
        match self {
            Self::Live => freshness::LIVE_MS,
            Self::Scheduled => freshness::SCHEDULED_MS,
            Self::Finished => freshness::FINISHED_MS,
            Self::Static => freshness::STATIC_MS,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Scheduled => "scheduled",
            Self::Finished => "finished",
            Self::Static => "static",
        }
    }

    /// Short label used in cache log lines
    pub fn label(self) -> &'static str {
        match self {
            Self::Live => "[LIVE]",
            Self::Scheduled => "[SCHEDULED]",
            Self::Finished => "[FINISHED]",
            Self::Static => "[STATIC]",
        }
    }
}

impl fmt::Display for DataClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored payload together with the wall-clock time it was fetched.
///
/// Serialized as `{"payload": ..., "storedAtEpochMs": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub payload: T,
    pub stored_at_epoch_ms: i64,
}

impl<T> CacheEntry<T> {
    pub fn new(payload: T, stored_at_epoch_ms: i64) -> Self {
        Self {
            payload,
            stored_at_epoch_ms,
        }
    }

    /// Age of the entry at `now_ms`. Entries stamped in the future count as age zero.
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.stored_at_epoch_ms).max(0)
    }

    /// Checks the entry against a freshness window (strictly younger than the window)
    pub fn is_fresh(&self, now_ms: i64, window_ms: i64) -> bool {
        now_ms.saturating_sub(self.stored_at_epoch_ms) < window_ms
    }
}

/// Snapshot of cache occupancy for monitoring purposes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Durable keys under this cache's namespace
    pub durable_count: usize,
    pub memory_count: usize,
    pub memory_capacity: usize,
    /// Namespaced durable keys, empty when enumeration failed
    pub durable_keys: Vec<String>,
}
