//! Hooks for observing cache decisions

use tracing::{debug, info, warn};

use super::types::DataClassification;

/// A decision or failure inside the tiered cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent<'a> {
    /// Fresh durable entry served
    Hit {
        key: &'a str,
        age_ms: i64,
        classification: DataClassification,
    },
    /// Durable entry found but older than its window
    Stale {
        key: &'a str,
        age_ms: i64,
        classification: DataClassification,
    },
    /// No durable entry (or an undecodable one)
    Miss {
        key: &'a str,
        classification: DataClassification,
    },
    /// Fetch function invoked after a miss or stale read
    NetworkFetch {
        key: &'a str,
        classification: DataClassification,
    },
    DurableReadFailed { key: &'a str, error: String },
    DurableWriteFailed { key: &'a str, error: String },
    /// Fresh memory shadow entry served while the durable tier is failing
    MemoryFallbackHit { key: &'a str, age_ms: i64 },
    /// Uncached fetch after both tiers missed or failed
    NetworkFallback { key: &'a str },
    /// `key` is `None` for a bulk invalidation
    Invalidated { key: Option<&'a str>, durable_removed: usize },
    InvalidateFailed { key: Option<&'a str>, error: String },
}

/// Receives [`CacheEvent`]s. Must not block; it runs inline with cache calls.
pub trait CacheObserver: Send + Sync {
    fn on_event(&self, event: &CacheEvent<'_>);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl CacheObserver for NoopObserver {
    fn on_event(&self, _event: &CacheEvent<'_>) {}
}

/// Writes every event to the `tracing` pipeline
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

fn seconds(age_ms: i64) -> f64 {
    age_ms as f64 / 1000.0
}

impl CacheObserver for TracingObserver {
    fn on_event(&self, event: &CacheEvent<'_>) {
        match event {
            CacheEvent::Hit {
                key,
                age_ms,
                classification,
            } => debug!(
                "[Cache HIT] {} ({:.1}s old) {}",
                key,
                seconds(*age_ms),
                classification.label()
            ),
            CacheEvent::Stale {
                key,
                age_ms,
                classification,
            } => debug!(
                "[Cache STALE] {} ({:.1}s old, refreshing) {}",
                key,
                seconds(*age_ms),
                classification.label()
            ),
            CacheEvent::Miss {
                key,
                classification,
            } => debug!("[Cache MISS] {} {}", key, classification.label()),
            CacheEvent::NetworkFetch {
                key,
                classification,
            } => info!("[Network Fetch] {} {}", key, classification.label()),
            CacheEvent::DurableReadFailed { key, error } => {
                warn!("Durable cache read failed for {}: {}", key, error)
            }
            CacheEvent::DurableWriteFailed { key, error } => {
                warn!("Durable cache write failed for {}: {}", key, error)
            }
            CacheEvent::MemoryFallbackHit { key, age_ms } => info!(
                "[Memory Fallback HIT] {} ({:.1}s old)",
                key,
                seconds(*age_ms)
            ),
            CacheEvent::NetworkFallback { key } => {
                warn!("[Network Fallback] {} (no cache available)", key)
            }
            CacheEvent::Invalidated {
                key: Some(key),
                durable_removed,
            } => info!(
                "Cleared cache for {} ({} durable entries)",
                key, durable_removed
            ),
            CacheEvent::Invalidated {
                key: None,
                durable_removed,
            } => info!("Cleared all cache entries ({} durable)", durable_removed),
            CacheEvent::InvalidateFailed { key, error } => warn!(
                "Cache clear failed for {}: {}",
                key.unwrap_or("<all>"),
                error
            ),
        }
    }
}
