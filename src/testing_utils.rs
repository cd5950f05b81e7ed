//! Test doubles for exercising cache fallbacks without real storage failures

use std::future::{Ready, ready};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::cache::observer::{CacheEvent, CacheObserver};
use crate::cache::store::{DurableStore, InMemoryStore};
use crate::error::StoreError;

/// In-memory store whose reads, writes and listings can be switched to fail.
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: InMemoryStore,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    fail_listing: AtomicBool,
    writes: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Also fails `delete_many`, which is only used after a listing
    pub fn fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `set` calls
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check(flag: &AtomicBool, operation: &str) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::unavailable(format!("{operation} disabled by test")))
        } else {
            Ok(())
        }
    }
}

impl DurableStore for FlakyStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Self::check(&self.fail_reads, "get")?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        Self::check(&self.fail_writes, "set")?;
        self.inner.set(key, value).await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        Self::check(&self.fail_writes, "delete")?;
        self.inner.delete(key).await
    }

    async fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        Self::check(&self.fail_listing, "list_keys")?;
        self.inner.list_keys().await
    }

    async fn delete_many(&self, keys: &[String]) -> Result<(), StoreError> {
        Self::check(&self.fail_listing, "delete_many")?;
        self.inner.delete_many(keys).await
    }
}

/// Records the kind of every cache event it sees, e.g. `"Hit"` or `"NetworkFallback"`.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    kinds: Mutex<Vec<&'static str>>,
}

impl RecordingObserver {
    pub fn kinds(&self) -> Vec<&'static str> {
        self.kinds.lock().map(|k| k.clone()).unwrap_or_default()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.kinds().iter().any(|k| *k == kind)
    }

    pub fn count(&self, kind: &str) -> usize {
        self.kinds().iter().filter(|k| **k == kind).count()
    }
}

impl CacheObserver for RecordingObserver {
    fn on_event(&self, event: &CacheEvent<'_>) {
        let kind = match event {
            CacheEvent::Hit { .. } => "Hit",
            CacheEvent::Stale { .. } => "Stale",
            CacheEvent::Miss { .. } => "Miss",
            CacheEvent::NetworkFetch { .. } => "NetworkFetch",
            CacheEvent::DurableReadFailed { .. } => "DurableReadFailed",
            CacheEvent::DurableWriteFailed { .. } => "DurableWriteFailed",
            CacheEvent::MemoryFallbackHit { .. } => "MemoryFallbackHit",
            CacheEvent::NetworkFallback { .. } => "NetworkFallback",
            CacheEvent::Invalidated { .. } => "Invalidated",
            CacheEvent::InvalidateFailed { .. } => "InvalidateFailed",
        };
        if let Ok(mut kinds) = self.kinds.lock() {
            kinds.push(kind);
        }
    }
}

/// Counts how many times a fetch function was invoked.
///
/// `ok` and `err` bump the counter when called, so wrapping them in a closure
/// (`|| counter.ok(value)`) counts actual fetch invocations.
#[derive(Debug, Default)]
pub struct FetchCounter {
    calls: AtomicUsize,
}

impl FetchCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn ok<T>(&self, value: T) -> Ready<Result<T, String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ready(Ok(value))
    }

    pub fn err<T>(&self, message: &str) -> Ready<Result<T, String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        ready(Err(message.to_string()))
    }
}
