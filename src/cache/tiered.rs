//! Tiered response cache: durable store, in-memory shadow, direct fetch

use lru::LruCache;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::classifier::{Classifier, DefaultClassifier};
use super::clock::{Clock, SystemClock};
use super::observer::{CacheEvent, CacheObserver, TracingObserver};
use super::store::DurableStore;
use super::types::{CacheEntry, CacheStats, DataClassification};
use crate::config::Config;
use crate::constants::{DEFAULT_MEMORY_CAPACITY, DEFAULT_NAMESPACE};
use crate::error::StoreError;

/// How a lookup picks its freshness window
#[derive(Debug, Clone, Copy)]
enum WindowPolicy {
    Fixed(DataClassification),
    /// Classify the stored payload with the cache's classifier
    Classified,
}

impl WindowPolicy {
    fn classification(self, classifier: &dyn Classifier, payload: &Value) -> DataClassification {
        match self {
            Self::Fixed(classification) => classification,
            Self::Classified => classifier.classify(payload),
        }
    }

    /// Classification reported when there is no payload to inspect
    fn nominal(self) -> DataClassification {
        match self {
            Self::Fixed(classification) => classification,
            Self::Classified => DataClassification::Scheduled,
        }
    }
}

/// Response cache over a [`DurableStore`] with an in-memory fallback.
///
/// Lookups read the durable tier first. When it fails, a bounded in-process
/// shadow of recently fetched payloads is consulted, and as a last resort the
/// fetch function runs uncached. Storage failures never reach the caller;
/// only errors returned by the fetch function do.
///
/// Concurrent lookups of the same stale key are not coalesced: each may run
/// its own fetch and the last durable write wins.
pub struct TieredCache<S> {
    store: S,
    namespace: String,
    memory: RwLock<LruCache<String, CacheEntry<Value>>>,
    classifier: Arc<dyn Classifier>,
    observer: Arc<dyn CacheObserver>,
    clock: Arc<dyn Clock>,
}

impl<S: DurableStore> TieredCache<S> {
    /// Creates a cache with the default namespace, shadow capacity,
    /// classifier, tracing observer and system clock.
    pub fn new(store: S) -> Self {
        let capacity = NonZeroUsize::new(DEFAULT_MEMORY_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            store,
            namespace: DEFAULT_NAMESPACE.to_string(),
            memory: RwLock::new(LruCache::new(capacity)),
            classifier: Arc::new(DefaultClassifier),
            observer: Arc::new(TracingObserver),
            clock: Arc::new(SystemClock),
        }
    }

    /// Creates a cache using the namespace and shadow capacity from `config`
    pub fn from_config(store: S, config: &Config) -> Self {
        let cache = Self::new(store).with_namespace(config.namespace.clone());
        match NonZeroUsize::new(config.memory_capacity) {
            Some(capacity) => cache.with_memory_capacity(capacity),
            None => cache,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Bounds the in-memory shadow; least recently used entries are evicted first
    pub fn with_memory_capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.memory.get_mut().resize(capacity);
        self
    }

    pub fn with_classifier(mut self, classifier: impl Classifier + 'static) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn CacheObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Durable key for a caller key
    pub fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    /// Returns cached data for `key` if it is still fresh, otherwise calls
    /// `fetch`, stores the result and returns it.
    ///
    /// The window comes from `classification`; when that is `None` the
    /// `is_live_hint` flag selects the live window, otherwise the scheduled one.
    ///
    /// # Errors
    /// Only errors produced by `fetch` are returned, unchanged.
    #[instrument(skip(self, key, fetch), fields(key = %key))]
    pub async fn get<T, E, F, Fut>(
        &self,
        key: &str,
        fetch: F,
        is_live_hint: bool,
        classification: Option<DataClassification>,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let classification = DataClassification::resolve(classification, is_live_hint);
        self.fetch_through(key, fetch, WindowPolicy::Fixed(classification))
            .await
    }

    /// Like [`get`](Self::get), but the window is chosen by classifying the
    /// cached payload itself. Without a cached payload the scheduled window
    /// applies.
    #[instrument(skip(self, key, fetch), fields(key = %key))]
    pub async fn get_auto<T, E, F, Fut>(&self, key: &str, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.fetch_through(key, fetch, WindowPolicy::Classified)
            .await
    }

    async fn fetch_through<T, E, F, Fut>(
        &self,
        key: &str,
        fetch: F,
        policy: WindowPolicy,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let now = self.clock.now_ms();
        let storage_key = self.storage_key(key);

        match self.store.get(&storage_key).await {
            Ok(Some(bytes)) => {
                if let Some(payload) = self.fresh_payload(key, &bytes, now, policy) {
                    return Ok(payload);
                }
            }
            Ok(None) => self.observer.on_event(&CacheEvent::Miss {
                key,
                classification: policy.nominal(),
            }),
            Err(e) => {
                self.observer.on_event(&CacheEvent::DurableReadFailed {
                    key,
                    error: e.to_string(),
                });
                return self.degraded_fetch(key, fetch, now, policy).await;
            }
        }

        self.observer.on_event(&CacheEvent::NetworkFetch {
            key,
            classification: policy.nominal(),
        });
        let payload = fetch().await?;
        self.write_through(key, &storage_key, &payload, now).await;
        Ok(payload)
    }

    /// Decodes a durable entry and returns its payload when fresh
    fn fresh_payload<T: DeserializeOwned>(
        &self,
        key: &str,
        bytes: &[u8],
        now: i64,
        policy: WindowPolicy,
    ) -> Option<T> {
        let entry: CacheEntry<Value> = match serde_json::from_slice(bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Discarding undecodable cache entry for {}: {}", key, e);
                self.observer.on_event(&CacheEvent::Miss {
                    key,
                    classification: policy.nominal(),
                });
                return None;
            }
        };

        let classification = policy.classification(self.classifier.as_ref(), &entry.payload);
        let age_ms = entry.age_ms(now);

        if !entry.is_fresh(now, classification.window_ms()) {
            self.observer.on_event(&CacheEvent::Stale {
                key,
                age_ms,
                classification,
            });
            return None;
        }

        match serde_json::from_value(entry.payload) {
            Ok(payload) => {
                self.observer.on_event(&CacheEvent::Hit {
                    key,
                    age_ms,
                    classification,
                });
                Some(payload)
            }
            Err(e) => {
                warn!("Cached payload for {} has an unexpected shape: {}", key, e);
                self.observer.on_event(&CacheEvent::Miss {
                    key,
                    classification,
                });
                None
            }
        }
    }

    /// Persists a fetched payload and mirrors it into the memory shadow.
    /// Storage failures are reported to the observer and otherwise ignored.
    async fn write_through<T: Serialize>(
        &self,
        key: &str,
        storage_key: &str,
        payload: &T,
        now: i64,
    ) {
        let entry = match serde_json::to_value(payload) {
            Ok(value) => CacheEntry::new(value, now),
            Err(e) => {
                self.observer.on_event(&CacheEvent::DurableWriteFailed {
                    key,
                    error: e.to_string(),
                });
                return;
            }
        };

        let written = match serde_json::to_vec(&entry) {
            Ok(bytes) => self.store.set(storage_key, bytes).await,
            Err(e) => Err(StoreError::Serialization(e)),
        };
        if let Err(e) = written {
            self.observer.on_event(&CacheEvent::DurableWriteFailed {
                key,
                error: e.to_string(),
            });
        }

        self.memory.write().await.put(key.to_string(), entry);
    }

    /// Durable tier is failing: try the memory shadow, then fetch uncached
    async fn degraded_fetch<T, E, F, Fut>(
        &self,
        key: &str,
        fetch: F,
        now: i64,
        policy: WindowPolicy,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(payload) = self.memory_payload(key, now, policy).await {
            return Ok(payload);
        }

        self.observer.on_event(&CacheEvent::NetworkFallback { key });
        let payload = fetch().await?;
        self.remember(key, &payload, now).await;
        Ok(payload)
    }

    async fn memory_payload<T: DeserializeOwned>(
        &self,
        key: &str,
        now: i64,
        policy: WindowPolicy,
    ) -> Option<T> {
        let mut memory = self.memory.write().await;
        let entry = memory.get(key)?;

        let classification = policy.classification(self.classifier.as_ref(), &entry.payload);
        if !entry.is_fresh(now, classification.window_ms()) {
            debug!("Memory shadow entry for {} is stale", key);
            return None;
        }

        let age_ms = entry.age_ms(now);
        let payload = serde_json::from_value(entry.payload.clone()).ok()?;
        drop(memory);

        self.observer
            .on_event(&CacheEvent::MemoryFallbackHit { key, age_ms });
        Some(payload)
    }

    /// Best-effort insert into the memory shadow only
    async fn remember<T: Serialize>(&self, key: &str, payload: &T, now: i64) {
        match serde_json::to_value(payload) {
            Ok(value) => {
                self.memory
                    .write()
                    .await
                    .put(key.to_string(), CacheEntry::new(value, now));
            }
            Err(e) => warn!("Memory cache also failed for {}: {}", key, e),
        }
    }

    /// Durable keys under this cache's namespace, sorted
    async fn namespaced_keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self
            .store
            .list_keys()
            .await?
            .into_iter()
            .filter(|k| k.starts_with(&self.namespace))
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// Removes one key from both tiers, or every namespaced entry when `key`
    /// is `None`. Keys outside the namespace are never touched.
    ///
    /// Returns how many durable entries were targeted; zero when the durable
    /// step failed. The memory shadow is cleared regardless.
    #[instrument(skip(self))]
    pub async fn invalidate(&self, key: Option<&str>) -> usize {
        let durable = match key {
            Some(key) => self
                .store
                .delete(&self.storage_key(key))
                .await
                .map(|()| 1),
            None => match self.namespaced_keys().await {
                Ok(keys) => self.store.delete_many(&keys).await.map(|()| keys.len()),
                Err(e) => Err(e),
            },
        };

        {
            let mut memory = self.memory.write().await;
            match key {
                Some(key) => {
                    memory.pop(key);
                }
                None => memory.clear(),
            }
        }

        match durable {
            Ok(durable_removed) => {
                self.observer.on_event(&CacheEvent::Invalidated {
                    key,
                    durable_removed,
                });
                durable_removed
            }
            Err(e) => {
                self.observer.on_event(&CacheEvent::InvalidateFailed {
                    key,
                    error: e.to_string(),
                });
                0
            }
        }
    }

    /// Counts durable entries under the namespace and memory shadow entries.
    /// A failing durable listing is reported as zero entries.
    pub async fn stats(&self) -> CacheStats {
        let durable_keys = match self.namespaced_keys().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Cache stats failed to list durable keys: {}", e);
                Vec::new()
            }
        };

        let memory = self.memory.read().await;
        CacheStats {
            durable_count: durable_keys.len(),
            memory_count: memory.len(),
            memory_capacity: memory.cap().get(),
            durable_keys,
        }
    }

    /// Classifies a payload with the configured classifier
    pub fn classify(&self, payload: &Value) -> DataClassification {
        self.classifier.classify(payload)
    }

    pub fn has_live_markers(&self, payload: &Value) -> bool {
        self.classifier.has_live_markers(payload)
    }
}
